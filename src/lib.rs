// src/lib.rs

//! Resource repository with capability indexing and requirement resolution
//!
//! Resources describe themselves through namespaced capabilities carrying
//! typed attributes, and ask for others through requirements carrying LDAP
//! style filters. The repository indexes capabilities for fast lookup,
//! resolves single requirements and boolean requirement expressions to
//! resources, and keeps resource payloads in a content-addressable store.
//!
//! # Architecture
//!
//! - Typed attributes: String, Version, Long, Double and lists of them, with
//!   a textual codec for metadata formats
//! - Index: `(namespace, primary value)` buckets plus an identity map, behind
//!   a single reader-writer lock
//! - Expressions: AND / OR / NOT over requirements, evaluated set-at-a-time
//! - Content: SHA-256 addressed blobs, deduplicated and reference counted

pub mod attribute;
mod error;
pub mod expression;
pub mod filesystem;
pub mod filter;
pub mod hash;
pub mod index;
pub mod matcher;
pub mod repository;
pub mod resource;
pub mod version;

pub use attribute::{AttrKind, AttrValue, AttributeError, Attributes, Directives};
pub use error::{Error, Result};
pub use expression::{EvalError, Evaluator, RequirementExpression, ResourceSet};
pub use filesystem::ContentStore;
pub use filter::{Filter, FilterError};
pub use hash::{Digest, Hasher};
pub use index::{CapabilityIndex, DuplicateResource};
pub use matcher::RequirementMatcher;
pub use repository::{Repository, RepositoryConfig};
pub use resource::{
    Capability, CapabilityRef, ContentInfo, Requirement, Resource, ResourceBuilder, ResourceError,
    ResourceId,
};
pub use version::{Version, VersionError, VersionRange};
