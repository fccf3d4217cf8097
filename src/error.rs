// src/error.rs

//! Crate-level error type
//!
//! Each subsystem defines its own error enum; this module folds them into a
//! single [`Error`] for callers that drive the repository as a whole.

use crate::attribute::AttributeError;
use crate::expression::EvalError;
use crate::filter::FilterError;
use crate::hash::HashError;
use crate::index::DuplicateResource;
use crate::resource::ResourceError;
use thiserror::Error;

/// Errors surfaced by the repository
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateResource),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Invalid digest: {0}")]
    InvalidDigest(#[from] HashError),

    #[error("Content not found in store: {0}")]
    ContentNotFound(String),

    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
