// src/resource/mod.rs

//! Resources, capabilities and requirements
//!
//! A [`Resource`] is an immutable aggregate identified by exactly one
//! capability in the `identity` namespace. It owns its capabilities and
//! requirements in insertion order. Capabilities refer back to their resource
//! by [`ResourceId`] only; the index hands out [`CapabilityRef`] handles that
//! pair a shared resource with a capability position.
//!
//! # Well-known namespaces
//!
//! - `identity`: `identity` (String name), `version` (Version), `type` (String)
//! - `content`: `content` (digest), `size` (Long), `mime` (String, optional)

mod builder;

pub use builder::ResourceBuilder;

use crate::attribute::{AttrValue, Attributes, Directives};
use crate::filter::escape_value;
use crate::hash::Digest;
use crate::version::{Version, VersionRange};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

pub const IDENTITY_NAMESPACE: &str = "identity";
pub const CONTENT_NAMESPACE: &str = "content";
pub const VERSION_ATTRIBUTE: &str = "version";
pub const TYPE_ATTRIBUTE: &str = "type";
pub const SIZE_ATTRIBUTE: &str = "size";
pub const MIME_ATTRIBUTE: &str = "mime";
pub const FILTER_DIRECTIVE: &str = "filter";

/// Type tag given to resources whose identity carries none
pub const DEFAULT_RESOURCE_TYPE: &str = "unknown";

/// Errors raised while assembling a resource
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Resource has no identity capability")]
    MissingIdentity,

    #[error("Resource has {0} identity capabilities, expected exactly one")]
    MultipleIdentities(usize),

    #[error("Invalid identity capability: {0}")]
    InvalidIdentity(String),
}

/// Identity key of a resource: unique per index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub name: String,
    pub version: Version,
}

impl ResourceId {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Binary payload attached to a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInfo {
    pub digest: Digest,
    pub size: u64,
    pub mime: Option<String>,
}

/// A namespaced, attributed fact a resource offers
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
    resource: ResourceId,
}

impl Capability {
    pub(crate) fn new(
        namespace: String,
        attributes: Attributes,
        directives: Directives,
        resource: ResourceId,
    ) -> Self {
        Self {
            namespace,
            attributes,
            directives,
            resource,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    /// The attribute named after the namespace, used for index keys
    pub fn primary_value(&self) -> Option<&AttrValue> {
        self.attributes.get(&self.namespace)
    }

    /// Identity of the owning resource
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource
    }
}

/// A namespaced, filtered query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Requirement {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
}

impl Requirement {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn from_parts(
        namespace: impl Into<String>,
        attributes: Attributes,
        directives: Directives,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            attributes,
            directives,
        }
    }

    /// Requirement matching every capability in a namespace
    pub fn wildcard(namespace: impl Into<String>) -> Self {
        Self::new(namespace)
    }

    /// Requirement on a resource identity, optionally bounded by a version range
    pub fn identity(name: &str, range: Option<&VersionRange>) -> Self {
        let name_filter = format!("({}={})", IDENTITY_NAMESPACE, escape_value(name));
        let filter = match range {
            Some(range) => format!("(&{}{})", name_filter, range.to_filter(VERSION_ATTRIBUTE)),
            None => name_filter,
        };
        Self::new(IDENTITY_NAMESPACE).with_filter(filter)
    }

    pub fn with_filter(self, filter: impl Into<String>) -> Self {
        self.with_directive(FILTER_DIRECTIVE, filter)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_directive(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(name.into(), value.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    /// The `filter` directive, if any
    pub fn filter(&self) -> Option<&str> {
        self.directives.get(FILTER_DIRECTIVE).map(String::as_str)
    }

    pub fn primary_value(&self) -> Option<&AttrValue> {
        self.attributes.get(&self.namespace)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filter() {
            Some(filter) => write!(f, "{}:{}", self.namespace, filter),
            None => write!(f, "{}:*", self.namespace),
        }
    }
}

/// An identified artifact with capabilities and requirements
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    resource_type: String,
    capabilities: Vec<Capability>,
    requirements: Vec<Requirement>,
    content: Option<ContentInfo>,
}

impl Resource {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn version(&self) -> &Version {
        &self.id.version
    }

    /// Type tag from the identity, e.g. "bundle" or "module"
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Capabilities in one namespace, in declaration order
    pub fn capabilities_in<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a Capability> + 'a {
        self.capabilities
            .iter()
            .filter(move |cap| cap.namespace == namespace)
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn content(&self) -> Option<&ContentInfo> {
        self.content.as_ref()
    }

    /// The identity capability
    pub fn identity(&self) -> Option<&Capability> {
        self.capabilities_in(IDENTITY_NAMESPACE).next()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.resource_type)
    }
}

// A resource is its identity: the index never holds two with the same id.
impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Shared handle to one capability of an indexed resource
#[derive(Clone)]
pub struct CapabilityRef {
    resource: Arc<Resource>,
    position: usize,
}

impl CapabilityRef {
    /// Handle to the capability at `position`; `None` if out of range
    pub fn new(resource: Arc<Resource>, position: usize) -> Option<Self> {
        if position < resource.capabilities.len() {
            Some(Self { resource, position })
        } else {
            None
        }
    }

    /// Every capability of a resource, in declaration order
    pub fn all(resource: &Arc<Resource>) -> impl Iterator<Item = CapabilityRef> + '_ {
        (0..resource.capabilities.len()).map(move |position| Self {
            resource: Arc::clone(resource),
            position,
        })
    }

    pub fn capability(&self) -> &Capability {
        &self.resource.capabilities[self.position]
    }

    /// The owning resource
    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl Deref for CapabilityRef {
    type Target = Capability;

    fn deref(&self) -> &Capability {
        self.capability()
    }
}

impl PartialEq for CapabilityRef {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.resource.id == other.resource.id
    }
}

impl Eq for CapabilityRef {}

impl Hash for CapabilityRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.id.hash(state);
        self.position.hash(state);
    }
}

impl fmt::Debug for CapabilityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRef")
            .field("resource", &self.resource.id)
            .field("position", &self.position)
            .field("namespace", &self.capability().namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Arc<Resource> {
        Arc::new(
            ResourceBuilder::new()
                .identity("acme-pool", Version::new(1, 5, 6), "bundle")
                .capability("pkg", [("pkg", AttrValue::from("org.acme.pool"))])
                .capability("pkg", [("pkg", AttrValue::from("org.acme.pool.spi"))])
                .requirement(Requirement::new("pkg").with_filter("(pkg=org.acme.log)"))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_capability_back_reference() {
        let resource = pool();
        for cap in resource.capabilities() {
            assert_eq!(cap.resource_id(), resource.id());
        }
    }

    #[test]
    fn test_capabilities_in_namespace_keep_order() {
        let resource = pool();
        let values: Vec<_> = resource
            .capabilities_in("pkg")
            .map(|c| c.primary_value().unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["org.acme.pool", "org.acme.pool.spi"]);
    }

    #[test]
    fn test_capability_ref_identity() {
        let resource = pool();
        let refs: Vec<_> = CapabilityRef::all(&resource).collect();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[1].namespace(), "pkg");
        assert_eq!(refs[1], CapabilityRef::new(Arc::clone(&resource), 1).unwrap());
        assert_ne!(refs[1], refs[2]);
        assert!(CapabilityRef::new(resource, 3).is_none());
    }

    #[test]
    fn test_identity_requirement_filter() {
        let req = Requirement::identity("acme-pool", None);
        assert_eq!(req.namespace(), IDENTITY_NAMESPACE);
        assert_eq!(req.filter(), Some("(identity=acme-pool)"));

        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        let req = Requirement::identity("acme(pool)", Some(&range));
        assert_eq!(
            req.filter(),
            Some("(&(identity=acme\\(pool\\))(&(version>=1.0.0)(!(version>=2.0.0))))")
        );
    }

    #[test]
    fn test_requirement_display() {
        assert_eq!(Requirement::wildcard("pkg").to_string(), "pkg:*");
        assert_eq!(
            Requirement::new("pkg").with_filter("(pkg=a)").to_string(),
            "pkg:(pkg=a)"
        );
    }
}
