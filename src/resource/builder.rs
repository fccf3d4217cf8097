// src/resource/builder.rs

//! Resource assembly
//!
//! Builders are fed either by metadata parsers (raw attribute maps decoded
//! through the codec) or directly in code. `build()` validates the identity
//! and stamps every capability with the owning resource id.

use super::{
    Capability, ContentInfo, Requirement, Resource, ResourceError, ResourceId,
    CONTENT_NAMESPACE, DEFAULT_RESOURCE_TYPE, IDENTITY_NAMESPACE, MIME_ATTRIBUTE, SIZE_ATTRIBUTE,
    TYPE_ATTRIBUTE, VERSION_ATTRIBUTE,
};
use crate::attribute::{AttrValue, Attributes, Directives};
use crate::hash::Digest;
use crate::version::Version;

#[derive(Debug, Clone)]
struct PendingCapability {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
}

/// Builder for [`Resource`]
#[derive(Debug, Clone, Default)]
pub struct ResourceBuilder {
    capabilities: Vec<PendingCapability>,
    requirements: Vec<Requirement>,
    content: Option<ContentInfo>,
}

impl ResourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the identity capability
    pub fn identity(
        self,
        name: impl Into<String>,
        version: Version,
        resource_type: impl Into<String>,
    ) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(IDENTITY_NAMESPACE.to_string(), AttrValue::String(name.into()));
        attributes.insert(VERSION_ATTRIBUTE.to_string(), AttrValue::Version(version));
        attributes.insert(
            TYPE_ATTRIBUTE.to_string(),
            AttrValue::String(resource_type.into()),
        );
        self.capability_with_directives(IDENTITY_NAMESPACE, attributes, Directives::new())
    }

    /// Add a capability from attribute pairs
    pub fn capability<K, I>(self, namespace: impl Into<String>, attributes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttrValue)>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        self.capability_with_directives(namespace, attributes, Directives::new())
    }

    /// Add a capability with explicit attribute and directive maps
    pub fn capability_with_directives(
        mut self,
        namespace: impl Into<String>,
        attributes: Attributes,
        directives: Directives,
    ) -> Self {
        self.capabilities.push(PendingCapability {
            namespace: namespace.into(),
            attributes,
            directives,
        });
        self
    }

    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Attach binary content; a `content` capability is added on build
    pub fn content(mut self, digest: Digest, size: u64, mime: Option<String>) -> Self {
        self.content = Some(ContentInfo { digest, size, mime });
        self
    }

    /// Validate the identity and assemble the resource
    pub fn build(mut self) -> Result<Resource, ResourceError> {
        let identities: Vec<&PendingCapability> = self
            .capabilities
            .iter()
            .filter(|cap| cap.namespace == IDENTITY_NAMESPACE)
            .collect();

        let identity = match identities.as_slice() {
            [] => return Err(ResourceError::MissingIdentity),
            [identity] => *identity,
            many => return Err(ResourceError::MultipleIdentities(many.len())),
        };

        let name = match identity.attributes.get(IDENTITY_NAMESPACE) {
            Some(AttrValue::String(name)) if !name.is_empty() => name.clone(),
            Some(AttrValue::String(_)) | None => {
                return Err(ResourceError::InvalidIdentity(
                    "missing identity name".to_string(),
                ));
            }
            Some(other) => {
                return Err(ResourceError::InvalidIdentity(format!(
                    "identity name must be a String, found {}",
                    other.type_spec()
                )));
            }
        };

        let version = match identity.attributes.get(VERSION_ATTRIBUTE) {
            None => Version::EMPTY,
            Some(AttrValue::Version(v)) => v.clone(),
            // Metadata parsers sometimes hand versions over untyped
            Some(AttrValue::String(s)) => Version::parse(s).map_err(|e| {
                ResourceError::InvalidIdentity(format!("bad version for {}: {}", name, e))
            })?,
            Some(other) => {
                return Err(ResourceError::InvalidIdentity(format!(
                    "version must be a Version, found {}",
                    other.type_spec()
                )));
            }
        };

        let resource_type = match identity.attributes.get(TYPE_ATTRIBUTE) {
            Some(AttrValue::String(t)) => t.clone(),
            _ => DEFAULT_RESOURCE_TYPE.to_string(),
        };

        // Filters on `version` must see the parsed value, not the raw string
        if let Some(identity) = self
            .capabilities
            .iter_mut()
            .find(|cap| cap.namespace == IDENTITY_NAMESPACE)
        {
            identity.attributes.insert(
                VERSION_ATTRIBUTE.to_string(),
                AttrValue::Version(version.clone()),
            );
        }

        if let Some(content) = &self.content {
            let size = i64::try_from(content.size).map_err(|_| {
                ResourceError::InvalidIdentity(format!("content size {} out of range", content.size))
            })?;
            let mut attributes = Attributes::new();
            attributes.insert(
                CONTENT_NAMESPACE.to_string(),
                AttrValue::String(content.digest.to_string()),
            );
            attributes.insert(SIZE_ATTRIBUTE.to_string(), AttrValue::Long(size));
            if let Some(mime) = &content.mime {
                attributes.insert(MIME_ATTRIBUTE.to_string(), AttrValue::String(mime.clone()));
            }
            self.capabilities.push(PendingCapability {
                namespace: CONTENT_NAMESPACE.to_string(),
                attributes,
                directives: Directives::new(),
            });
        }

        let id = ResourceId::new(name, version);
        let capabilities = self
            .capabilities
            .into_iter()
            .map(|pending| {
                Capability::new(
                    pending.namespace,
                    pending.attributes,
                    pending.directives,
                    id.clone(),
                )
            })
            .collect();

        Ok(Resource {
            id,
            resource_type,
            capabilities,
            requirements: self.requirements,
            content: self.content,
        })
    }
}
