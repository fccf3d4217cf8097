// src/index/mod.rs

//! Capability index
//!
//! Maps `(namespace, value key)` to the capabilities offering that value, plus
//! an identity map from [`ResourceId`] to resource. The value key of a
//! capability is the codec's canonical encoding of its primary attribute (the
//! attribute named after the namespace); a list-valued primary attribute is
//! bucketed once per element. Every capability also lands in its namespace's
//! catch-all bucket, which backs [`CapabilityIndex::enumerate_all`].
//!
//! # Consistency
//!
//! All state sits behind one lock. `add` and `remove` hold the write lock for
//! the whole resource, so readers never see a resource in the identity map
//! without its capabilities in their buckets, or the reverse. A rejected `add`
//! touches nothing.

use crate::attribute::encode_scalar;
use crate::resource::{Capability, CapabilityRef, Resource, ResourceId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A resource with the same identity is already indexed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Duplicate resource: {id} is already in the index")]
pub struct DuplicateResource {
    pub id: ResourceId,
}

/// Bucket key within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    /// Catch-all bucket holding every capability in the namespace
    Any,
    Value(String),
}

type Buckets = HashMap<ValueKey, HashSet<CapabilityRef>>;

#[derive(Default)]
struct IndexState {
    resources: HashMap<ResourceId, Arc<Resource>>,
    namespaces: HashMap<String, Buckets>,
}

/// Thread-safe capability index
#[derive(Default)]
pub struct CapabilityIndex {
    state: RwLock<IndexState>,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource and bucket all of its capabilities
    ///
    /// Fails without modifying the index if a resource with the same
    /// identity is already present.
    pub fn add(&self, resource: impl Into<Arc<Resource>>) -> Result<(), DuplicateResource> {
        let resource = resource.into();
        let mut state = self.state.write();

        if state.resources.contains_key(resource.id()) {
            return Err(DuplicateResource {
                id: resource.id().clone(),
            });
        }

        for cap_ref in CapabilityRef::all(&resource) {
            let buckets = state
                .namespaces
                .entry(cap_ref.namespace().to_string())
                .or_default();
            for key in value_keys(&cap_ref) {
                buckets.entry(key).or_default().insert(cap_ref.clone());
            }
        }

        debug!(
            "Indexed resource {} ({} capabilities)",
            resource.id(),
            resource.capabilities().len()
        );
        state.resources.insert(resource.id().clone(), resource);
        Ok(())
    }

    /// Remove a resource and purge its capabilities from every bucket
    ///
    /// Returns false if no resource with that identity is indexed.
    pub fn remove(&self, resource: &Resource) -> bool {
        let mut state = self.state.write();

        let Some(indexed) = state.resources.remove(resource.id()) else {
            return false;
        };

        for cap_ref in CapabilityRef::all(&indexed) {
            let namespace = cap_ref.namespace();
            let Some(buckets) = state.namespaces.get_mut(namespace) else {
                continue;
            };

            for key in value_keys(&cap_ref) {
                if let Some(bucket) = buckets.get_mut(&key) {
                    bucket.remove(&cap_ref);
                    if bucket.is_empty() {
                        buckets.remove(&key);
                    }
                }
            }

            if buckets.is_empty() {
                state.namespaces.remove(namespace);
            }
        }

        debug!("Removed resource {} from index", indexed.id());
        true
    }

    /// Capabilities whose primary value encodes to exactly `value`
    pub fn find_exact(&self, namespace: &str, value: &str) -> HashSet<CapabilityRef> {
        let state = self.state.read();
        state
            .namespaces
            .get(namespace)
            .and_then(|buckets| buckets.get(&ValueKey::Value(value.to_string())))
            .cloned()
            .unwrap_or_default()
    }

    /// Every capability in a namespace
    pub fn enumerate_all(&self, namespace: &str) -> HashSet<CapabilityRef> {
        let state = self.state.read();
        state
            .namespaces
            .get(namespace)
            .and_then(|buckets| buckets.get(&ValueKey::Any))
            .cloned()
            .unwrap_or_default()
    }

    /// Every capability in each of several namespaces, read under one lock
    ///
    /// The sets come back in the order the namespaces were given and reflect
    /// a single consistent state of the index.
    pub fn enumerate_namespaces(&self, namespaces: &[&str]) -> Vec<HashSet<CapabilityRef>> {
        let state = self.state.read();
        namespaces
            .iter()
            .map(|namespace| {
                state
                    .namespaces
                    .get(*namespace)
                    .and_then(|buckets| buckets.get(&ValueKey::Any))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Look up an indexed resource by identity
    pub fn get(&self, id: &ResourceId) -> Option<Arc<Resource>> {
        self.state.read().resources.get(id).cloned()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.state.read().resources.contains_key(id)
    }

    /// Snapshot of every indexed resource, in no particular order
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.state.read().resources.values().cloned().collect()
    }

    /// Namespaces with at least one indexed capability
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.state.read().namespaces.keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.state.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().resources.is_empty()
    }
}

/// Buckets a capability belongs to: the catch-all plus one per primary value
fn value_keys(capability: &Capability) -> Vec<ValueKey> {
    let mut keys = vec![ValueKey::Any];
    if let Some(value) = capability.primary_value() {
        for scalar in value.elements() {
            let key = ValueKey::Value(encode_scalar(scalar));
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}
