// src/repository/mod.rs

//! Resource repository
//!
//! Ties the capability index to the content store:
//!
//! - resources are indexed in memory and resolved through requirements and
//!   requirement expressions
//! - payloads are stored once per digest, however many resources ship them
//! - a blob is deleted when the last indexed resource referencing it is
//!   removed
//!
//! Reference counts and blob deletion are serialized by one lock, so a blob
//! is never deleted while an `add` that needs it is in flight. Index reads
//! (`find_providers`, `eval`, `index()`) never take that lock.

mod config;

pub use config::RepositoryConfig;

use crate::error::{Error, Result};
use crate::expression::{Evaluator, RequirementExpression, ResourceSet};
use crate::filesystem::ContentStore;
use crate::hash::Digest;
use crate::index::CapabilityIndex;
use crate::matcher::RequirementMatcher;
use crate::resource::{CapabilityRef, Requirement, Resource, ResourceBuilder};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An indexed set of resources backed by a content store
pub struct Repository {
    config: RepositoryConfig,
    index: CapabilityIndex,
    store: ContentStore,
    /// Number of indexed resources referencing each stored digest
    refs: Mutex<HashMap<Digest, usize>>,
}

impl Repository {
    /// Open a repository with an empty index over the configured store
    pub fn open(config: RepositoryConfig) -> Result<Self> {
        let store =
            ContentStore::new(&config.content_dir)?.with_verification(config.verify_on_read);
        info!("Opened repository at {}", config.content_dir.display());

        Ok(Self {
            config,
            index: CapabilityIndex::new(),
            store,
            refs: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Index a resource
    ///
    /// If the resource references content, that blob must already be in the
    /// store; it gains one reference.
    pub fn add(&self, resource: impl Into<Arc<Resource>>) -> Result<Arc<Resource>> {
        let resource = resource.into();
        let mut refs = self.refs.lock();

        if let Some(content) = resource.content() {
            if !self.store.has(&content.digest) {
                return Err(Error::ContentNotFound(content.digest.to_string()));
            }
        }

        self.index.add(Arc::clone(&resource))?;

        if let Some(content) = resource.content() {
            *refs.entry(content.digest.clone()).or_insert(0) += 1;
        }

        info!("Added resource {}", resource.id());
        Ok(resource)
    }

    /// Stream a payload into the store, attach it to `builder` and index
    /// the result
    ///
    /// If indexing fails, a blob this call created is deleted again; bytes
    /// that were already stored are left alone.
    pub fn add_with_content<R: Read>(
        &self,
        builder: ResourceBuilder,
        reader: R,
        mime: Option<String>,
    ) -> Result<Arc<Resource>> {
        let mut refs = self.refs.lock();

        let (digest, size, created) = self.store.put_reader(reader)?;
        let indexed = builder
            .content(digest.clone(), size, mime)
            .build()
            .map_err(Error::from)
            .map(Arc::new)
            .and_then(|resource| {
                self.index.add(Arc::clone(&resource))?;
                Ok(resource)
            });

        match indexed {
            Ok(resource) => {
                *refs.entry(digest).or_insert(0) += 1;
                info!("Added resource {} with {} bytes of content", resource.id(), size);
                Ok(resource)
            }
            Err(e) => {
                if created && !refs.contains_key(&digest) {
                    match self.store.remove(&digest) {
                        Ok(_) => debug!("Discarded unreferenced content {}", digest),
                        Err(cleanup) => {
                            warn!("Failed to discard content {}: {}", digest, cleanup)
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Remove a resource from the index, releasing its content reference
    ///
    /// Returns false if no resource with that identity is indexed.
    pub fn remove(&self, resource: &Resource) -> Result<bool> {
        let mut refs = self.refs.lock();

        let Some(indexed) = self.index.get(resource.id()) else {
            return Ok(false);
        };
        if !self.index.remove(&indexed) {
            return Ok(false);
        }
        info!("Removed resource {}", indexed.id());

        let Some(content) = indexed.content() else {
            return Ok(true);
        };

        let remaining = refs.get_mut(&content.digest).map(|count| {
            *count = count.saturating_sub(1);
            *count
        });

        match remaining {
            Some(0) => {
                refs.remove(&content.digest);
                self.store.remove(&content.digest)?;
                debug!("Deleted content {}", content.digest);
            }
            Some(count) => {
                debug!("Content {} still referenced {} times", content.digest, count);
            }
            None => warn!(
                "Resource {} referenced untracked content {}",
                indexed.id(),
                content.digest
            ),
        }

        Ok(true)
    }

    /// Capabilities satisfying a single requirement
    pub fn find_providers(&self, requirement: &Requirement) -> Result<HashSet<CapabilityRef>> {
        Ok(RequirementMatcher::new(&self.index).find_providers(requirement)?)
    }

    /// Resources satisfying a requirement expression
    pub fn eval(&self, expression: &RequirementExpression) -> Result<ResourceSet> {
        let evaluator =
            Evaluator::new(&self.index).with_universe_cache(self.config.cache_universe);
        Ok(evaluator.eval(expression)?)
    }

    /// Payload bytes of a resource, or None if it carries no content
    pub fn content(&self, resource: &Resource) -> Result<Option<Vec<u8>>> {
        match resource.content() {
            Some(content) => Ok(Some(self.store.get(&content.digest)?)),
            None => Ok(None),
        }
    }

    /// Delete stored blobs no indexed resource references
    ///
    /// The index lives in memory, so blobs left behind by an earlier process
    /// are unreferenced until resources naming them are added again.
    pub fn collect_garbage(&self) -> Result<usize> {
        let refs = self.refs.lock();
        let mut removed = 0;

        for digest in self.store.digests()? {
            if !refs.contains_key(&digest) && self.store.remove(&digest)? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Collected {} unreferenced blobs", removed);
        }
        Ok(removed)
    }
}
