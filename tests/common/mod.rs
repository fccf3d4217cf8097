// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use resource_repo::attribute::{AttrValue, Attributes, Directives, decode};
use resource_repo::{
    CapabilityIndex, Repository, RepositoryConfig, Resource, ResourceBuilder, Version,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Build a bundle resource with one `pkg` capability per package name.
pub fn bundle(name: &str, version: &str, packages: &[&str]) -> Arc<Resource> {
    let mut builder =
        ResourceBuilder::new().identity(name, Version::parse(version).unwrap(), "bundle");
    for pkg in packages {
        builder = builder.capability("pkg", [("pkg", AttrValue::from(*pkg))]);
    }
    Arc::new(builder.build().unwrap())
}

/// Build a resource exposing one capability in namespace `x` with `attr` set.
pub fn x_resource(name: &str, attr: i64) -> Arc<Resource> {
    Arc::new(
        ResourceBuilder::new()
            .identity(name, Version::new(1, 0, 0), "bundle")
            .capability("x", [("attr", AttrValue::Long(attr))])
            .build()
            .unwrap(),
    )
}

/// Decode raw `(name, type spec, raw value)` triples the way a metadata
/// parser would hand them over.
pub fn decode_attributes(raw: &[(&str, Option<&str>, &str)]) -> Attributes {
    raw.iter()
        .map(|(name, spec, value)| (name.to_string(), decode(*spec, value).unwrap()))
        .collect()
}

/// Index holding the acme-pool resource from the resolver walkthrough.
pub fn acme_index() -> CapabilityIndex {
    let index = CapabilityIndex::new();
    index
        .add(bundle("acme-pool", "1.5.6", &["org.acme.pool"]))
        .unwrap();
    index
}

/// Index with resources A (attr=1), B (attr=2) and C (attr=3).
pub fn abc_index() -> CapabilityIndex {
    let index = CapabilityIndex::new();
    for (name, attr) in [("A", 1), ("B", 2), ("C", 3)] {
        index.add(x_resource(name, attr)).unwrap();
    }
    index
}

/// Open a repository in a fresh temp directory.
///
/// Returns (TempDir, Repository) - keep the TempDir alive to prevent cleanup.
pub fn setup_repository() -> (TempDir, Repository) {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = Repository::open(RepositoryConfig::new(temp_dir.path().join("content"))).unwrap();
    (temp_dir, repo)
}

/// Sorted resource names, for readable set assertions.
pub fn names<'a>(resources: impl IntoIterator<Item = &'a Arc<Resource>>) -> Vec<String> {
    let mut names: Vec<String> = resources
        .into_iter()
        .map(|r| r.name().to_string())
        .collect();
    names.sort();
    names
}

/// Empty directive map, for building capabilities from decoded attributes.
pub fn no_directives() -> Directives {
    Directives::new()
}
