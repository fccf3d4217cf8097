// src/matcher.rs

//! Requirement matching
//!
//! Resolves a single requirement against the capability index: restrict to
//! the requirement's namespace, then keep the capabilities its `filter`
//! directive accepts. Without a filter, a requirement carrying a primary value
//! (the attribute named after its namespace) is an exact bucket lookup, and a
//! requirement with neither matches the whole namespace.

use crate::attribute::{AttrValue, encode_scalar};
use crate::filter::{Filter, FilterError};
use crate::index::CapabilityIndex;
use crate::resource::{Capability, CapabilityRef, Requirement};
use std::collections::HashSet;
use tracing::debug;

/// A requirement with its filter parsed once
#[derive(Debug, Clone)]
pub struct CompiledRequirement<'r> {
    requirement: &'r Requirement,
    filter: Option<Filter>,
}

impl<'r> CompiledRequirement<'r> {
    pub fn new(requirement: &'r Requirement) -> Result<Self, FilterError> {
        let filter = requirement.filter().map(Filter::parse).transpose()?;
        Ok(Self {
            requirement,
            filter,
        })
    }

    pub fn requirement(&self) -> &Requirement {
        self.requirement
    }

    /// Check one capability; fails closed across namespaces
    pub fn matches(&self, capability: &Capability) -> bool {
        if capability.namespace() != self.requirement.namespace() {
            return false;
        }

        if let Some(filter) = &self.filter {
            return filter.matches(capability.attributes());
        }

        match (self.requirement.primary_value(), capability.primary_value()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(wanted), Some(offered)) => {
                let offered = value_keys(offered);
                value_keys(wanted).iter().any(|key| offered.contains(key))
            }
        }
    }
}

fn value_keys(value: &AttrValue) -> HashSet<String> {
    value.elements().into_iter().map(encode_scalar).collect()
}

/// Check whether a capability satisfies a requirement
pub fn matches(requirement: &Requirement, capability: &Capability) -> Result<bool, FilterError> {
    Ok(CompiledRequirement::new(requirement)?.matches(capability))
}

/// Finds capabilities in an index that satisfy requirements
#[derive(Clone, Copy)]
pub struct RequirementMatcher<'a> {
    index: &'a CapabilityIndex,
}

impl<'a> RequirementMatcher<'a> {
    pub fn new(index: &'a CapabilityIndex) -> Self {
        Self { index }
    }

    /// All capabilities that satisfy `requirement`
    pub fn find_providers(
        &self,
        requirement: &Requirement,
    ) -> Result<HashSet<CapabilityRef>, FilterError> {
        let compiled = CompiledRequirement::new(requirement)?;
        let namespace = requirement.namespace();

        let candidates = match (&compiled.filter, requirement.primary_value()) {
            (None, Some(primary)) => {
                let mut found = HashSet::new();
                for key in value_keys(primary) {
                    found.extend(self.index.find_exact(namespace, &key));
                }
                found
            }
            _ => self.index.enumerate_all(namespace),
        };

        let providers: HashSet<CapabilityRef> = candidates
            .into_iter()
            .filter(|cap| compiled.matches(cap))
            .collect();

        debug!(
            "Requirement {} matched {} capabilities",
            requirement,
            providers.len()
        );
        Ok(providers)
    }
}
