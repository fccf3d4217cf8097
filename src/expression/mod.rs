// src/expression/mod.rs

//! Boolean requirement expressions
//!
//! Expressions combine requirements with AND, OR and NOT and evaluate to sets
//! of resources, set-at-a-time:
//!
//! - `Simple(r)`: resources owning a capability that satisfies `r`
//! - `And`: intersection (an empty `And` is the empty set)
//! - `Or`: union
//! - `Not(Simple(r))`: `r` with its filter wrapped in `(!...)`, evaluated
//!   directly against the index. A requirement without a filter cannot be
//!   negated.
//! - `Not(Not(x))`: `x`
//! - `Not(And | Or)`: the universe (every indexed resource) minus the inner
//!   result
//!
//! Inside an `And`, a negated compound child is subtracted from the running
//! intersection instead of being materialized; this yields the same set
//! because every result is a subset of the universe.

use crate::filter::FilterError;
use crate::index::CapabilityIndex;
use crate::matcher::RequirementMatcher;
use crate::resource::{IDENTITY_NAMESPACE, Requirement, Resource};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Set of resources produced by an evaluation
pub type ResourceSet = HashSet<Arc<Resource>>;

/// Errors raised while evaluating an expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Unsupported negation: requirement '{0}' has no filter to invert")]
    UnsupportedNegation(String),

    #[error("Invalid filter in requirement: {0}")]
    Filter(#[from] FilterError),
}

/// A requirement expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementExpression {
    Simple(Requirement),
    And(Vec<RequirementExpression>),
    Or(Vec<RequirementExpression>),
    Not(Box<RequirementExpression>),
}

impl RequirementExpression {
    pub fn simple(requirement: Requirement) -> Self {
        Self::Simple(requirement)
    }

    pub fn and(children: impl IntoIterator<Item = RequirementExpression>) -> Self {
        Self::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = RequirementExpression>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    pub fn not(child: RequirementExpression) -> Self {
        Self::Not(Box::new(child))
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::And(_) | Self::Or(_))
    }
}

impl From<Requirement> for RequirementExpression {
    fn from(requirement: Requirement) -> Self {
        Self::Simple(requirement)
    }
}

/// Per-call evaluation state
#[derive(Default)]
struct EvalContext {
    universe: Option<ResourceSet>,
}

/// Evaluates requirement expressions against a capability index
pub struct Evaluator<'a> {
    matcher: RequirementMatcher<'a>,
    cache_universe: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(index: &'a CapabilityIndex) -> Self {
        Self {
            matcher: RequirementMatcher::new(index),
            cache_universe: true,
        }
    }

    /// Whether to reuse one universe snapshot for every negated compound
    /// within a single `eval` call
    pub fn with_universe_cache(mut self, enabled: bool) -> Self {
        self.cache_universe = enabled;
        self
    }

    /// Evaluate an expression into the set of matching resources
    pub fn eval(&self, expression: &RequirementExpression) -> Result<ResourceSet, EvalError> {
        let mut ctx = EvalContext::default();
        self.eval_node(expression, &mut ctx)
    }

    fn eval_node(
        &self,
        expression: &RequirementExpression,
        ctx: &mut EvalContext,
    ) -> Result<ResourceSet, EvalError> {
        match expression {
            RequirementExpression::Simple(requirement) => self.eval_simple(requirement),
            RequirementExpression::And(children) => self.eval_and(children, ctx),
            RequirementExpression::Or(children) => {
                let mut union = ResourceSet::new();
                for child in children {
                    union.extend(self.eval_node(child, ctx)?);
                }
                Ok(union)
            }
            RequirementExpression::Not(child) => self.eval_not(child, ctx),
        }
    }

    fn eval_simple(&self, requirement: &Requirement) -> Result<ResourceSet, EvalError> {
        let providers = self.matcher.find_providers(requirement)?;
        Ok(providers
            .into_iter()
            .map(|cap| Arc::clone(cap.resource()))
            .collect())
    }

    fn eval_and(
        &self,
        children: &[RequirementExpression],
        ctx: &mut EvalContext,
    ) -> Result<ResourceSet, EvalError> {
        if children.is_empty() {
            return Ok(ResourceSet::new());
        }

        let mut intersection: Option<ResourceSet> = None;
        let mut excluded = Vec::new();

        for child in children {
            match child {
                RequirementExpression::Not(inner) if inner.is_compound() => {
                    excluded.push(self.eval_node(inner, ctx)?);
                }
                _ => {
                    let result = self.eval_node(child, ctx)?;
                    intersection = Some(match intersection {
                        None => result,
                        Some(running) => running.intersection(&result).cloned().collect(),
                    });
                }
            }
        }

        let mut running = match intersection {
            Some(running) => running,
            None => self.universe(ctx)?,
        };

        for set in &excluded {
            running.retain(|resource| !set.contains(resource));
        }

        Ok(running)
    }

    fn eval_not(
        &self,
        child: &RequirementExpression,
        ctx: &mut EvalContext,
    ) -> Result<ResourceSet, EvalError> {
        match child {
            RequirementExpression::Simple(requirement) => {
                let Some(filter) = requirement.filter() else {
                    return Err(EvalError::UnsupportedNegation(requirement.to_string()));
                };
                let negated = requirement
                    .clone()
                    .with_filter(format!("(!{})", filter.trim()));
                self.eval_simple(&negated)
            }
            RequirementExpression::Not(grandchild) => self.eval_node(grandchild, ctx),
            RequirementExpression::And(_) | RequirementExpression::Or(_) => {
                let complement = self.eval_node(child, ctx)?;
                let mut universe = self.universe(ctx)?;
                universe.retain(|resource| !complement.contains(resource));
                Ok(universe)
            }
        }
    }

    /// Every resource known to the index
    fn universe(&self, ctx: &mut EvalContext) -> Result<ResourceSet, EvalError> {
        if self.cache_universe {
            if let Some(universe) = &ctx.universe {
                return Ok(universe.clone());
            }
        }

        debug!("Materializing resource universe for negation");
        let universe = self.eval_simple(&Requirement::wildcard(IDENTITY_NAMESPACE))?;
        if self.cache_universe {
            ctx.universe = Some(universe.clone());
        }
        Ok(universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrValue;
    use crate::resource::ResourceBuilder;
    use crate::version::Version;

    fn resource(name: &str, attr: i64) -> Arc<Resource> {
        Arc::new(
            ResourceBuilder::new()
                .identity(name, Version::new(1, 0, 0), "bundle")
                .capability("x", [("x", AttrValue::from(name)), ("attr", AttrValue::Long(attr))])
                .build()
                .unwrap(),
        )
    }

    fn filter(f: &str) -> RequirementExpression {
        Requirement::new("x").with_filter(f).into()
    }

    fn names(set: &ResourceSet) -> Vec<String> {
        let mut names: Vec<String> = set.iter().map(|r| r.name().to_string()).collect();
        names.sort();
        names
    }

    fn index() -> CapabilityIndex {
        let index = CapabilityIndex::new();
        index.add(resource("a", 1)).unwrap();
        index.add(resource("b", 2)).unwrap();
        index.add(resource("c", 3)).unwrap();
        index
    }

    #[test]
    fn test_not_simple_rewrites_filter() {
        let index = CapabilityIndex::new();
        index.add(resource("a", 1)).unwrap();
        index.add(resource("b", 2)).unwrap();
        let evaluator = Evaluator::new(&index);

        let result = evaluator
            .eval(&RequirementExpression::not(filter("(attr=1)")))
            .unwrap();
        assert_eq!(names(&result), vec!["b"]);
    }

    #[test]
    fn test_not_without_filter_is_unsupported() {
        let index = index();
        let evaluator = Evaluator::new(&index);
        let err = evaluator
            .eval(&RequirementExpression::not(Requirement::wildcard("x").into()))
            .unwrap_err();
        assert_eq!(err, EvalError::UnsupportedNegation("x:*".to_string()));
    }

    #[test]
    fn test_and_or() {
        let index = index();
        let evaluator = Evaluator::new(&index);

        let and = RequirementExpression::and([filter("(attr>=2)"), filter("(attr<=2)")]);
        assert_eq!(names(&evaluator.eval(&and).unwrap()), vec!["b"]);

        let or = RequirementExpression::or([filter("(attr=1)"), filter("(attr=3)")]);
        assert_eq!(names(&evaluator.eval(&or).unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn test_empty_and_is_empty() {
        let index = index();
        let evaluator = Evaluator::new(&index);
        assert!(evaluator.eval(&RequirementExpression::And(vec![])).unwrap().is_empty());
        assert!(evaluator.eval(&RequirementExpression::Or(vec![])).unwrap().is_empty());
    }

    #[test]
    fn test_double_negation() {
        let index = index();
        let evaluator = Evaluator::new(&index);

        let x = RequirementExpression::or([filter("(attr=1)"), filter("(attr=2)")]);
        let double = RequirementExpression::not(RequirementExpression::not(x.clone()));
        assert_eq!(evaluator.eval(&double).unwrap(), evaluator.eval(&x).unwrap());

        let simple = filter("(attr=3)");
        let double = RequirementExpression::not(RequirementExpression::not(simple.clone()));
        assert_eq!(evaluator.eval(&double).unwrap(), evaluator.eval(&simple).unwrap());
    }

    #[test]
    fn test_not_compound_uses_universe() {
        let index = index();
        let evaluator = Evaluator::new(&index);

        let expr = RequirementExpression::not(RequirementExpression::or([
            filter("(attr=1)"),
            filter("(attr=2)"),
        ]));
        assert_eq!(names(&evaluator.eval(&expr).unwrap()), vec!["c"]);
    }

    #[test]
    fn test_and_subtracts_negated_compound() {
        let index = index();
        let evaluator = Evaluator::new(&index);

        let negated = RequirementExpression::not(RequirementExpression::or([
            filter("(attr=1)"),
            filter("(attr=3)"),
        ]));

        let with_positive = RequirementExpression::and([filter("(attr>=2)"), negated.clone()]);
        assert_eq!(names(&evaluator.eval(&with_positive).unwrap()), vec!["b"]);

        // With only negated children the running set starts from the universe
        let only_negated = RequirementExpression::and([negated]);
        assert_eq!(names(&evaluator.eval(&only_negated).unwrap()), vec!["b"]);
    }

    #[test]
    fn test_de_morgan() {
        let index = index();
        let evaluator = Evaluator::new(&index);
        let a = filter("(attr>=2)");
        let b = filter("(attr<=2)");

        let lhs = RequirementExpression::not(RequirementExpression::and([a.clone(), b.clone()]));
        let rhs = RequirementExpression::or([
            RequirementExpression::not(a),
            RequirementExpression::not(b),
        ]);
        let lhs = evaluator.eval(&lhs).unwrap();
        assert_eq!(lhs, evaluator.eval(&rhs).unwrap());
        assert_eq!(names(&lhs), vec!["a", "c"]);
    }

    #[test]
    fn test_universe_cache_does_not_change_results() {
        let index = index();
        let expr = RequirementExpression::or([
            RequirementExpression::not(RequirementExpression::and([filter("(attr=1)")])),
            RequirementExpression::not(RequirementExpression::or([filter("(attr=2)")])),
        ]);

        let cached = Evaluator::new(&index).eval(&expr).unwrap();
        let uncached = Evaluator::new(&index)
            .with_universe_cache(false)
            .eval(&expr)
            .unwrap();
        assert_eq!(cached, uncached);
        assert_eq!(names(&cached), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_error_fails_whole_expression() {
        let index = index();
        let evaluator = Evaluator::new(&index);

        let expr = RequirementExpression::or([filter("(attr=1)"), filter("(attr=1")]);
        assert!(matches!(evaluator.eval(&expr), Err(EvalError::Filter(_))));

        let expr = RequirementExpression::and([
            filter("(attr=1)"),
            RequirementExpression::not(Requirement::wildcard("x").into()),
        ]);
        assert!(matches!(
            evaluator.eval(&expr),
            Err(EvalError::UnsupportedNegation(_))
        ));
    }
}
