//! Schema binding
//!
//! Type-checks compiled aggregates and predicates against the schemas the
//! event index has learned. Binding is lazy: each (expression, event type)
//! pair is checked the first time it is needed and the outcome is cached
//! for the lifetime of the binder.

use crate::compiler::CompiledQuery;
use crate::error::{CompileError, Result};
use crate::semantic::{TypeChecker, TypeInfo};
use chronofeat_core::ir::{CompiledAggregate, CompiledPredicate};
use chronofeat_core::SchemaRegistry;
use std::collections::{BTreeSet, HashMap};

/// Binds compiled expressions to event-type schemas
#[derive(Debug)]
pub struct SchemaBinder<'a> {
    schema: &'a SchemaRegistry,
    /// (expression key, event type) -> outcome
    cache: HashMap<(String, String), Result<TypeInfo>>,
    /// Expression keys whose attribute existence was already verified
    resolved: HashMap<String, Result<()>>,
}

impl<'a> SchemaBinder<'a> {
    pub fn new(schema: &'a SchemaRegistry) -> Self {
        Self {
            schema,
            cache: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Bind every aggregate of a query against all of its candidate event types
    pub fn bind_query(&mut self, query: &CompiledQuery) -> Result<()> {
        for feature in &query.features {
            for (slot, aggregate) in feature.aggregates.iter().enumerate() {
                let key = format!("{}#{}", feature.name, slot);
                self.bind_aggregate(&key, aggregate)?;
            }
        }
        Ok(())
    }

    /// Bind one aggregate slot; `key` identifies it within the query
    pub fn bind_aggregate(&mut self, key: &str, aggregate: &CompiledAggregate) -> Result<()> {
        let candidates = self.known_candidates(aggregate.event_types.as_ref());
        self.resolve_attributes(key, &aggregate.attributes(), &candidates)?;

        for event_type in &candidates {
            self.cached(key, event_type, |checker| checker.check_aggregate(aggregate))?;
        }
        Ok(())
    }

    /// Bind a predicate for one event type.
    ///
    /// Returns `false` when the predicate pins other event types, in which
    /// case events of `event_type` can never match.
    pub fn bind_predicate(&mut self, predicate: &CompiledPredicate, event_type: &str) -> Result<bool> {
        if let Some(pinned) = &predicate.event_types {
            if !pinned.contains(event_type) {
                return Ok(false);
            }
        }

        let candidates = self.known_candidates(predicate.event_types.as_ref());
        self.resolve_attributes(&predicate.raw, &predicate.expr.attributes(), &candidates)?;

        if self.schema.get(event_type).is_none() {
            return Ok(true);
        }
        let result_type = self.cached(&predicate.raw, event_type, |checker| {
            checker.check_expression(&predicate.expr, &[])
        })?;
        if !result_type.is_boolean() {
            return Err(CompileError::TypeMismatch {
                context: format!("condition '{}'", predicate.raw),
                expected: "boolean".to_string(),
                found: result_type.to_string(),
            });
        }
        Ok(true)
    }

    /// Candidate event types that have a recorded schema
    fn known_candidates(&self, pinned: Option<&BTreeSet<String>>) -> Vec<String> {
        match pinned {
            Some(types) => types
                .iter()
                .filter(|t| self.schema.get(t).is_some())
                .cloned()
                .collect(),
            None => self.schema.event_types().map(str::to_string).collect(),
        }
    }

    /// Every attribute must exist in at least one candidate schema
    fn resolve_attributes(
        &mut self,
        key: &str,
        attributes: &BTreeSet<String>,
        candidates: &[String],
    ) -> Result<()> {
        if let Some(outcome) = self.resolved.get(key) {
            return outcome.clone();
        }

        let outcome = if candidates.is_empty() {
            // nothing learned yet for these event types
            Ok(())
        } else {
            attributes
                .iter()
                .find(|attribute| {
                    !candidates.iter().any(|event_type| {
                        self.schema
                            .get(event_type)
                            .map_or(false, |schema| schema.contains(attribute))
                    })
                })
                .map_or(Ok(()), |missing| {
                    Err(CompileError::UnknownAttribute {
                        attribute: missing.clone(),
                        event_types: candidates.to_vec(),
                    })
                })
        };

        self.resolved.insert(key.to_string(), outcome.clone());
        outcome
    }

    fn cached(
        &mut self,
        key: &str,
        event_type: &str,
        check: impl FnOnce(&TypeChecker) -> Result<TypeInfo>,
    ) -> Result<TypeInfo> {
        let cache_key = (key.to_string(), event_type.to_string());
        if let Some(outcome) = self.cache.get(&cache_key) {
            return outcome.clone();
        }

        let outcome = match self.schema.get(event_type) {
            Some(schema) => check(&TypeChecker::for_schema(schema)),
            None => Ok(TypeInfo::Unknown),
        };
        log::debug!("bound '{}' to event type '{}': {:?}", key, event_type, outcome);
        self.cache.insert(cache_key, outcome.clone());
        outcome
    }

    /// Number of cached (expression, event type) bindings
    pub fn cached_bindings(&self) -> usize {
        self.cache.len()
    }
}
