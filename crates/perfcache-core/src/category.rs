//! Cached categories.
//!
//! A [`CachedCategory`] is built once per `(category, instance)` scope: the
//! collaborator enumerates every counter in the scope, each counter is
//! opened (writable when allowed), and ratio counters are paired with
//! their base counters. After construction the set of bound counters is
//! fixed and name lookups never touch the collaborator again.

use std::collections::HashMap;
use std::sync::Arc;

use perfcache_api::{CounterApi, SharedHandle};
use tracing::debug;

use crate::binding::{bind, open_for_binding, BoundCounter};
use crate::error::{CacheError, CacheResult};
use crate::key::normalize_instance;

/// Builds the compound cache key: `category(instance)`, or `category` alone.
///
/// The result is for display and error messages only. It is not unique:
/// `("A(b)", None)` and `("A", Some("b"))` render the same, so caches key
/// scopes by the `(category, instance)` pair instead.
pub fn compound_key(category: &str, instance: Option<&str>) -> String {
    match normalize_instance(instance) {
        Some(instance) => format!("{}({})", category, instance),
        None => category.to_string(),
    }
}

/// Every counter of one category scope, bound to its base where one exists.
#[derive(Debug)]
pub struct CachedCategory {
    category: String,
    instance: Option<String>,
    scope: String,
    counters: HashMap<String, BoundCounter>,
}

impl CachedCategory {
    /// Enumerates and binds every counter in the scope.
    ///
    /// Counters are visited back to front. A counter that requires a base is
    /// paired with the counter visited just before it (the one that follows
    /// it in enumeration order) only when that counter has exactly the
    /// required base kind; otherwise it is bound alone. When two counters
    /// share a name, the first one bound is kept.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidArgument`] if `category` is empty
    /// - [`CacheError::CategoryNotFound`] if the scope does not exist
    pub fn build(
        api: &dyn CounterApi,
        category: &str,
        instance: Option<&str>,
    ) -> CacheResult<Self> {
        if category.is_empty() {
            return Err(CacheError::invalid_argument("missing required category name"));
        }
        let instance = normalize_instance(instance);
        let scope = compound_key(category, instance);

        let descriptors = api.enumerate_counters(category, instance)?;
        let mut counters = HashMap::with_capacity(descriptors.len());
        let mut previous: Option<SharedHandle> = None;

        for descriptor in descriptors.iter().rev() {
            let opened = open_for_binding(api, descriptor)?;
            let handle = Arc::clone(&opened.handle);
            let bound = bind(opened, previous.as_ref());

            debug!(
                scope = %scope,
                counter = %bound.name(),
                counter_type = %bound.counter_type(),
                base = ?bound.base_name(),
                read_only = bound.is_read_only(),
                "Bound counter"
            );

            counters
                .entry(bound.name().to_string())
                .or_insert(bound);
            previous = Some(handle);
        }

        Ok(Self {
            category: category.to_string(),
            instance: instance.map(str::to_string),
            scope,
            counters,
        })
    }

    /// Category name.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Instance name, if the scope has one.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Compound key of the scope.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Looks up a bound counter by name.
    pub fn counter(&self, name: &str) -> Option<&BoundCounter> {
        self.counters.get(name)
    }

    /// Names of every bound counter, sorted.
    pub fn counter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.counters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound counters.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if the scope has no counters.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Looks up a bound counter, failing if the name is empty or unknown.
    pub fn bound(&self, name: &str) -> CacheResult<&BoundCounter> {
        if name.is_empty() {
            return Err(CacheError::invalid_argument("missing required counter name"));
        }
        self.counters
            .get(name)
            .ok_or_else(|| CacheError::counter_not_found(&self.scope, name))
    }

    /// Increments the named counter. See [`BoundCounter::increment`].
    pub fn increment(&self, name: &str) -> CacheResult<()> {
        self.bound(name)?.increment()
    }

    /// See [`BoundCounter::increment_by`].
    pub fn increment_by(&self, name: &str, amount: i64) -> CacheResult<()> {
        self.bound(name)?.increment_by(amount)
    }

    /// See [`BoundCounter::increment_by_with_base`].
    pub fn increment_by_with_base(
        &self,
        name: &str,
        amount: i64,
        base_amount: i64,
    ) -> CacheResult<()> {
        self.bound(name)?.increment_by_with_base(amount, base_amount)
    }

    /// See [`BoundCounter::decrement`].
    pub fn decrement(&self, name: &str) -> CacheResult<()> {
        self.bound(name)?.decrement()
    }

    /// Computed value of the named counter. See [`BoundCounter::next_value`].
    pub fn next_value(&self, name: &str) -> CacheResult<f32> {
        Ok(self.bound(name)?.next_value())
    }

    /// Raw value of the named counter.
    pub fn raw_value(&self, name: &str) -> CacheResult<i64> {
        Ok(self.bound(name)?.raw_value())
    }

    /// See [`BoundCounter::set_raw_value`].
    pub fn set_raw_value(&self, name: &str, value: i64) -> CacheResult<()> {
        self.bound(name)?.set_raw_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfcache_api::{CategoryDefinition, CounterType, MemoryCounterApi};
    use pretty_assertions::assert_eq;

    fn build(definition: CategoryDefinition) -> CachedCategory {
        let name = definition.name().to_string();
        let api = MemoryCounterApi::new().with_category(definition);
        CachedCategory::build(&api, &name, None).unwrap()
    }

    #[test]
    fn test_compound_key() {
        assert_eq!(compound_key("Processor", Some("0")), "Processor(0)");
        assert_eq!(compound_key("TestCat", None), "TestCat");
        assert_eq!(compound_key("TestCat", Some("")), "TestCat");
    }

    #[test]
    fn test_pairs_base_that_follows() {
        let cached = build(
            CategoryDefinition::new("TestCat")
                .counter("Items64", CounterType::NumberOfItems64)
                .counter("AvgCount", CounterType::AverageCount64)
                .counter("AvgCountBase", CounterType::AverageBase)
                .counter("Fraction", CounterType::SampleFraction)
                .counter("FractionBase", CounterType::SampleBase),
        );

        assert_eq!(cached.len(), 5);
        assert_eq!(
            cached.counter_names(),
            vec!["AvgCount", "AvgCountBase", "Fraction", "FractionBase", "Items64"]
        );
        let avg = cached.counter("AvgCount").unwrap();
        assert_eq!(avg.base_name(), Some("AvgCountBase"));
        let fraction = cached.counter("Fraction").unwrap();
        assert_eq!(fraction.base_type(), Some(CounterType::SampleBase));
        assert!(!cached.counter("Items64").unwrap().has_base());
        assert!(!cached.counter("AvgCountBase").unwrap().has_base());
    }

    #[test]
    fn test_mismatched_base_kind_binds_alone() {
        let cached = build(
            CategoryDefinition::new("TestCat")
                .counter("Fraction", CounterType::RawFraction)
                .counter("WrongBase", CounterType::SampleBase),
        );
        assert!(!cached.counter("Fraction").unwrap().has_base());
    }

    #[test]
    fn test_base_preceding_the_counter_is_not_paired() {
        let cached = build(
            CategoryDefinition::new("TestCat")
                .counter("AvgBase", CounterType::AverageBase)
                .counter("Avg", CounterType::AverageTimer32),
        );
        assert!(!cached.counter("Avg").unwrap().has_base());
    }

    #[test]
    fn test_last_counter_without_base_binds_alone() {
        let cached = build(
            CategoryDefinition::new("TestCat")
                .counter("Items", CounterType::NumberOfItems32)
                .counter("MultiTimer", CounterType::CounterMultiTimer),
        );
        assert!(!cached.counter("MultiTimer").unwrap().has_base());
    }

    #[test]
    fn test_duplicate_name_keeps_first_bound() {
        let cached = build(
            CategoryDefinition::new("TestCat")
                .counter("Dup", CounterType::NumberOfItems32)
                .counter("Dup", CounterType::RawFraction)
                .counter("DupBase", CounterType::RawBase),
        );
        assert_eq!(cached.len(), 2);
        assert!(cached.counter("Dup").is_some());
    }

    #[test]
    fn test_missing_scope() {
        let api = MemoryCounterApi::new()
            .with_category(CategoryDefinition::new("Processor").instance("0"));
        assert_eq!(
            CachedCategory::build(&api, "dogfood", None).unwrap_err(),
            CacheError::category_not_found("dogfood")
        );
        assert_eq!(
            CachedCategory::build(&api, "Processor", Some("99")).unwrap_err(),
            CacheError::category_not_found("Processor(99)")
        );
        assert!(matches!(
            CachedCategory::build(&api, "", None),
            Err(CacheError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_bound_lookup_errors() {
        let cached = build(
            CategoryDefinition::new("TestCat").counter("Items64", CounterType::NumberOfItems64),
        );
        assert!(matches!(cached.bound(""), Err(CacheError::InvalidArgument { .. })));
        assert_eq!(
            cached.increment("Items65").unwrap_err(),
            CacheError::counter_not_found("TestCat", "Items65")
        );
    }

    #[test]
    fn test_name_dispatch() {
        let cached = build(
            CategoryDefinition::new("TestCat").counter("Items64", CounterType::NumberOfItems64),
        );
        cached.increment("Items64").unwrap();
        assert_eq!(cached.raw_value("Items64").unwrap(), 1);
        cached.increment_by("Items64", 3).unwrap();
        assert_eq!(cached.raw_value("Items64").unwrap(), 4);
        cached.set_raw_value("Items64", 10).unwrap();
        cached.decrement("Items64").unwrap();
        assert_eq!(cached.next_value("Items64").unwrap(), 9.0);
    }
}
