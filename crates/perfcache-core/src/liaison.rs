//! Name-keyed counter access.
//!
//! [`CounterLiaison`] addresses counters by `(category, instance, counter)`
//! strings and owns the category cache. The integer-keyed
//! [`CounterFacade`](crate::CounterFacade) resolves its keys and then
//! dispatches through here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use perfcache_api::CounterApi;
use tracing::{info, trace, warn};

use crate::category::{compound_key, CachedCategory};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::registry::CategoryRegistry;

/// String-keyed operations over cached categories.
pub struct CounterLiaison {
    api: Arc<dyn CounterApi>,
    categories: CategoryRegistry,
    slow_enumeration: Duration,
}

impl CounterLiaison {
    /// Creates a liaison with default configuration.
    pub fn new(api: Arc<dyn CounterApi>) -> Self {
        Self::with_config(api, &CacheConfig::default())
    }

    /// Creates a liaison using the given configuration.
    pub fn with_config(api: Arc<dyn CounterApi>, config: &CacheConfig) -> Self {
        Self {
            api,
            categories: CategoryRegistry::new(),
            slow_enumeration: config.slow_enumeration(),
        }
    }

    /// The counter subsystem this liaison talks to.
    pub fn api(&self) -> &Arc<dyn CounterApi> {
        &self.api
    }

    /// The category cache.
    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Returns the cached category for a scope, enumerating and binding it
    /// on first use.
    ///
    /// Concurrent first-time callers for the same scope share a single
    /// enumeration. A failed enumeration is not cached.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidArgument`] if `category` is empty
    /// - [`CacheError::CategoryNotFound`] if the scope does not exist
    pub fn cache_category(
        &self,
        category: &str,
        instance: Option<&str>,
    ) -> CacheResult<Arc<CachedCategory>> {
        if category.is_empty() {
            return Err(CacheError::invalid_argument("missing required category name"));
        }

        let start = Instant::now();
        let (cached, built) = self
            .categories
            .get_or_build(self.api.as_ref(), category, instance)?;

        if built {
            let elapsed = start.elapsed();
            info!(
                scope = %cached.scope(),
                counters = cached.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Cached counter category"
            );
            if elapsed > self.slow_enumeration {
                warn!(
                    scope = %cached.scope(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = self.slow_enumeration.as_millis() as u64,
                    "Slow counter category enumeration"
                );
            }
        }
        Ok(cached)
    }

    /// Warms the cache for a scope so the first real update does not pay
    /// for enumeration.
    pub fn cache_counters(&self, category: &str, instance: Option<&str>) -> CacheResult<()> {
        self.cache_category(category, instance).map(|_| ())
    }

    /// Returns true if the counter subsystem knows the category.
    pub fn category_exists(&self, category: &str) -> CacheResult<bool> {
        if category.is_empty() {
            return Err(CacheError::invalid_argument("missing required category name"));
        }
        Ok(self.api.category_exists(category)?)
    }

    fn scope_for(
        &self,
        category: &str,
        instance: Option<&str>,
        counter: &str,
    ) -> CacheResult<Arc<CachedCategory>> {
        if counter.is_empty() {
            return Err(CacheError::invalid_argument("missing required counter name"));
        }
        trace!(
            scope = %compound_key(category, instance),
            counter = %counter,
            "Dispatching counter operation"
        );
        self.cache_category(category, instance)
    }

    pub fn increment(&self, category: &str, instance: Option<&str>, counter: &str) -> CacheResult<()> {
        self.scope_for(category, instance, counter)?.increment(counter)
    }

    pub fn increment_by(
        &self,
        category: &str,
        instance: Option<&str>,
        counter: &str,
        amount: i64,
    ) -> CacheResult<()> {
        self.scope_for(category, instance, counter)?
            .increment_by(counter, amount)
    }

    pub fn increment_by_with_base(
        &self,
        category: &str,
        instance: Option<&str>,
        counter: &str,
        amount: i64,
        base_amount: i64,
    ) -> CacheResult<()> {
        self.scope_for(category, instance, counter)?
            .increment_by_with_base(counter, amount, base_amount)
    }

    pub fn decrement(&self, category: &str, instance: Option<&str>, counter: &str) -> CacheResult<()> {
        self.scope_for(category, instance, counter)?.decrement(counter)
    }

    pub fn next_value(&self, category: &str, instance: Option<&str>, counter: &str) -> CacheResult<f32> {
        self.scope_for(category, instance, counter)?.next_value(counter)
    }

    pub fn raw_value(&self, category: &str, instance: Option<&str>, counter: &str) -> CacheResult<i64> {
        self.scope_for(category, instance, counter)?.raw_value(counter)
    }

    pub fn set_raw_value(
        &self,
        category: &str,
        instance: Option<&str>,
        counter: &str,
        value: i64,
    ) -> CacheResult<()> {
        self.scope_for(category, instance, counter)?
            .set_raw_value(counter, value)
    }

    /// Current high-resolution timestamp, in ticks.
    pub fn timestamp(&self) -> i64 {
        self.api.timestamp()
    }

    /// Ticks per second of [`CounterLiaison::timestamp`].
    pub fn timestamp_frequency(&self) -> i64 {
        self.api.timestamp_frequency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfcache_api::{CategoryDefinition, CounterType, MemoryCounterApi};
    use pretty_assertions::assert_eq;

    fn liaison() -> (Arc<MemoryCounterApi>, CounterLiaison) {
        let api = Arc::new(MemoryCounterApi::new().with_category(
            CategoryDefinition::new("TestCat")
                .counter("Items64", CounterType::NumberOfItems64)
                .counter("Avg", CounterType::AverageCount64)
                .counter("AvgBase", CounterType::AverageBase),
        ));
        let liaison = CounterLiaison::new(api.clone());
        (api, liaison)
    }

    #[test]
    fn test_name_keyed_updates() {
        let (_, liaison) = liaison();
        liaison.increment("TestCat", None, "Items64").unwrap();
        liaison.increment_by("TestCat", None, "Items64", 3).unwrap();
        assert_eq!(liaison.raw_value("TestCat", None, "Items64").unwrap(), 4);

        liaison.increment_by_with_base("TestCat", None, "Avg", 10, 4).unwrap();
        assert_eq!(liaison.next_value("TestCat", None, "Avg").unwrap(), 2.5);
        assert_eq!(liaison.raw_value("TestCat", None, "AvgBase").unwrap(), 4);
    }

    #[test]
    fn test_names_validated_first() {
        let (api, liaison) = liaison();
        assert!(matches!(
            liaison.increment("", None, "Items64"),
            Err(CacheError::InvalidArgument { .. })
        ));
        assert!(matches!(
            liaison.decrement("TestCat", None, ""),
            Err(CacheError::InvalidArgument { .. })
        ));
        assert_eq!(api.enumeration_count(), 0);
    }

    #[test]
    fn test_cache_category_once() {
        let (api, liaison) = liaison();
        liaison.cache_counters("TestCat", None).unwrap();
        let first = liaison.cache_category("TestCat", None).unwrap();
        let second = liaison.cache_category("TestCat", Some("")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(api.enumeration_count(), 1);
        assert_eq!(liaison.categories().len(), 1);
    }

    #[test]
    fn test_category_exists() {
        let (_, liaison) = liaison();
        assert!(liaison.category_exists("TestCat").unwrap());
        assert!(!liaison.category_exists("dogfood").unwrap());
        assert!(liaison.category_exists("").is_err());
    }

    #[test]
    fn test_timestamps() {
        let (_, liaison) = liaison();
        assert!(liaison.timestamp() >= 0);
        assert_eq!(liaison.timestamp_frequency(), 1_000_000_000);
    }
}
