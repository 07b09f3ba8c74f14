//! Integer-keyed counter facade.
//!
//! Callers register a counter path once with
//! [`CounterFacade::get_or_register_key`] and pass the returned key to every
//! later operation. Each operation resolves the key, makes sure the
//! counter's category scope is cached, and dispatches to the bound counter.

use std::sync::Arc;

use perfcache_api::CounterApi;

use crate::category::CachedCategory;
use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::key::CounterKey;
use crate::liaison::CounterLiaison;
use crate::registry::KeyRegistry;

/// Integer-keyed entry point to the counter cache.
///
/// One facade is meant to live for the whole process and be shared by all
/// threads; every operation takes `&self`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use perfcache_api::{CategoryDefinition, CounterType, MemoryCounterApi};
/// use perfcache_core::CounterFacade;
///
/// let api = Arc::new(MemoryCounterApi::new().with_category(
///     CategoryDefinition::new("TestCat").counter("Items64", CounterType::NumberOfItems64),
/// ));
/// let facade = CounterFacade::new(api);
///
/// let key = facade.get_or_register_key("TestCat", None, "Items64").unwrap();
/// facade.increment(key).unwrap();
/// facade.increment_by(key, 3).unwrap();
/// assert_eq!(facade.raw_value(key).unwrap(), 4);
/// ```
pub struct CounterFacade {
    keys: KeyRegistry,
    liaison: CounterLiaison,
}

impl CounterFacade {
    /// Creates a facade with default configuration.
    pub fn new(api: Arc<dyn CounterApi>) -> Self {
        Self::with_config(api, &CacheConfig::default())
    }

    /// Creates a facade using the given configuration.
    pub fn with_config(api: Arc<dyn CounterApi>, config: &CacheConfig) -> Self {
        Self {
            keys: KeyRegistry::new(config.key_strategy),
            liaison: CounterLiaison::with_config(api, config),
        }
    }

    /// The key registry.
    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    /// The name-keyed layer this facade dispatches through.
    pub fn liaison(&self) -> &CounterLiaison {
        &self.liaison
    }

    /// Returns the key for a counter path, registering it if needed.
    pub fn get_or_register_key(
        &self,
        category: &str,
        instance: Option<&str>,
        counter: &str,
    ) -> CacheResult<i32> {
        self.keys.register(category, instance, counter)
    }

    /// Resolves a key back to its counter path.
    pub fn counter_key(&self, key: i32) -> CacheResult<CounterKey> {
        self.keys.resolve(key)
    }

    fn dispatch<T>(
        &self,
        key: i32,
        op: impl FnOnce(&CachedCategory, &str) -> CacheResult<T>,
    ) -> CacheResult<T> {
        let path = self.keys.resolve(key)?;
        let cached = self
            .liaison
            .cache_category(path.category(), path.instance())?;
        op(&cached, path.counter())
    }

    /// Adds one sample; with a base bound, only the base moves.
    pub fn increment(&self, key: i32) -> CacheResult<()> {
        self.dispatch(key, |cached, counter| cached.increment(counter))
    }

    /// Adds `amount` to the counter; a bound base advances by one.
    pub fn increment_by(&self, key: i32, amount: i64) -> CacheResult<()> {
        self.dispatch(key, |cached, counter| cached.increment_by(counter, amount))
    }

    /// Adds `amount` to the counter and `base_amount` to its base.
    ///
    /// Fails with [`CacheError::InvalidOperation`](crate::CacheError::InvalidOperation)
    /// if the counter has no base.
    pub fn increment_by_with_base(&self, key: i32, amount: i64, base_amount: i64) -> CacheResult<()> {
        self.dispatch(key, |cached, counter| {
            cached.increment_by_with_base(counter, amount, base_amount)
        })
    }

    /// Subtracts one from the counter; a bound base advances by one.
    pub fn decrement(&self, key: i32) -> CacheResult<()> {
        self.dispatch(key, |cached, counter| cached.decrement(counter))
    }

    /// Computed value of the counter, using its base when one is bound.
    pub fn next_value(&self, key: i32) -> CacheResult<f32> {
        self.dispatch(key, |cached, counter| cached.next_value(counter))
    }

    /// Raw value of the counter.
    pub fn raw_value(&self, key: i32) -> CacheResult<i64> {
        self.dispatch(key, |cached, counter| cached.raw_value(counter))
    }

    /// Overwrites the raw value of the counter.
    pub fn set_raw_value(&self, key: i32, value: i64) -> CacheResult<()> {
        self.dispatch(key, |cached, counter| cached.set_raw_value(counter, value))
    }

    /// Enumerates and binds a category scope ahead of its first use.
    pub fn cache_counters(&self, category: &str, instance: Option<&str>) -> CacheResult<()> {
        self.liaison.cache_counters(category, instance)
    }

    /// Current high-resolution timestamp from the counter subsystem.
    pub fn timestamp(&self) -> i64 {
        self.liaison.timestamp()
    }

    /// Ticks per second of [`Self::timestamp`].
    pub fn timestamp_frequency(&self) -> i64 {
        self.liaison.timestamp_frequency()
    }
}
