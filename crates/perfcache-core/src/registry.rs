//! Process-wide registries.
//!
//! Entries are inserted if absent and then never mutated, so lookups need no
//! coordination with inserts beyond the map's own sharding. The only removal
//! is of a category slot whose build failed.
//!
//! - [`KeyRegistry`]: integer key to [`CounterKey`]
//! - [`CategoryRegistry`]: `(category, instance)` scope to [`CachedCategory`]

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use perfcache_api::CounterApi;
use tracing::warn;

use crate::category::CachedCategory;
use crate::error::{CacheError, CacheResult};
use crate::key::{normalize_instance, CounterKey, KeyStrategy};

type CounterPath = (String, Option<String>, String);

/// Maps integer keys to the counter paths they were registered for.
#[derive(Debug)]
pub struct KeyRegistry {
    strategy: KeyStrategy,
    keys: DashMap<i32, CounterKey>,
    // Sequential strategy only: path to the code already handed out.
    codes: DashMap<CounterPath, i32>,
    next_code: AtomicI32,
}

impl KeyRegistry {
    /// Creates an empty registry using `strategy` for new keys.
    pub fn new(strategy: KeyStrategy) -> Self {
        Self {
            strategy,
            keys: DashMap::new(),
            codes: DashMap::new(),
            next_code: AtomicI32::new(1),
        }
    }

    /// Strategy used for new keys.
    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Returns the key for a counter path, registering it if needed.
    ///
    /// Registering the same path again returns the same key. An empty
    /// instance is the same as no instance.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidArgument`] if `category` or `counter` is empty
    /// - [`CacheError::KeyCollision`] if the path hashes to a key that
    ///   already belongs to another path
    pub fn register(
        &self,
        category: &str,
        instance: Option<&str>,
        counter: &str,
    ) -> CacheResult<i32> {
        let key = CounterKey::new(category, instance, counter)?;
        match self.strategy {
            KeyStrategy::Hash => self.register_hashed(key),
            KeyStrategy::Sequential => Ok(self.register_sequential(key)),
        }
    }

    fn register_hashed(&self, key: CounterKey) -> CacheResult<i32> {
        let code = key.code();
        match self.keys.entry(code) {
            Entry::Occupied(existing) if existing.get().same_path(&key) => Ok(code),
            Entry::Occupied(existing) => {
                warn!(
                    code,
                    existing = %existing.get(),
                    requested = %key,
                    "Counter key collision"
                );
                Err(CacheError::KeyCollision {
                    code,
                    existing: existing.get().to_string(),
                    requested: key.to_string(),
                })
            }
            Entry::Vacant(vacant) => {
                vacant.insert(key);
                Ok(code)
            }
        }
    }

    fn register_sequential(&self, key: CounterKey) -> i32 {
        let path = (
            key.category().to_string(),
            key.instance().map(str::to_string),
            key.counter().to_string(),
        );
        let code = *self
            .codes
            .entry(path)
            .or_insert_with(|| self.next_code.fetch_add(1, Ordering::Relaxed))
            .value();
        self.keys
            .entry(code)
            .or_insert_with(|| key.with_code(code));
        code
    }

    /// Looks up the counter path for a key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownKey`] if the key was never registered.
    pub fn resolve(&self, code: i32) -> CacheResult<CounterKey> {
        self.keys
            .get(&code)
            .map(|entry| entry.value().clone())
            .ok_or(CacheError::UnknownKey { key: code })
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key was registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new(KeyStrategy::default())
    }
}

type CategorySlot = Arc<OnceCell<Arc<CachedCategory>>>;
type ScopeKey = (String, Option<String>);

fn scope_key(category: &str, instance: Option<&str>) -> ScopeKey {
    (
        category.to_string(),
        normalize_instance(instance).map(str::to_string),
    )
}

/// Caches one [`CachedCategory`] per `(category, instance)` scope.
///
/// Each scope owns a slot that is filled at most once. Callers racing on the
/// same scope wait for the one build in progress; callers on other scopes
/// are not blocked. A failed build drops its empty slot so a later call can
/// retry and names that never resolve do not accumulate.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    slots: DashMap<ScopeKey, CategorySlot>,
}

impl CategoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached category, building it on first use.
    ///
    /// The returned flag is true if this call performed the build.
    pub fn get_or_build(
        &self,
        api: &dyn CounterApi,
        category: &str,
        instance: Option<&str>,
    ) -> CacheResult<(Arc<CachedCategory>, bool)> {
        if category.is_empty() {
            return Err(CacheError::invalid_argument("missing required category name"));
        }
        let scope = scope_key(category, instance);

        // Clone the slot out so the shard lock is released before building.
        let slot = Arc::clone(
            self.slots
                .entry(scope.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let mut built = false;
        let result = slot.get_or_try_init(|| {
            built = true;
            CachedCategory::build(api, category, instance).map(Arc::new)
        });
        match result {
            Ok(cached) => Ok((Arc::clone(cached), built)),
            Err(err) => {
                // A concurrent caller may have filled the slot since.
                self.slots.remove_if(&scope, |_, slot| slot.get().is_none());
                Err(err)
            }
        }
    }

    /// Returns the category if it was already built.
    pub fn get(&self, category: &str, instance: Option<&str>) -> Option<Arc<CachedCategory>> {
        self.slots
            .get(&scope_key(category, instance))
            .and_then(|slot| slot.get().cloned())
    }

    /// Returns true if the scope has been built successfully.
    pub fn is_cached(&self, category: &str, instance: Option<&str>) -> bool {
        self.get(category, instance).is_some()
    }

    /// Number of categories built successfully.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    /// Returns true if no category has been built.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
