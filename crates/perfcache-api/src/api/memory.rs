//! In-memory counter subsystem.
//!
//! Categories are defined up front (or at any later point) with an ordered
//! counter list. Every handle opened for the same category/instance/counter
//! path shares one atomic raw value, so concurrent increments through
//! different handles never lose updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::{CounterApi, CounterHandle, SharedHandle};
use crate::error::{ApiError, ApiResult};
use crate::types::{AccessMode, CounterDescriptor, CounterType};

/// Ticks per second of the in-memory clock (nanosecond resolution).
pub const MEMORY_TIMESTAMP_FREQUENCY: i64 = 1_000_000_000;

/// Definition of one category served by [`MemoryCounterApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    name: String,
    instances: Vec<String>,
    counters: Vec<(String, CounterType)>,
    read_only: bool,
}

impl CategoryDefinition {
    /// Creates a single-instance category with no counters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instances: Vec::new(),
            counters: Vec::new(),
            read_only: false,
        }
    }

    /// Adds an instance, making the category multi-instance.
    pub fn instance(mut self, name: impl Into<String>) -> Self {
        self.instances.push(name.into());
        self
    }

    /// Appends a counter. Base counters go right after the counter they support.
    pub fn counter(mut self, name: impl Into<String>, counter_type: CounterType) -> Self {
        self.counters.push((name.into(), counter_type));
        self
    }

    /// Refuses writable opens, like system-owned categories.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Returns the category name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the category has instances.
    pub fn is_multi_instance(&self) -> bool {
        !self.instances.is_empty()
    }

    /// Returns true if writable opens are refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn check_scope(&self, instance: Option<&str>) -> ApiResult<()> {
        match (self.is_multi_instance(), instance) {
            (false, None) => Ok(()),
            (false, Some(instance)) => Err(ApiError::instance_not_found(&self.name, instance)),
            (true, None) => Err(ApiError::InstanceRequired {
                category: self.name.clone(),
            }),
            (true, Some(instance)) if self.instances.iter().any(|i| i == instance) => Ok(()),
            (true, Some(instance)) => Err(ApiError::instance_not_found(&self.name, instance)),
        }
    }

    fn position(&self, counter: &str) -> Option<usize> {
        self.counters.iter().position(|(name, _)| name == counter)
    }
}

type CounterPath = (String, Option<String>, String);

/// Process-local implementation of [`CounterApi`].
pub struct MemoryCounterApi {
    categories: RwLock<HashMap<String, CategoryDefinition>>,
    cells: DashMap<CounterPath, Arc<AtomicI64>>,
    enumerations: AtomicUsize,
    epoch: Instant,
}

impl MemoryCounterApi {
    /// Creates a backend with no categories.
    pub fn new() -> Self {
        Self {
            categories: RwLock::new(HashMap::new()),
            cells: DashMap::new(),
            enumerations: AtomicUsize::new(0),
            epoch: Instant::now(),
        }
    }

    /// Adds a category, builder style.
    pub fn with_category(self, definition: CategoryDefinition) -> Self {
        self.define_category(definition);
        self
    }

    /// Adds or replaces a category. Existing raw values are kept.
    pub fn define_category(&self, definition: CategoryDefinition) {
        debug!(
            category = %definition.name,
            counters = definition.counters.len(),
            instances = definition.instances.len(),
            read_only = definition.read_only,
            "Defining in-memory counter category"
        );
        self.categories
            .write()
            .insert(definition.name.clone(), definition);
    }

    /// Number of `enumerate_counters` calls served so far.
    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    fn cell(&self, category: &str, instance: Option<&str>, counter: &str) -> Arc<AtomicI64> {
        let path = (
            category.to_string(),
            instance.map(str::to_string),
            counter.to_string(),
        );
        Arc::clone(self.cells.entry(path).or_default().value())
    }
}

impl Default for MemoryCounterApi {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterApi for MemoryCounterApi {
    fn category_exists(&self, category: &str) -> ApiResult<bool> {
        Ok(self.categories.read().contains_key(category))
    }

    fn enumerate_counters(
        &self,
        category: &str,
        instance: Option<&str>,
    ) -> ApiResult<Vec<CounterDescriptor>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);

        let categories = self.categories.read();
        let definition = categories
            .get(category)
            .ok_or_else(|| ApiError::category_not_found(category))?;
        definition.check_scope(instance)?;

        Ok(definition
            .counters
            .iter()
            .map(|(name, kind)| CounterDescriptor::new(category, instance, name.as_str(), *kind))
            .collect())
    }

    fn open_counter(
        &self,
        descriptor: &CounterDescriptor,
        access: AccessMode,
    ) -> ApiResult<SharedHandle> {
        let category = descriptor.category.as_str();
        let instance = descriptor.instance.as_deref();

        let categories = self.categories.read();
        let definition = categories
            .get(category)
            .ok_or_else(|| ApiError::category_not_found(category))?;
        definition.check_scope(instance)?;
        let position = definition
            .position(&descriptor.counter)
            .ok_or_else(|| ApiError::counter_not_found(category, descriptor.counter.as_str()))?;

        if access.is_writable() && definition.read_only {
            return Err(ApiError::access_denied(descriptor.to_string()));
        }

        let (name, counter_type) = &definition.counters[position];
        let base = counter_type.required_base().and_then(|required| {
            definition
                .counters
                .get(position + 1)
                .filter(|(_, kind)| *kind == required)
                .map(|(base_name, _)| self.cell(category, instance, base_name))
        });

        Ok(Arc::new(MemoryCounter {
            descriptor: CounterDescriptor::new(category, instance, name.as_str(), *counter_type),
            access,
            value: self.cell(category, instance, name),
            base,
        }))
    }

    fn timestamp(&self) -> i64 {
        i64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    fn timestamp_frequency(&self) -> i64 {
        MEMORY_TIMESTAMP_FREQUENCY
    }
}

/// Handle to one in-memory counter.
#[derive(Debug)]
pub struct MemoryCounter {
    descriptor: CounterDescriptor,
    access: AccessMode,
    value: Arc<AtomicI64>,
    // Raw value of the base defined right after this one, when it is the kind this counter needs.
    base: Option<Arc<AtomicI64>>,
}

impl MemoryCounter {
    fn ensure_writable(&self) -> ApiResult<()> {
        if self.access.is_writable() {
            Ok(())
        } else {
            Err(ApiError::access_denied(self.descriptor.to_string()))
        }
    }
}

impl CounterHandle for MemoryCounter {
    fn descriptor(&self) -> &CounterDescriptor {
        &self.descriptor
    }

    fn access(&self) -> AccessMode {
        self.access
    }

    fn increment(&self) -> ApiResult<i64> {
        self.increment_by(1)
    }

    fn increment_by(&self, amount: i64) -> ApiResult<i64> {
        self.ensure_writable()?;
        Ok(self
            .value
            .fetch_add(amount, Ordering::Relaxed)
            .wrapping_add(amount))
    }

    fn decrement(&self) -> ApiResult<i64> {
        self.ensure_writable()?;
        Ok(self.value.fetch_sub(1, Ordering::Relaxed).wrapping_sub(1))
    }

    fn next_value(&self) -> f32 {
        let raw = self.value.load(Ordering::Relaxed);
        let counter_type = self.descriptor.counter_type;
        let Some(base) = &self.base else {
            if counter_type.required_base().is_some() {
                return 0.0;
            }
            return raw as f32;
        };

        let denominator = base.load(Ordering::Relaxed);
        if denominator == 0 {
            return 0.0;
        }
        let mut value = raw as f64 / denominator as f64;
        if counter_type.is_timer() {
            value /= MEMORY_TIMESTAMP_FREQUENCY as f64;
        }
        if counter_type.is_fraction() {
            value *= 100.0;
        }
        value as f32
    }

    fn raw_value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn set_raw_value(&self, value: i64) -> ApiResult<()> {
        self.ensure_writable()?;
        self.value.store(value, Ordering::Relaxed);
        Ok(())
    }
}
