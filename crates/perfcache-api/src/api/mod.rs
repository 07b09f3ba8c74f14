//! Counter subsystem traits and backends.
//!
//! [`CounterApi`] is the category-level surface (existence checks,
//! enumeration, opening handles, timestamps) and [`CounterHandle`] is one
//! opened counter. Both are object safe so the cache can hold them as
//! trait objects regardless of backend.
//!
//! # Available Backends
//!
//! - [`memory`]: Process-local counters with atomic raw values

pub mod memory;

use std::sync::Arc;

use crate::error::ApiResult;
use crate::types::{AccessMode, CounterDescriptor};

pub use memory::{CategoryDefinition, MemoryCounter, MemoryCounterApi};

/// Shared, thread-safe counter handle.
pub type SharedHandle = Arc<dyn CounterHandle>;

/// Category-level operations of the counter subsystem.
pub trait CounterApi: Send + Sync {
    /// Returns true if the category is registered.
    fn category_exists(&self, category: &str) -> ApiResult<bool>;

    /// Lists every counter in a category (or category instance).
    ///
    /// Order is significant: a base counter is reported immediately after
    /// the counter it supports.
    ///
    /// # Errors
    ///
    /// Fails if the category or the category/instance scope does not exist.
    fn enumerate_counters(
        &self,
        category: &str,
        instance: Option<&str>,
    ) -> ApiResult<Vec<CounterDescriptor>>;

    /// Opens a handle to one counter.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AccessDenied`](crate::ApiError::AccessDenied) when a
    /// writable open is refused (system counters).
    fn open_counter(
        &self,
        descriptor: &CounterDescriptor,
        access: AccessMode,
    ) -> ApiResult<SharedHandle>;

    /// Current value of the monotonic high-resolution clock, in ticks.
    fn timestamp(&self) -> i64;

    /// Ticks per second of [`CounterApi::timestamp`].
    fn timestamp_frequency(&self) -> i64;
}

/// One opened counter.
///
/// Increments must be safe to call from many threads at once.
pub trait CounterHandle: Send + Sync {
    /// The counter this handle refers to.
    fn descriptor(&self) -> &CounterDescriptor;

    /// Mode the handle was opened with.
    fn access(&self) -> AccessMode;

    /// Adds one to the raw value, returning the new raw value.
    fn increment(&self) -> ApiResult<i64>;

    /// Adds `amount` to the raw value, returning the new raw value.
    fn increment_by(&self, amount: i64) -> ApiResult<i64>;

    /// Subtracts one from the raw value, returning the new raw value.
    fn decrement(&self) -> ApiResult<i64>;

    /// Computes the sampled value according to the counter's algorithm kind.
    fn next_value(&self) -> f32;

    /// Returns the stored raw value.
    fn raw_value(&self) -> i64;

    /// Overwrites the stored raw value.
    fn set_raw_value(&self, value: i64) -> ApiResult<()>;
}
