//! Integer-keyed caching facade over performance counters.
//!
//! Looking up a performance counter by category, instance and counter name
//! is slow: the first touch of a category enumerates every counter in it.
//! This crate pays that cost once per category scope and afterwards lets
//! callers update counters through a small integer key.
//!
//! # Layers
//!
//! - [`key`]: Counter paths and their integer keys
//! - [`binding`]: Which counters need a base counter, and the update rules
//!   for a counter/base pair
//! - [`category`]: One-time enumeration and binding of a category scope
//! - [`registry`]: Process-wide key and category registries
//! - [`liaison`]: Name-keyed operations over the category cache
//! - [`facade`]: Integer-keyed operations, the usual entry point
//! - [`config`]: TOML configuration

pub mod binding;
pub mod category;
pub mod config;
pub mod error;
pub mod facade;
pub mod key;
pub mod liaison;
pub mod registry;

pub use binding::{base_type_for, classify, BoundCounter, CounterAccess};
pub use category::{compound_key, CachedCategory};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use facade::CounterFacade;
pub use key::{CounterKey, KeyStrategy};
pub use liaison::CounterLiaison;
pub use registry::{CategoryRegistry, KeyRegistry};
