//! Boundary to the operating system's performance-counter subsystem.
//!
//! This crate describes everything the counter cache needs from the OS,
//! without caching or binding anything itself:
//!
//! - [`types`]: Counter algorithm kinds, descriptors and access modes
//! - [`error`]: Error type reported by the counter subsystem
//! - [`api`]: The [`CounterApi`] / [`CounterHandle`] traits and the
//!   in-memory [`MemoryCounterApi`] backend
//!
//! # Example
//!
//! ```
//! use perfcache_api::{AccessMode, CategoryDefinition, CounterApi, CounterType, MemoryCounterApi};
//!
//! let api = MemoryCounterApi::new();
//! api.define_category(
//!     CategoryDefinition::new("Orders").counter("Placed", CounterType::NumberOfItems64),
//! );
//!
//! let descriptors = api.enumerate_counters("Orders", None).unwrap();
//! let placed = api.open_counter(&descriptors[0], AccessMode::Writable).unwrap();
//! placed.increment_by(3).unwrap();
//! assert_eq!(placed.raw_value(), 3);
//! ```

pub mod api;
pub mod error;
pub mod types;

pub use api::{CategoryDefinition, CounterApi, CounterHandle, MemoryCounter, MemoryCounterApi, SharedHandle};
pub use error::{ApiError, ApiResult};
pub use types::{AccessMode, CounterDescriptor, CounterType};
