//! Counter binding: base-counter classification and bound counters.
//!
//! Averages, multi-timers and fractions are ratios whose denominator lives
//! in a separate base counter. [`base_type_for`] knows which base kind each
//! such counter needs; [`BoundCounter`] pairs an opened counter with its
//! base (when one was found) and applies the update rules for the pair.

use perfcache_api::{
    AccessMode, ApiResult, CounterApi, CounterDescriptor, CounterType, SharedHandle,
};
use std::fmt;
use std::sync::Arc;

use crate::error::{CacheError, CacheResult};

/// Returns the base kind a counter of `counter_type` requires, if any.
pub fn base_type_for(counter_type: CounterType) -> Option<CounterType> {
    counter_type.required_base()
}

/// Returns the base kind the described counter requires, if any.
pub fn classify(descriptor: &CounterDescriptor) -> Option<CounterType> {
    base_type_for(descriptor.counter_type)
}

/// Whether a bound counter accepts writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterAccess {
    /// The subsystem refused a writable open.
    ReadOnly,
    /// Opened for writing.
    Writable,
}

/// A counter handle tagged with the access level it was actually granted.
pub struct OpenedCounter {
    /// The opened handle.
    pub handle: SharedHandle,
    /// Access granted by the subsystem.
    pub access: CounterAccess,
}

/// Opens a counter for writing, falling back to read-only when refused.
///
/// Only an access refusal triggers the fallback; any other failure is
/// returned as is.
pub fn open_for_binding(
    api: &dyn CounterApi,
    descriptor: &CounterDescriptor,
) -> ApiResult<OpenedCounter> {
    match api.open_counter(descriptor, AccessMode::Writable) {
        Ok(handle) => Ok(OpenedCounter {
            handle,
            access: CounterAccess::Writable,
        }),
        Err(err) if err.is_access_denied() => {
            let handle = api.open_counter(descriptor, AccessMode::ReadOnly)?;
            Ok(OpenedCounter {
                handle,
                access: CounterAccess::ReadOnly,
            })
        }
        Err(err) => Err(err),
    }
}

/// One counter plus the base counter it was paired with.
///
/// The binding never changes after construction; only the underlying raw
/// values do.
#[derive(Clone)]
pub struct BoundCounter {
    counter: SharedHandle,
    base: Option<SharedHandle>,
    access: CounterAccess,
}

impl BoundCounter {
    /// Binds a counter with an optional base.
    pub fn new(counter: SharedHandle, base: Option<SharedHandle>, access: CounterAccess) -> Self {
        Self {
            counter,
            base,
            access,
        }
    }

    /// Counter name.
    pub fn name(&self) -> &str {
        &self.counter.descriptor().counter
    }

    /// Algorithm kind of the primary counter.
    pub fn counter_type(&self) -> CounterType {
        self.counter.descriptor().counter_type
    }

    /// Algorithm kind of the bound base, if any.
    pub fn base_type(&self) -> Option<CounterType> {
        self.base.as_ref().map(|base| base.descriptor().counter_type)
    }

    /// Name of the bound base, if any.
    pub fn base_name(&self) -> Option<&str> {
        self.base.as_ref().map(|base| base.descriptor().counter.as_str())
    }

    /// Returns true if the subsystem refused write access.
    pub fn is_read_only(&self) -> bool {
        self.access == CounterAccess::ReadOnly
    }

    /// Returns true if a base counter is bound.
    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    /// The primary counter handle.
    pub fn counter(&self) -> &SharedHandle {
        &self.counter
    }

    /// The base counter handle, if any.
    pub fn base(&self) -> Option<&SharedHandle> {
        self.base.as_ref()
    }

    /// Adds one sample.
    ///
    /// With a base bound, the base is advanced instead of the primary: a
    /// bare increment on a ratio counter only makes sense on its denominator.
    pub fn increment(&self) -> CacheResult<()> {
        self.ensure_writable("increment")?;
        match &self.base {
            Some(base) => base.increment()?,
            None => self.counter.increment()?,
        };
        Ok(())
    }

    /// Adds `amount` to the primary; a bound base advances by one.
    pub fn increment_by(&self, amount: i64) -> CacheResult<()> {
        if self.base.is_some() {
            return self.increment_by_with_base(amount, 1);
        }
        self.ensure_writable("increment_by")?;
        self.counter.increment_by(amount)?;
        Ok(())
    }

    /// Adds `amount` to the primary and `base_amount` to the base.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidOperation`] if no base is bound.
    pub fn increment_by_with_base(&self, amount: i64, base_amount: i64) -> CacheResult<()> {
        let base = self.base.as_ref().ok_or_else(|| {
            CacheError::invalid_operation(format!(
                "{}: unable to increment counter and base because no base exists",
                self.name()
            ))
        })?;
        self.ensure_writable("increment_by_with_base")?;
        self.counter.increment_by(amount)?;
        base.increment_by(base_amount)?;
        Ok(())
    }

    /// Subtracts one from the primary; a bound base still counts one more sample.
    pub fn decrement(&self) -> CacheResult<()> {
        self.ensure_writable("decrement")?;
        self.counter.decrement()?;
        if let Some(base) = &self.base {
            base.increment()?;
        }
        Ok(())
    }

    /// Sampled value of the primary counter.
    pub fn next_value(&self) -> f32 {
        self.counter.next_value()
    }

    /// Raw value of the primary counter.
    pub fn raw_value(&self) -> i64 {
        self.counter.raw_value()
    }

    /// Overwrites the raw value of the primary counter.
    pub fn set_raw_value(&self, value: i64) -> CacheResult<()> {
        self.ensure_writable("set_raw_value")?;
        self.counter.set_raw_value(value)?;
        Ok(())
    }

    fn ensure_writable(&self, operation: &str) -> CacheResult<()> {
        if self.is_read_only() {
            return Err(CacheError::invalid_operation(format!(
                "{} on read-only counter '{}'",
                operation,
                self.name()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for BoundCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCounter")
            .field("counter", self.counter.descriptor())
            .field("base", &self.base.as_ref().map(|b| b.descriptor()))
            .field("access", &self.access)
            .finish()
    }
}

impl From<OpenedCounter> for BoundCounter {
    fn from(opened: OpenedCounter) -> Self {
        BoundCounter::new(opened.handle, None, opened.access)
    }
}

/// Binds `opened` to `base` when `base` has the kind the counter requires.
pub(crate) fn bind(opened: OpenedCounter, previous: Option<&SharedHandle>) -> BoundCounter {
    let required = classify(opened.handle.descriptor());
    let base = match (required, previous) {
        (Some(kind), Some(previous)) if previous.descriptor().counter_type == kind => {
            Some(Arc::clone(previous))
        }
        _ => None,
    };
    BoundCounter::new(opened.handle, base, opened.access)
}
