//! Error types for counter cache operations.
//!
//! Every variant tells the caller a different fix: register the key first,
//! correct a counter name, or stop using a base-amount operation on a
//! counter that has no base.

use perfcache_api::ApiError;
use thiserror::Error;

use crate::category::compound_key;

/// Result type alias for counter cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur while registering, caching or dispatching counters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A required name was missing or empty.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// The integer key was never registered.
    #[error("Counter key {key} is not registered")]
    UnknownKey {
        /// The unregistered key.
        key: i32,
    },

    /// The category, or category/instance scope, does not exist.
    #[error("Category '{scope}' does not exist")]
    CategoryNotFound {
        /// Compound category key, `category` or `category(instance)`.
        scope: String,
    },

    /// The cached category has no counter by that name.
    #[error("Counter '{counter}' does not exist in category '{scope}'")]
    CounterNotFound {
        /// Compound category key.
        scope: String,
        /// The requested counter name.
        counter: String,
    },

    /// The operation is not valid for this counter.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Why the operation was refused.
        message: String,
    },

    /// A different counter path already owns this hashed key.
    #[error("Counter key {code} for '{requested}' is already taken by '{existing}'")]
    KeyCollision {
        /// The colliding key.
        code: i32,
        /// Path that registered the key first.
        existing: String,
        /// Path whose registration was refused.
        requested: String,
    },

    /// Any other counter subsystem failure.
    #[error("Counter subsystem error: {0}")]
    Api(#[source] ApiError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },
}

impl CacheError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a category not found error for a compound scope.
    pub fn category_not_found(scope: impl Into<String>) -> Self {
        Self::CategoryNotFound {
            scope: scope.into(),
        }
    }

    /// Creates a counter not found error.
    pub fn counter_not_found(scope: impl Into<String>, counter: impl Into<String>) -> Self {
        Self::CounterNotFound {
            scope: scope.into(),
            counter: counter.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<ApiError> for CacheError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::CategoryNotFound { category } | ApiError::InstanceRequired { category } => {
                CacheError::category_not_found(category)
            }
            ApiError::InstanceNotFound { category, instance } => {
                CacheError::category_not_found(compound_key(&category, Some(&instance)))
            }
            ApiError::AccessDenied { counter } => {
                CacheError::invalid_operation(format!("counter '{}' is read-only", counter))
            }
            other => CacheError::Api(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = CacheError::counter_not_found("TestCat", "Items65");
        assert_eq!(
            err.to_string(),
            "Counter 'Items65' does not exist in category 'TestCat'"
        );
        assert_eq!(
            CacheError::UnknownKey { key: 12 }.to_string(),
            "Counter key 12 is not registered"
        );
    }

    #[test]
    fn test_missing_scope_maps_to_category_not_found() {
        assert_eq!(
            CacheError::from(ApiError::category_not_found("dogfood")),
            CacheError::category_not_found("dogfood")
        );
        assert_eq!(
            CacheError::from(ApiError::instance_not_found("Processor", "99")),
            CacheError::category_not_found("Processor(99)")
        );
    }

    #[test]
    fn test_access_denied_maps_to_invalid_operation() {
        let err = CacheError::from(ApiError::access_denied("\\Processor(0)\\% User Time"));
        assert!(matches!(err, CacheError::InvalidOperation { .. }));
    }

    #[test]
    fn test_other_api_errors_are_wrapped() {
        let err = CacheError::from(ApiError::internal("handle closed"));
        assert_eq!(err, CacheError::Api(ApiError::internal("handle closed")));
    }
}
