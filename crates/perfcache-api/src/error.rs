//! Counter subsystem error types.
//!
//! Every failure the OS counter subsystem can report is mapped into
//! [`ApiError`], so callers never deal with raw status codes.

use thiserror::Error;

/// Error type for counter subsystem operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The category is not registered with the counter subsystem.
    #[error("Category '{category}' does not exist")]
    CategoryNotFound { category: String },

    /// The category exists but has no such instance.
    #[error("Instance '{instance}' does not exist in category '{category}'")]
    InstanceNotFound { category: String, instance: String },

    /// A multi-instance category was queried without an instance name.
    #[error("Category '{category}' is multi-instance and requires an instance name")]
    InstanceRequired { category: String },

    /// The category has no counter by that name.
    #[error("Counter '{counter}' does not exist in category '{category}'")]
    CounterNotFound { category: String, counter: String },

    /// A writable open or a write was refused for this counter.
    #[error("Access denied to counter '{counter}'")]
    AccessDenied { counter: String },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Creates a category not found error.
    pub fn category_not_found(category: impl Into<String>) -> Self {
        ApiError::CategoryNotFound {
            category: category.into(),
        }
    }

    /// Creates an instance not found error.
    pub fn instance_not_found(category: impl Into<String>, instance: impl Into<String>) -> Self {
        ApiError::InstanceNotFound {
            category: category.into(),
            instance: instance.into(),
        }
    }

    /// Creates a counter not found error.
    pub fn counter_not_found(category: impl Into<String>, counter: impl Into<String>) -> Self {
        ApiError::CounterNotFound {
            category: category.into(),
            counter: counter.into(),
        }
    }

    /// Creates an access denied error.
    pub fn access_denied(counter: impl Into<String>) -> Self {
        ApiError::AccessDenied {
            counter: counter.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error is an access refusal.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ApiError::AccessDenied { .. })
    }
}

/// Result type for counter subsystem operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::instance_not_found("Processor", "7");
        assert_eq!(
            err.to_string(),
            "Instance '7' does not exist in category 'Processor'"
        );
    }

    #[test]
    fn test_access_denied() {
        assert!(ApiError::access_denied("% User Time").is_access_denied());
        assert!(!ApiError::internal("boom").is_access_denied());
    }
}
