//! Integer keys for counter paths.
//!
//! A caller registers a `(category, instance, counter)` triple once and
//! then addresses the counter by the returned `i32`, instead of passing
//! three strings on every call.
//!
//! Under the default [`KeyStrategy::Hash`] the key is a deterministic hash
//! of `category:instance:counter`. Hashes can collide; registration
//! detects a collision and refuses it rather than handing out a key that
//! resolves to a different counter. [`KeyStrategy::Sequential`] avoids
//! collisions entirely.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Text used for an absent instance when deriving a hashed key.
pub const NO_INSTANCE_PLACEHOLDER: &str = "";

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// How integer keys are derived for new counter paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Deterministic 32-bit hash of the counter path.
    #[default]
    Hash,
    /// Monotonically increasing codes, strictly injective.
    Sequential,
}

impl KeyStrategy {
    /// Parses a strategy name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Some(Self::Hash),
            "sequential" => Some(Self::Sequential),
            _ => None,
        }
    }

    /// Converts to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Sequential => "sequential",
        }
    }
}

/// Treats an empty instance name the same as no instance.
pub fn normalize_instance(instance: Option<&str>) -> Option<&str> {
    instance.filter(|name| !name.is_empty())
}

/// 32-bit FNV-1a hash of `text`, reinterpreted as a signed key.
pub fn hash_code(text: &str) -> i32 {
    let hash = text.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    });
    i32::from_ne_bytes(hash.to_ne_bytes())
}

/// A registered counter path and its integer key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    category: String,
    instance: Option<String>,
    counter: String,
    code: i32,
}

impl CounterKey {
    /// Creates a key whose code is the hash of the counter path.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if `category` or `counter` is empty.
    pub fn new(category: &str, instance: Option<&str>, counter: &str) -> CacheResult<Self> {
        if category.is_empty() {
            return Err(CacheError::invalid_argument("missing required category name"));
        }
        if counter.is_empty() {
            return Err(CacheError::invalid_argument("missing required counter name"));
        }
        let instance = normalize_instance(instance);
        let code = hash_code(&format!(
            "{}:{}:{}",
            category,
            instance.unwrap_or(NO_INSTANCE_PLACEHOLDER),
            counter
        ));

        Ok(Self {
            category: category.to_string(),
            instance: instance.map(str::to_string),
            counter: counter.to_string(),
            code,
        })
    }

    /// Returns the same path carrying a different code.
    pub(crate) fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Category name.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Instance name, `None` for single-instance categories.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Counter name.
    pub fn counter(&self) -> &str {
        &self.counter
    }

    /// The integer key.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns true if both keys name the same counter, whatever their codes.
    pub fn same_path(&self, other: &CounterKey) -> bool {
        self.category == other.category
            && self.instance == other.instance
            && self.counter == other.counter
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.category,
            self.instance.as_deref().unwrap_or(NO_INSTANCE_PLACEHOLDER),
            self.counter
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_fields() {
        let key = CounterKey::new("a", Some("b"), "c").unwrap();
        assert_eq!(key.category(), "a");
        assert_eq!(key.instance(), Some("b"));
        assert_eq!(key.counter(), "c");
        assert_eq!(key.to_string(), "a:b:c");
    }

    #[test]
    fn test_empty_instance_is_no_instance() {
        let absent = CounterKey::new("foo", None, "bar").unwrap();
        let empty = CounterKey::new("foo", Some(""), "bar").unwrap();
        assert_eq!(absent, empty);
        assert_eq!(empty.instance(), None);
    }

    #[test]
    fn test_code_is_deterministic() {
        let first = CounterKey::new("TestCat", None, "Items64").unwrap();
        let second = CounterKey::new("TestCat", None, "Items64").unwrap();
        assert_eq!(first.code(), second.code());
        assert_eq!(first.code(), hash_code("TestCat::Items64"));
    }

    #[test]
    fn test_code_differs_per_field() {
        let foo_bar = CounterKey::new("foo", None, "bar").unwrap().code();
        let foo_bat = CounterKey::new("foo", None, "bat").unwrap().code();
        let bat_bar = CounterKey::new("bat", None, "bar").unwrap().code();
        let foo_x_bar = CounterKey::new("foo", Some("x"), "bar").unwrap().code();
        assert_ne!(foo_bar, foo_bat);
        assert_ne!(foo_bar, bat_bar);
        assert_ne!(foo_bat, bat_bar);
        assert_ne!(foo_bar, foo_x_bar);
    }

    #[test]
    fn test_missing_names_rejected() {
        assert!(matches!(
            CounterKey::new("", None, "bar"),
            Err(CacheError::InvalidArgument { .. })
        ));
        assert!(matches!(
            CounterKey::new("foo", Some("x"), ""),
            Err(CacheError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_fnv_reference_values() {
        assert_eq!(hash_code(""), 0x811c_9dc5_u32 as i32);
        assert_eq!(hash_code("a"), 0xe40c_292c_u32 as i32);
    }

    #[test]
    fn test_same_path_ignores_code() {
        let key = CounterKey::new("a", None, "c").unwrap();
        let renumbered = key.clone().with_code(7);
        assert!(key.same_path(&renumbered));
        assert_ne!(key, renumbered);
    }

    #[test]
    fn test_key_strategy_parse() {
        assert_eq!(KeyStrategy::parse("Sequential"), Some(KeyStrategy::Sequential));
        assert_eq!(KeyStrategy::parse("hash"), Some(KeyStrategy::Hash));
        assert_eq!(KeyStrategy::parse("random"), None);
        assert_eq!(KeyStrategy::default().as_str(), "hash");
    }
}
