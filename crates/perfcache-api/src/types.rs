//! Counter algorithm kinds and descriptors.
//!
//! A counter's algorithm kind decides how the subsystem turns its raw
//! value into a sampled value, and whether it needs a companion base
//! counter to supply a denominator.

use std::fmt;

macro_rules! define_counter_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Algorithm kind of a counter.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum CounterType {
            $(
                #[doc = $name]
                $variant,
            )+
        }

        impl CounterType {
            /// Every algorithm kind the subsystem knows about.
            pub const ALL: &'static [CounterType] = &[$(CounterType::$variant),+];

            /// Returns the subsystem name of this kind.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(CounterType::$variant => $name,)+
                }
            }
        }
    };
}

define_counter_types! {
    NumberOfItemsHex32 => "NumberOfItemsHEX32",
    NumberOfItemsHex64 => "NumberOfItemsHEX64",
    NumberOfItems32 => "NumberOfItems32",
    NumberOfItems64 => "NumberOfItems64",
    CounterDelta32 => "CounterDelta32",
    CounterDelta64 => "CounterDelta64",
    SampleCounter => "SampleCounter",
    CountPerTimeInterval32 => "CountPerTimeInterval32",
    CountPerTimeInterval64 => "CountPerTimeInterval64",
    RateOfCountsPerSecond32 => "RateOfCountsPerSecond32",
    RateOfCountsPerSecond64 => "RateOfCountsPerSecond64",
    RawFraction => "RawFraction",
    CounterTimer => "CounterTimer",
    Timer100Ns => "Timer100Ns",
    SampleFraction => "SampleFraction",
    CounterTimerInverse => "CounterTimerInverse",
    Timer100NsInverse => "Timer100NsInverse",
    CounterMultiTimer => "CounterMultiTimer",
    CounterMultiTimer100Ns => "CounterMultiTimer100Ns",
    CounterMultiTimerInverse => "CounterMultiTimerInverse",
    CounterMultiTimer100NsInverse => "CounterMultiTimer100NsInverse",
    AverageTimer32 => "AverageTimer32",
    ElapsedTime => "ElapsedTime",
    AverageCount64 => "AverageCount64",
    SampleBase => "SampleBase",
    AverageBase => "AverageBase",
    RawBase => "RawBase",
    CounterMultiBase => "CounterMultiBase",
}

impl CounterType {
    /// Parses an algorithm kind from its subsystem name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        CounterType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }

    /// Returns true if this kind only exists to be the denominator of another counter.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            CounterType::SampleBase
                | CounterType::AverageBase
                | CounterType::RawBase
                | CounterType::CounterMultiBase
        )
    }

    /// Returns true if the raw value of this kind is measured in timestamp ticks.
    pub fn is_timer(&self) -> bool {
        matches!(
            self,
            CounterType::AverageTimer32
                | CounterType::CounterTimer
                | CounterType::CounterTimerInverse
                | CounterType::Timer100Ns
                | CounterType::Timer100NsInverse
                | CounterType::CounterMultiTimer
                | CounterType::CounterMultiTimer100Ns
                | CounterType::CounterMultiTimerInverse
                | CounterType::CounterMultiTimer100NsInverse
                | CounterType::ElapsedTime
        )
    }

    /// Returns true if the sampled value of this kind is a percentage.
    pub fn is_fraction(&self) -> bool {
        matches!(self, CounterType::RawFraction | CounterType::SampleFraction)
    }

    /// Returns the base kind a counter of this kind needs as its denominator.
    pub fn required_base(&self) -> Option<CounterType> {
        match self {
            CounterType::AverageCount64 | CounterType::AverageTimer32 => {
                Some(CounterType::AverageBase)
            }
            CounterType::CounterMultiTimer
            | CounterType::CounterMultiTimer100Ns
            | CounterType::CounterMultiTimer100NsInverse
            | CounterType::CounterMultiTimerInverse => Some(CounterType::CounterMultiBase),
            CounterType::RawFraction => Some(CounterType::RawBase),
            CounterType::SampleFraction => Some(CounterType::SampleBase),
            _ => None,
        }
    }
}

impl fmt::Display for CounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a counter handle is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// Sampling only; writes are refused.
    #[default]
    ReadOnly,
    /// Sampling and raw value updates.
    Writable,
}

impl AccessMode {
    /// Returns true for [`AccessMode::Writable`].
    pub fn is_writable(&self) -> bool {
        *self == AccessMode::Writable
    }
}

/// One counter as reported by category enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterDescriptor {
    /// Category the counter belongs to.
    pub category: String,
    /// Instance within a multi-instance category.
    pub instance: Option<String>,
    /// Counter name, unique within its category.
    pub counter: String,
    /// Algorithm kind.
    pub counter_type: CounterType,
}

impl CounterDescriptor {
    /// Creates a new descriptor.
    pub fn new(
        category: impl Into<String>,
        instance: Option<&str>,
        counter: impl Into<String>,
        counter_type: CounterType,
    ) -> Self {
        Self {
            category: category.into(),
            instance: instance.map(str::to_string),
            counter: counter.into(),
            counter_type,
        }
    }
}

impl fmt::Display for CounterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "\\{}({})\\{}", self.category, instance, self.counter),
            None => write!(f, "\\{}\\{}", self.category, self.counter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_counter_type() {
        assert_eq!(CounterType::parse("averagetimer32"), Some(CounterType::AverageTimer32));
        assert_eq!(CounterType::parse(" NumberOfItemsHEX64 "), Some(CounterType::NumberOfItemsHex64));
        assert_eq!(CounterType::parse("NotAKind"), None);
    }

    #[test]
    fn test_every_name_parses_back() {
        for kind in CounterType::ALL {
            assert_eq!(CounterType::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(CounterType::ALL.len(), 28);
    }

    #[test]
    fn test_base_kinds() {
        let bases: Vec<_> = CounterType::ALL.iter().filter(|k| k.is_base()).collect();
        assert_eq!(bases.len(), 4);
        assert!(CounterType::AverageBase.is_base());
        assert!(!CounterType::AverageCount64.is_base());
    }

    #[test]
    fn test_required_base() {
        assert_eq!(CounterType::AverageTimer32.required_base(), Some(CounterType::AverageBase));
        assert_eq!(
            CounterType::CounterMultiTimerInverse.required_base(),
            Some(CounterType::CounterMultiBase)
        );
        assert_eq!(CounterType::NumberOfItems64.required_base(), None);
        for kind in CounterType::ALL {
            if let Some(base) = kind.required_base() {
                assert!(base.is_base());
            }
        }
    }

    #[test]
    fn test_descriptor_display() {
        let plain = CounterDescriptor::new("Cache", None, "Dirty Pages", CounterType::NumberOfItems64);
        assert_eq!(plain.to_string(), "\\Cache\\Dirty Pages");

        let scoped = CounterDescriptor::new("Processor", Some("0"), "% User Time", CounterType::Timer100Ns);
        assert_eq!(scoped.to_string(), "\\Processor(0)\\% User Time");
    }

    #[test]
    fn test_access_mode() {
        assert!(AccessMode::Writable.is_writable());
        assert!(!AccessMode::default().is_writable());
    }
}
