//! Value type definitions shared by options, validators and renderers.
//!
//! Option values travel as [`serde_json::Value`] so that converters,
//! validators and renderers agree on one representation, and an unset option
//! is simply an absent value rather than a sentinel.

use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// Declared type of a command option.
///
/// Drives the default conversion applied by an option's write accessor and
/// the placeholder shown in help output.
///
/// # Examples
///
/// ```
/// use cmdkit_core::ValueType;
///
/// assert_eq!(ValueType::default(), ValueType::Any);
/// assert!(!ValueType::Flag.takes_value());
/// assert!(ValueType::Number.takes_value());
///
/// let format = ValueType::Choice(vec!["json".into(), "yaml".into()]);
/// assert_eq!(format.placeholder(), "ENUM");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ValueType {
    /// Switch without a value; present means `true`.
    Flag,
    /// Free-form string.
    String,
    /// Integer or floating point number.
    Number,
    /// Explicit boolean value (`true`/`false`, `yes`/`no`, `1`/`0`).
    Boolean,
    /// Comma-separated list of strings.
    List,
    /// File path.
    File,
    /// One of a fixed set of values.
    Choice(Vec<String>),
    /// Unknown/any type (the default); passed through untouched.
    #[default]
    Any,
}

impl ValueType {
    /// Returns `true` unless this is a [`Flag`](ValueType::Flag).
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::Flag)
    }

    /// Value placeholder for help output.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Flag => "",
            Self::String | Self::Any => "VALUE",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::List => "LIST",
            Self::File => "FILE",
            Self::Choice(_) => "ENUM",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_takes_no_value() {
        assert!(!ValueType::Flag.takes_value());
        assert_eq!(ValueType::Flag.placeholder(), "");
    }

    #[test]
    fn test_value_types_round_trip_through_yaml() {
        let types = vec![
            ValueType::Number,
            ValueType::Choice(vec!["json".into(), "csv".into()]),
        ];
        let yaml = serde_yaml::to_string(&types).unwrap();
        let back: Vec<ValueType> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, types);
    }
}
