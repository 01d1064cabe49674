//! Local validation of names and identifiers.
//!
//! Everything here runs before a request is sent, so a failure is always a
//! [`ValidationError`] and never a remote error.

use crate::error::{ValidationError, ValidationResult};
use std::fmt;

/// Maximum number of characters in a group name.
pub const GROUP_NAME_MAX_CHARS: usize = 63;

/// Whether `name` is acceptable as a group name.
///
/// Rules:
/// - not empty and at most [`GROUP_NAME_MAX_CHARS`] characters
/// - does not start with a space or a period
/// - contains at least one letter, so it cannot consist solely of digits,
///   periods or spaces
pub fn is_group_name_valid(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    if name.chars().count() > GROUP_NAME_MAX_CHARS {
        return false;
    }
    if first == ' ' || first == '.' {
        return false;
    }
    name.chars().any(char::is_alphabetic)
}

/// Trim `value` and reject it when nothing is left.
pub fn require_non_empty<'a>(parameter: &str, value: &'a str) -> ValidationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyValue {
            parameter: parameter.to_string(),
        });
    }
    Ok(trimmed)
}

/// Trim `value`, mapping an empty result to `None`.
pub fn trim_or_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A validated group name.
///
/// ```rust
/// use ad_directory::validation::GroupName;
///
/// assert!(GroupName::new("Finance Team").is_ok());
/// assert!(GroupName::new("2024").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(value: impl Into<String>) -> ValidationResult<Self> {
        let value = value.into();
        if !is_group_name_valid(&value) {
            return Err(ValidationError::InvalidGroupName { name: value });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for GroupName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
