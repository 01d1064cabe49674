//! LDAP search filters: builders, value escaping, and an evaluator.
//!
//! The builders produce the filter strings the session sends for its named
//! queries. [`Filter::parse`] and [`Filter::matches`] implement the subset of
//! RFC 4515 those filters use (and, or, not, equality with `*` wildcards,
//! presence, `>=`, `<=`) so a directory can be evaluated in memory.

use crate::attributes::time::{datetime_to_filetime, to_generalized_time};
use crate::attributes::{AttributeCollection, AttributeValue};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use uuid::Uuid;

/// Every user account.
pub const USERS: &str = "(&(objectCategory=person)(objectClass=user))";

/// Users that never logged on (no replicated last-logon timestamp).
pub const USERS_WITHOUT_LAST_LOGON_TIMESTAMP: &str =
    "(&(objectCategory=person)(objectClass=user)(!lastLogonTimestamp=*))";

/// Every computer account.
pub const COMPUTERS: &str = "(&(objectCategory=computer)(objectClass=computer))";

/// Every group.
pub const GROUPS: &str = "(objectClass=group)";

/// Groups without members.
pub const GROUPS_EMPTY: &str = "(&(objectClass=group)(!member=*))";

/// Escape a value for use inside a filter (RFC 4515 section 3).
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Encode a GUID as a filter value: every byte `\xx`, in the directory's
/// little-endian layout.
pub fn guid_value(guid: Uuid) -> String {
    let mut out = String::with_capacity(48);
    for byte in guid.to_bytes_le() {
        let _ = write!(out, "\\{byte:02x}");
    }
    out
}

/// `(attribute=value)` with the value escaped.
pub fn equals(attribute: &str, value: &str) -> String {
    format!("({}={})", attribute, escape_value(value))
}

/// `(objectGUID=\xx...)`.
pub fn object_guid_equals(guid: Uuid) -> String {
    format!("(objectGUID={})", guid_value(guid))
}

/// Users whose `whenChanged` lies within `[start, end]`.
pub fn users_modified_between(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "(&(objectCategory=person)(objectClass=user)(whenChanged>={})(whenChanged<={}))",
        to_generalized_time(start),
        to_generalized_time(end)
    )
}

/// Users whose `lastLogonTimestamp` lies within `[start, end]`.
pub fn users_last_logon_between(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "(&(objectCategory=person)(objectClass=user)(lastLogonTimestamp>={})(lastLogonTimestamp<={}))",
        datetime_to_filetime(start),
        datetime_to_filetime(end)
    )
}

/// A filter that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid filter at position {position}: {message}")]
pub struct FilterError {
    pub position: usize,
    pub message: String,
}

/// Parsed search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal(String, Vec<u8>),
    /// Wildcard match; an empty first/last part means unanchored.
    Substring(String, Vec<Vec<u8>>),
    GreaterOrEqual(String, Vec<u8>),
    LessOrEqual(String, Vec<u8>),
}

impl Filter {
    /// Parse a filter string.
    pub fn parse(input: &str) -> Result<Filter, FilterError> {
        let mut parser = Parser {
            input: input.trim().as_bytes(),
            pos: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.input.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    /// Evaluate against one entry.
    pub fn matches(&self, entry: &AttributeCollection) -> bool {
        match self {
            Filter::And(items) => items.iter().all(|f| f.matches(entry)),
            Filter::Or(items) => items.iter().any(|f| f.matches(entry)),
            Filter::Not(inner) => !inner.matches(entry),
            Filter::Present(attribute) => entry.contains(attribute),
            Filter::Equal(attribute, expected) => {
                values_of(entry, attribute).any(|v| value_equals(attribute, &v, expected))
            }
            Filter::Substring(attribute, parts) => {
                values_of(entry, attribute).any(|v| wildcard_matches(&v, parts))
            }
            Filter::GreaterOrEqual(attribute, bound) => values_of(entry, attribute)
                .any(|v| compare_ordered(&v, bound) != std::cmp::Ordering::Less),
            Filter::LessOrEqual(attribute, bound) => values_of(entry, attribute)
                .any(|v| compare_ordered(&v, bound) != std::cmp::Ordering::Greater),
        }
    }
}

fn values_of<'a>(
    entry: &'a AttributeCollection,
    attribute: &str,
) -> impl Iterator<Item = Vec<u8>> + 'a {
    entry
        .get(attribute)
        .map(AttributeValue::values)
        .unwrap_or_default()
        .iter()
        .filter_map(|value| match value {
            AttributeValue::Binary(bytes) => Some(bytes.clone()),
            other => other.to_text().map(String::into_bytes),
        })
}

fn value_equals(attribute: &str, actual: &[u8], expected: &[u8]) -> bool {
    if actual.eq_ignore_ascii_case(expected) {
        return true;
    }
    // objectCategory holds a DN; `objectCategory=person` matches on its first RDN value
    if attribute.eq_ignore_ascii_case("objectCategory") && !expected.contains(&b'=') {
        let text = String::from_utf8_lossy(actual);
        let first_rdn = text.split(',').next().unwrap_or_default();
        if let Some((_, rdn_value)) = first_rdn.split_once('=') {
            return rdn_value.as_bytes().eq_ignore_ascii_case(expected);
        }
    }
    false
}

fn wildcard_matches(actual: &[u8], parts: &[Vec<u8>]) -> bool {
    let haystack = actual.to_ascii_lowercase();
    let mut offset = 0usize;
    let last = parts.len().saturating_sub(1);
    for (index, part) in parts.iter().enumerate() {
        let needle = part.to_ascii_lowercase();
        if needle.is_empty() {
            continue;
        }
        if index == 0 {
            if !haystack.starts_with(&needle) {
                return false;
            }
            offset = needle.len();
        } else if index == last {
            return haystack.len() >= offset + needle.len() && haystack.ends_with(&needle);
        } else {
            match find(&haystack[offset..], &needle) {
                Some(found) => offset += found + needle.len(),
                None => return false,
            }
        }
    }
    true
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn compare_ordered(actual: &[u8], bound: &[u8]) -> std::cmp::Ordering {
    let parse = |bytes: &[u8]| std::str::from_utf8(bytes).ok()?.trim().parse::<i64>().ok();
    match (parse(actual), parse(bound)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => actual.to_ascii_lowercase().cmp(&bound.to_ascii_lowercase()),
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> FilterError {
        FilterError {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), FilterError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterError> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.not_operand()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut items = Vec::new();
        while self.peek() == Some(b'(') {
            items.push(self.filter()?);
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    // Accepts both `(!(a=b))` and the common shorthand `(!a=b)`.
    fn not_operand(&mut self) -> Result<Filter, FilterError> {
        if self.peek() == Some(b'(') {
            self.filter()
        } else {
            self.item()
        }
    }

    fn item(&mut self) -> Result<Filter, FilterError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'=' | b'>' | b'<' | b'~' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let attribute = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("attribute name is not UTF-8"))?
            .trim()
            .to_string();
        if attribute.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let operator = match self.peek() {
            Some(b'=') => {
                self.pos += 1;
                b'='
            }
            Some(op @ (b'>' | b'<' | b'~')) => {
                self.pos += 1;
                self.expect(b'=')?;
                op
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let value_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b')' || b == b'(' {
                break;
            }
            self.pos += 1;
        }
        let raw = &self.input[value_start..self.pos];

        match operator {
            b'>' => Ok(Filter::GreaterOrEqual(attribute, self.unescape(raw)?)),
            b'<' => Ok(Filter::LessOrEqual(attribute, self.unescape(raw)?)),
            // approximate match is evaluated as equality
            b'~' => Ok(Filter::Equal(attribute, self.unescape(raw)?)),
            _ if raw == b"*" => Ok(Filter::Present(attribute)),
            _ if raw.contains(&b'*') => {
                let parts = raw
                    .split(|b| *b == b'*')
                    .map(|part| self.unescape(part))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Filter::Substring(attribute, parts))
            }
            _ => Ok(Filter::Equal(attribute, self.unescape(raw)?)),
        }
    }

    fn unescape(&self, raw: &[u8]) -> Result<Vec<u8>, FilterError> {
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'\\' {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| self.error("invalid escape sequence"))?;
                out.push(hex);
                i += 3;
            } else {
                out.push(raw[i]);
                i += 1;
            }
        }
        Ok(out)
    }
}
