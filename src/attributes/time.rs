//! Conversions between directory timestamp encodings and UTC datetimes.
//!
//! Active Directory stores two kinds of timestamps:
//!
//! * **FILETIME** integers (`pwdLastSet`, `lastLogon`, `accountExpires`, ...):
//!   100-nanosecond intervals since 1601-01-01 UTC. `0` means "never set" and
//!   `i64::MAX` means "never expires".
//! * **Generalized time** strings (`whenCreated`, `whenChanged`):
//!   `YYYYMMDDHHMMSS.0Z`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

const FILETIME_TICKS_PER_SEC: i64 = 10_000_000;

/// FILETIME value the directory uses for "never".
pub const FILETIME_NEVER: i64 = i64::MAX;

/// The FILETIME epoch, which is what a zero FILETIME decodes to.
pub fn filetime_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Decode a FILETIME. Negative values and [`FILETIME_NEVER`] decode to `None`.
pub fn filetime_to_datetime(filetime: i64) -> Option<DateTime<Utc>> {
    if filetime < 0 || filetime == FILETIME_NEVER {
        return None;
    }
    let secs = filetime / FILETIME_TICKS_PER_SEC - FILETIME_UNIX_OFFSET_SECS;
    let nanos = (filetime % FILETIME_TICKS_PER_SEC) * 100;
    DateTime::from_timestamp(secs, nanos as u32)
}

/// Encode a datetime as a FILETIME.
pub fn datetime_to_filetime(value: DateTime<Utc>) -> i64 {
    let secs = value.timestamp() + FILETIME_UNIX_OFFSET_SECS;
    secs * FILETIME_TICKS_PER_SEC + i64::from(value.timestamp_subsec_nanos() / 100)
}

/// Format a datetime as LDAP generalized time (`YYYYMMDDHHMMSS.0Z`).
pub fn to_generalized_time(value: DateTime<Utc>) -> String {
    value.format("%Y%m%d%H%M%S.0Z").to_string()
}

/// Parse LDAP generalized time. Fractions are accepted and dropped.
pub fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim().trim_end_matches('Z');
    let whole = trimmed.split(['.', ',']).next()?;
    let naive = NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Parse a timestamp attribute that arrived as text.
///
/// Text with a `Z` suffix or a fraction is generalized time; anything else is
/// read as a FILETIME integer.
pub fn parse_timestamp_text(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.ends_with('Z') || value.contains('.') {
        return parse_generalized_time(value);
    }
    value.parse::<i64>().ok().and_then(filetime_to_datetime)
}
