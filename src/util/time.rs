use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// Error type for time parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error(
        "unrecognized time '{0}' (expected epoch ms, RFC 3339, YYYY-MM-DD HH:MM, YYYY-MM-DD, or +15m/+2h/+1d)"
    )]
    Unrecognized(String),
    #[error("'{0}' does not exist in the local time zone")]
    Nonexistent(String),
    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// Parse a point in time relative to the local time zone.
pub fn parse_when(input: &str, now_ms: i64) -> Result<i64, TimeParseError> {
    parse_when_in(input, now_ms, &Local)
}

/// Parse a point in time in `tz`. Accepted forms:
///
/// - epoch milliseconds: `1700000000000`
/// - RFC 3339: `2026-03-01T09:30:00Z`
/// - local date and time: `2026-03-01 09:30`
/// - local date (start of day): `2026-03-01`
/// - relative to now: `+15m`, `+2h`, `+1d`
pub fn parse_when_in<Tz: TimeZone>(input: &str, now_ms: i64, tz: &Tz) -> Result<i64, TimeParseError> {
    let s = input.trim();
    let unrecognized = || TimeParseError::Unrecognized(s.to_string());

    if let Some(rel) = s.strip_prefix('+') {
        return parse_relative(rel, now_ms).ok_or_else(unrecognized);
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .map_err(|_| TimeParseError::OutOfRange(s.to_string()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return local_ms(naive, s, tz);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(unrecognized)?;
        return local_ms(naive, s, tz);
    }
    Err(unrecognized())
}

fn parse_relative(rel: &str, now_ms: i64) -> Option<i64> {
    let unit_at = rel.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = rel.split_at(unit_at);
    let amount: i64 = amount.parse().ok()?;
    let unit_ms: i64 = match unit {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        _ => return None,
    };
    now_ms.checked_add(amount.checked_mul(unit_ms)?)
}

fn local_ms<Tz: TimeZone>(naive: NaiveDateTime, input: &str, tz: &Tz) -> Result<i64, TimeParseError> {
    // a DST overlap resolves to the earlier instant
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| TimeParseError::Nonexistent(input.to_string()))
}

/// `YYYY-MM-DD HH:MM` in local time
pub fn format_ms(ms: i64) -> String {
    format_ms_in(ms, &Local)
}

pub fn format_ms_in<Tz: TimeZone>(ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => ms.to_string(),
    }
}
