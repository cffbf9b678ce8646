use anyhow::{Result, bail};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

// reddit reports created_utc as fractional epoch seconds
pub fn from_epoch_secs(secs: f64) -> DateTime<Utc> {
    let whole = secs.trunc() as i64;
    let nanos = ((secs.fract().abs()) * 1e9) as u32;
    Utc.timestamp_opt(whole, nanos).single().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

// Parse a window string like "2d", "12h", "YYYY-MM-DD", or RFC3339 into a UTC timestamp.
// Returns Some(ts) on success; None if unparseable.
pub fn parse_window_str(s: &str) -> Option<DateTime<Utc>> {
    // "2d" -> now - 2 days
    if let Some(stripped) = s.strip_suffix('d') {
        if let Ok(days) = stripped.parse::<i64>() {
            if days > 0 {
                return Duration::try_days(days).and_then(|d| Utc::now().checked_sub_signed(d));
            }
        }
    }
    if let Some(stripped) = s.strip_suffix('h') {
        if let Ok(hours) = stripped.parse::<i64>() {
            if hours > 0 {
                return Duration::try_hours(hours).and_then(|d| Utc::now().checked_sub_signed(d));
            }
        }
    }
    // "today" -> midnight UTC
    if s == "today" {
        let midnight = Utc::now().date_naive().and_hms_opt(0, 0, 0)?;
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc));
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = nd.and_hms_opt(0, 0, 0) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

// Helper for Option<String> inputs used by CLI flags like --since
pub fn parse_since_opt(since: &Option<String>) -> Result<Option<DateTime<Utc>>> {
    let Some(s) = since.as_ref() else { return Ok(None) };
    match parse_window_str(s) {
        Some(ts) => Ok(Some(ts)),
        None => bail!("unrecognized --since value {s:?} (try 1d, 12h, today, YYYY-MM-DD)"),
    }
}
