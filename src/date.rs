use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Prefix used for scheduler-derived run identifiers (`reddit_20250314`).
pub const RUN_ID_PREFIX: &str = "reddit";

/// Epoch seconds (UTC) to an RFC3339 string, e.g. `2024-03-09T16:00:00Z`.
/// Fractional seconds are truncated; out-of-range values yield `None`.
pub fn epoch_to_rfc3339(secs: f64) -> Option<String> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.trunc();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let dt = OffsetDateTime::from_unix_timestamp(whole as i64).ok()?;
    dt.format(&Rfc3339).ok()
}

/// Re-format an RFC3339 string in UTC. `None` when `s` is not a timestamp.
pub fn normalize_rfc3339(s: &str) -> Option<String> {
    let dt = OffsetDateTime::parse(s.trim(), &Rfc3339).ok()?;
    dt.to_offset(time::UtcOffset::UTC).format(&Rfc3339).ok()
}

/// Run identifier for a scheduled date: `reddit_YYYYMMDD`.
pub fn run_id_for_date(date: Date) -> String {
    let fmt = format_description!("[year][month][day]");
    // Formatting a calendar date with a fixed numeric description cannot fail.
    let stamp = date.format(&fmt).unwrap_or_else(|_| date.to_string());
    format!("{}_{}", RUN_ID_PREFIX, stamp)
}

/// Run identifier for today's UTC date.
pub fn run_id_today() -> String {
    run_id_for_date(OffsetDateTime::now_utc().date())
}
