//! Time utilities: due-date and effort parsing.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

/// Parse a due date like "2026-02-20 23:59" in an IANA tz like "Asia/Tokyo",
/// returning UTC.
pub fn parse_local_due_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;

    let ndt = parse_naive(local)?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Parse a due date from user or file input.
///
/// RFC3339 keeps its own offset. Naive forms are read in `tz`
/// (UTC when `None`):
/// - "YYYY-MM-DD HH:MM"
/// - "YYYY-MM-DDTHH:MM:SS"
/// - "YYYY-MM-DD" (end of that day, 23:59)
pub fn parse_due(input: &str, tz: Option<&str>) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    match tz {
        Some(tz) => parse_local_due_to_utc(s, tz),
        None => Ok(Utc.from_utc_datetime(&parse_naive(s)?)),
    }
}

fn parse_naive(s: &str) -> Result<NaiveDateTime> {
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default();
        return Ok(d.and_time(end_of_day));
    }
    bail!("invalid due date '{s}' (expected RFC3339, 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD')")
}

fn effort_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+)\s*h)?\s*(?:(\d+)\s*m(?:in)?)?$").expect("effort regex is valid")
    })
}

/// Parse an effort estimate in minutes: "45", "45m", "2h", "1h30m".
pub fn parse_minutes(input: &str) -> Result<u32> {
    let s = input.trim().to_lowercase();
    if let Ok(m) = s.parse::<u32>() {
        return Ok(m);
    }

    let caps = effort_re()
        .captures(&s)
        .filter(|c| c.get(1).is_some() || c.get(2).is_some())
        .ok_or_else(|| anyhow::anyhow!("invalid estimate '{input}' (try 45, 45m, 2h, 1h30m)"))?;

    let hours: u32 = caps.get(1).map_or(Ok(0), |m| m.as_str().parse())?;
    let minutes: u32 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse())?;
    hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .ok_or_else(|| anyhow::anyhow!("estimate '{input}' is too large"))
}

/// Format a UTC instant as RFC3339, e.g. `2026-02-20T23:59:00+00:00`.
pub fn to_rfc3339_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
