//! Timestamp helpers for the oneM2M absolute/relative timestamp formats used
//! throughout §3 (`ct`, `lt`, `et`, `rqet`, `oet`, `rset`, ...).

use chrono::{DateTime, Duration, Utc};

/// oneM2M basic-format absolute timestamp: `YYYYMMDDTHHMMSS,ffffff`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6f";

/// Current UTC time. Centralized so tests can substitute a fixed clock via
/// `cse-test`'s time-control helpers rather than every caller reaching for
/// `Utc::now()` directly.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp in oneM2M basic format.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string().replace('.', ",")
}

/// Parse a oneM2M basic-format timestamp.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    let normalized = s.replace(',', ".");
    DateTime::parse_from_str(&normalized, "%Y%m%dT%H%M%S%.f")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(&normalized, "%Y%m%dT%H%M%S%.f")
                .ok()
                .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        })
}

/// Parse an ISO-8601 duration (`PT1H`, `PT500S`, ...) into a `chrono::Duration`.
/// Supports the subset actually used by the spec: `P[n]D`, `T[n]H[n]M[n]S`.
pub fn parse_iso8601_duration(s: &str) -> Option<Duration> {
    let s = s.strip_prefix('P')?;
    let (date_part, time_part) = match s.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };

    let mut total = Duration::zero();

    if !date_part.is_empty() {
        total = total + parse_date_component(date_part)?;
    }
    if let Some(t) = time_part {
        total = total + parse_time_component(t)?;
    }
    Some(total)
}

fn parse_date_component(s: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut num = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            num.push(c);
        } else {
            let n: i64 = num.parse().ok()?;
            num.clear();
            total = total
                + match c {
                    'Y' => Duration::days(n * 365),
                    'M' => Duration::days(n * 30),
                    'W' => Duration::days(n * 7),
                    'D' => Duration::days(n),
                    _ => return None,
                };
        }
    }
    Some(total)
}

fn parse_time_component(s: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut num = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() || c == '.' {
            num.push(c);
        } else {
            let n: f64 = num.parse().ok()?;
            num.clear();
            total = total
                + match c {
                    'H' => Duration::milliseconds((n * 3_600_000.0) as i64),
                    'M' => Duration::milliseconds((n * 60_000.0) as i64),
                    'S' => Duration::milliseconds((n * 1000.0) as i64),
                    _ => return None,
                };
        }
    }
    Some(total)
}
