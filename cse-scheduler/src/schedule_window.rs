//! `<schedule>` (`se`) active-window evaluation (§4.6), grounded on the
//! reference CSE's 7-field scheduling syntax (`sec min hour dom month dow
//! year`) used to gate node/AE reachability and periodic `<ACTR>`
//! evaluation. Unlike `job::ScheduleConfig::Cron` (which asks "when does
//! this next fire"), a `<schedule>` entry answers "is this instant
//! within an active window" — so fields are matched directly against
//! `now` rather than iterated with the `cron` crate's schedule cursor.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Whether `now` falls within any of the given schedule entries. An
/// empty entry list means "always active" (reference: no `<schedule>`
/// child implies unrestricted reachability).
pub fn is_active(entries: &[String], now: DateTime<Utc>) -> bool {
    if entries.is_empty() {
        return true;
    }
    entries.iter().any(|entry| matches_entry(entry, now))
}

fn matches_entry(entry: &str, now: DateTime<Utc>) -> bool {
    let fields: Vec<&str> = entry.split_whitespace().collect();
    if fields.len() != 6 && fields.len() != 7 {
        return false;
    }
    let values = [
        now.second() as i64,
        now.minute() as i64,
        now.hour() as i64,
        now.day() as i64,
        now.month() as i64,
        now.weekday().num_days_from_sunday() as i64,
    ];
    for (field, value) in fields.iter().take(6).zip(values) {
        if !matches_field(field, value) {
            return false;
        }
    }
    if fields.len() == 7 {
        if !matches_field(fields[6], now.year() as i64) {
            return false;
        }
    }
    true
}

fn matches_field(field: &str, value: i64) -> bool {
    if field == "*" || field == "?" {
        return true;
    }
    field.split(',').any(|part| matches_part(part, value))
}

fn matches_part(part: &str, value: i64) -> bool {
    if let Some((range, step)) = part.split_once('/') {
        let Ok(step) = step.parse::<i64>() else {
            return false;
        };
        if step <= 0 {
            return false;
        }
        let (lo, hi) = match range {
            "*" => (0, i64::MAX),
            r => match parse_range(r) {
                Some(bounds) => bounds,
                None => return false,
            },
        };
        return value >= lo && value <= hi && (value - lo) % step == 0;
    }
    if let Some((lo, hi)) = parse_range(part) {
        return value >= lo && value <= hi;
    }
    part.parse::<i64>().is_ok_and(|n| n == value)
}

fn parse_range(part: &str) -> Option<(i64, i64)> {
    match part.split_once('-') {
        Some((lo, hi)) => Some((lo.parse().ok()?, hi.parse().ok()?)),
        None => {
            let n = part.parse().ok()?;
            Some((n, n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_entries_means_always_active() {
        assert!(is_active(&[], Utc::now()));
    }

    #[test]
    fn wildcard_entry_always_matches() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
        assert!(is_active(&["* * * * * *".to_string()], now));
    }

    #[test]
    fn hour_range_restricts_to_business_hours() {
        let entries = vec!["* * 9-17 * * *".to_string()];
        let during = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 7, 28, 20, 0, 0).unwrap();
        assert!(is_active(&entries, during));
        assert!(!is_active(&entries, after));
    }

    #[test]
    fn step_values_match_every_n() {
        let entries = vec!["*/15 * * * * *".to_string()];
        let on_step = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 30).unwrap();
        let off_step = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 7).unwrap();
        assert!(is_active(&entries, on_step));
        assert!(!is_active(&entries, off_step));
    }

    #[test]
    fn malformed_entry_never_matches() {
        assert!(!is_active(&["garbage".to_string()], Utc::now()));
    }
}
