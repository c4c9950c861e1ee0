//! `<crs>` cross-resource subscription windowing (reference:
//! `examples/original_source/tests/testCRS.py`, which exercises `twt`,
//! `tws`, `rrat`, `encs`, and `eem` against the reference CSE). A CRS
//! aggregates notification-worthy events from several regarded resources
//! (`rrat`) and only forwards an aggregated notification once every
//! regarded resource has fired within the configured time window.
//!
//! The dispatcher is responsible for creating one `<sub>` per `rrat`
//! entry (using the matching `encs.enc` filter) with `acrs` pointing back
//! at this CRS; this module only tracks the per-window firing state and
//! decides when the window condition is satisfied.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cse_core::error::{CseError, CseResult};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindowType {
    Periodic = 1,
    Sliding = 2,
}

impl TimeWindowType {
    fn from_i64(n: i64) -> Option<Self> {
        Some(match n {
            1 => TimeWindowType::Periodic,
            2 => TimeWindowType::Sliding,
            _ => return None,
        })
    }
}

/// `eem` — event evaluation mode: whether all regarded resources must
/// fire at least once inside the window (`AllEvents`) or any single
/// regarded resource firing is enough (`AnyEvent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEvaluationMode {
    AllEvents,
    AnyEvent,
}

#[derive(Debug, Clone)]
pub struct CrsConfig {
    pub ri: String,
    pub notification_uris: Vec<String>,
    pub window_type: TimeWindowType,
    pub window_size: ChronoDuration,
    pub regarded_resources: Vec<String>,
    pub evaluation_mode: EventEvaluationMode,
}

impl CrsConfig {
    pub fn from_document(ri: impl Into<String>, doc: &Value) -> CseResult<Self> {
        let ri = ri.into();
        let notification_uris = doc
            .get("nu")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .ok_or_else(|| CseError::bad_request("crs missing nu").with_attribute("nu"))?;

        let window_type = doc
            .get("twt")
            .and_then(Value::as_i64)
            .and_then(TimeWindowType::from_i64)
            .ok_or_else(|| CseError::bad_request("crs has missing or invalid twt").with_attribute("twt"))?;

        let window_size = doc
            .get("tws")
            .and_then(Value::as_str)
            .and_then(cse_core::time::parse_iso8601_duration)
            .ok_or_else(|| CseError::bad_request("crs has missing or invalid tws").with_attribute("tws"))?;

        let regarded_resources: Vec<String> = doc
            .get("rrat")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if regarded_resources.is_empty() {
            return Err(CseError::bad_request("crs must specify rrat").with_attribute("rrat"));
        }

        let encs_count = doc
            .get("encs")
            .and_then(|encs| encs.get("enc"))
            .and_then(Value::as_array)
            .map(Vec::len);
        if let Some(count) = encs_count {
            if count != 1 && count != regarded_resources.len() {
                return Err(CseError::bad_request(
                    "encs must provide either one shared filter or one per rrat entry",
                )
                .with_attribute("encs"));
            }
        }

        let evaluation_mode = match doc.get("eem").and_then(Value::as_i64) {
            Some(2) => EventEvaluationMode::AnyEvent,
            _ => EventEvaluationMode::AllEvents,
        };

        Ok(Self {
            ri,
            notification_uris,
            window_type,
            window_size,
            regarded_resources,
            evaluation_mode,
        })
    }
}

/// Tracks fired-event timestamps per regarded resource within the active
/// window and decides when the aggregated notification should fire.
pub struct WindowTracker {
    config: CrsConfig,
    fired_at: HashMap<String, DateTime<Utc>>,
    window_started_at: Option<DateTime<Utc>>,
}

impl WindowTracker {
    pub fn new(config: CrsConfig) -> Self {
        Self {
            config,
            fired_at: HashMap::new(),
            window_started_at: None,
        }
    }

    /// Record that `regarded_ri` produced a matching event at `now`.
    /// Returns `true` if the window's evaluation condition is now
    /// satisfied, in which case the caller should send the aggregated
    /// notification and call `reset`.
    pub fn record_event(&mut self, regarded_ri: &str, now: DateTime<Utc>) -> bool {
        if !self.config.regarded_resources.iter().any(|r| r == regarded_ri) {
            return false;
        }

        if let Some(started) = self.window_started_at {
            if now - started > self.config.window_size {
                match self.config.window_type {
                    TimeWindowType::Periodic => {
                        self.fired_at.clear();
                        self.window_started_at = Some(now);
                    }
                    TimeWindowType::Sliding => {
                        self.window_started_at = Some(now - self.config.window_size);
                        self.fired_at.retain(|_, t| now - *t <= self.config.window_size);
                    }
                }
            }
        } else {
            self.window_started_at = Some(now);
        }

        self.fired_at.insert(regarded_ri.to_string(), now);

        match self.config.evaluation_mode {
            EventEvaluationMode::AnyEvent => true,
            EventEvaluationMode::AllEvents => self
                .config
                .regarded_resources
                .iter()
                .all(|ri| self.fired_at.contains_key(ri)),
        }
    }

    /// Start a new window after an aggregated notification was sent.
    pub fn reset(&mut self) {
        self.fired_at.clear();
        self.window_started_at = None;
    }

    pub fn config(&self) -> &CrsConfig {
        &self.config
    }
}
