//! `<TS>` missing-data detection (§4.4, §B). The reference CSE samples
//! each time series against its own `pei`/`mdt` cadence and raises a
//! `mdp` notification once enough expected `<TSI>` children fail to show
//! up; this is the background half of that, the client-facing half being
//! `cse-notifier::subscription`'s `md.num` parsing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cse_events::{EventBus, MissingDataDetected};
use cse_model::{Resource, ResourceType};
use cse_notifier::Notifier;
use cse_scheduler::{ScheduleConfig, ScheduledTask, Scheduler};
use cse_storage::Store;
use dashmap::DashMap;
use serde_json::{json, Value};

const TICK_INTERVAL: Duration = Duration::from_secs(5);
/// Cap on `mdlt` entries retained per `<TS>` when its own `mdn` attribute
/// is absent (real deployments should set `mdn`; this only backstops an
/// unbounded list for one that doesn't).
const DEFAULT_MDLT_CAP: usize = 10;

struct Watch {
    tsi_count: usize,
    expected_at: DateTime<Utc>,
}

/// Tracks, per `<TS>`, how long since the last `<TSI>` arrived and fires
/// `MissingDataDetected` once a gap exceeds `pei + mdt`.
pub struct TimeSeriesMonitor {
    store: Arc<dyn Store>,
    events: EventBus,
    notifier: Arc<Notifier>,
    watches: DashMap<String, Watch>,
}

impl TimeSeriesMonitor {
    pub fn new(store: Arc<dyn Store>, events: EventBus, notifier: Arc<Notifier>) -> Arc<Self> {
        Arc::new(Self { store, events, notifier, watches: DashMap::new() })
    }

    pub fn spawn(self: Arc<Self>, scheduler: &Scheduler) {
        scheduler.spawn(ScheduledTask::new("ts-missing-data-monitor", ScheduleConfig::Interval(TICK_INTERVAL), move || {
            let this = self.clone();
            async move { this.tick().await }
        }));
    }

    async fn tick(&self) {
        let Ok(series) = self.store.resources_by_type(ResourceType::Ts).await else {
            tracing::warn!("ts monitor: failed to list <TS> resources");
            return;
        };

        for ts in series {
            self.check_one(ts).await;
        }
    }

    async fn check_one(&self, ts: Resource) {
        let Some(pei) = ts.get_attr("pei").and_then(Value::as_str).and_then(cse_core::time::parse_iso8601_duration) else {
            return;
        };
        let Some(mdt) = ts.get_attr("mdt").and_then(Value::as_str).and_then(cse_core::time::parse_iso8601_duration) else {
            return;
        };

        let children = self.store.children_of(&ts.ri).await.unwrap_or_default();
        let tsi_count = children.iter().filter(|c| c.ty == ResourceType::Tsi).count();
        let now = cse_core::time::now();

        let missed_slot = {
            let mut watch = self
                .watches
                .entry(ts.ri.clone())
                .or_insert_with(|| Watch { tsi_count, expected_at: ts.ct + pei });

            if tsi_count != watch.tsi_count {
                watch.tsi_count = tsi_count;
                watch.expected_at = now + pei;
                return;
            }

            if now < watch.expected_at + mdt {
                return;
            }

            let missed_at = watch.expected_at;
            watch.expected_at += pei;
            missed_at
        };

        self.record_missing_data(ts, missed_slot).await;
    }

    async fn record_missing_data(&self, mut ts: Resource, missed_at: DateTime<Utc>) {
        let mdn_cap = ts.get_attr("mdn").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(DEFAULT_MDLT_CAP);
        let mdc = ts.get_attr("mdc").and_then(Value::as_u64).unwrap_or(0) + 1;
        let mut mdlt: Vec<DateTime<Utc>> = ts
            .get_attr("mdlt")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(|v| v.as_str().and_then(cse_core::time::parse_ts)).collect())
            .unwrap_or_default();
        mdlt.push(missed_at);
        if mdlt.len() > mdn_cap {
            let excess = mdlt.len() - mdn_cap;
            mdlt.drain(0..excess);
        }

        ts.set_attr("mdc", json!(mdc));
        ts.set_attr("mdlt", json!(mdlt.iter().map(|t| cse_core::time::format_ts(*t)).collect::<Vec<_>>()));
        ts.touch();
        if let Err(err) = self.store.update_resource(ts.clone()).await {
            tracing::warn!(ri = %ts.ri, error = %err, "failed to persist missing-data counters");
            return;
        }

        let Some(threshold) = self.notifier.missing_data_threshold(&ts.ri) else {
            return;
        };
        if mdc < threshold {
            return;
        }

        self.events
            .emit(MissingDataDetected { resource: ts.clone(), missing_count: mdc, missing_timestamps: mdlt })
            .await;

        let mut reset = ts;
        reset.set_attr("mdc", json!(0));
        reset.set_attr("mdlt", json!(Vec::<String>::new()));
        if let Err(err) = self.store.update_resource(reset).await {
            tracing::warn!(error = %err, "failed to reset missing-data counters after notifying");
        }
    }
}
