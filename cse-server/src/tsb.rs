//! `<TSB>` time-sync beacon (§4.6): every `bcni`, push `{m2m:tsbn: {tbr,
//! ctm}}` to each URI in `bcnu`. Unlike the `<TS>` missing-data monitor,
//! a beacon has no subscriber registry of its own — `bcnu` lists its
//! targets directly on the resource — so this talks to the
//! `NotificationSender` transport rather than going through `Notifier`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cse_model::{Resource, ResourceType};
use cse_notifier::NotificationSender;
use cse_scheduler::{ScheduleConfig, ScheduledTask, Scheduler};
use cse_storage::Store;
use dashmap::DashMap;
use serde_json::{json, Value};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct TsbBeacon {
    store: Arc<dyn Store>,
    sender: Arc<dyn NotificationSender>,
    last_sent: DashMap<String, DateTime<Utc>>,
}

impl TsbBeacon {
    pub fn new(store: Arc<dyn Store>, sender: Arc<dyn NotificationSender>) -> Arc<Self> {
        Arc::new(Self { store, sender, last_sent: DashMap::new() })
    }

    pub fn spawn(self: Arc<Self>, scheduler: &Scheduler) {
        scheduler.spawn(ScheduledTask::new("tsb-beacon", ScheduleConfig::Interval(TICK_INTERVAL), move || {
            let this = self.clone();
            async move { this.tick().await }
        }));
    }

    async fn tick(&self) {
        let Ok(beacons) = self.store.resources_by_type(ResourceType::Tsb).await else {
            tracing::warn!("tsb beacon: failed to list <TSB> resources");
            return;
        };

        for tsb in beacons {
            self.check_one(tsb).await;
        }
    }

    async fn check_one(&self, tsb: Resource) {
        let Some(bcni) = tsb.get_attr("bcni").and_then(Value::as_str).and_then(cse_core::time::parse_iso8601_duration) else {
            return;
        };
        let Some(bcnu) = tsb.get_attr("bcnu").and_then(Value::as_array) else {
            return;
        };

        let now = cse_core::time::now();
        let due = match self.last_sent.get(&tsb.ri) {
            Some(last) => now >= *last + bcni,
            None => true,
        };
        if !due {
            return;
        }
        self.last_sent.insert(tsb.ri.clone(), now);

        let payload = json!({
            "m2m:tsbn": {
                "tbr": cse_core::time::format_ts(now),
                "ctm": cse_core::time::format_ts(now),
            }
        });

        for uri in bcnu.iter().filter_map(Value::as_str) {
            if let Err(err) = self.sender.send(uri, &payload).await {
                tracing::warn!(ri = %tsb.ri, %uri, error = %err, "tsb beacon send failed");
            }
        }
    }
}
