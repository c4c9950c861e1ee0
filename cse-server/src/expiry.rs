//! Expired-resource reaping (§4.6, reference: the reference CSE's
//! `expireResources` background sweep), built on
//! [`cse_dispatcher::Dispatcher::expire_resource`]'s system-driven cascade
//! delete that bypasses per-request access control.

use std::sync::Arc;
use std::time::Duration;

use cse_dispatcher::Dispatcher;
use cse_model::ResourceType;
use cse_scheduler::{ScheduleConfig, ScheduledTask, Scheduler};
use cse_storage::Store;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct ExpirySweeper {
    store: Arc<dyn Store>,
    dispatcher: Arc<Dispatcher>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self { store, dispatcher })
    }

    pub fn spawn(self: Arc<Self>, scheduler: &Scheduler) {
        scheduler.spawn(ScheduledTask::new("expiry-sweep", ScheduleConfig::Interval(SWEEP_INTERVAL), move || {
            let this = self.clone();
            async move { this.sweep().await }
        }));
    }

    /// Delete every resource whose `et` has passed. A resource with no
    /// `et` (e.g. `<CSEBase>`, or any resource created without one) never
    /// expires.
    async fn sweep(&self) {
        let now = cse_core::time::now();
        let Ok(resources) = self.store.all_resources().await else {
            tracing::warn!("expiry sweep: failed to list resources");
            return;
        };

        for resource in resources {
            if resource.ty == ResourceType::CseBase {
                continue;
            }
            if resource.et.is_some_and(|et| et <= now) {
                if let Err(err) = self.dispatcher.expire_resource(&resource.ri).await {
                    tracing::warn!(ri = %resource.ri, error = %err, "failed to expire resource");
                } else {
                    tracing::debug!(ri = %resource.ri, srn = %resource.srn, "resource expired");
                }
            }
        }
    }
}
