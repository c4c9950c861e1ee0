//! Wires every crate in the workspace into one running CSE instance
//! (SPEC_FULL.md §9 design note: components meet only here). Grounded on
//! `cse-dispatcher`'s own `seeded()` test helper and `cse-test::Harness`,
//! extended with the pieces a test harness doesn't need: a real
//! `RemoteCseDirectory`-backed forwarder/announcer pair and the
//! background monitors in this crate.

use std::sync::Arc;

use cse_announce::{Announcer, HttpRemoteCseClient, RemoteCseDirectory};
use cse_core::config::CseConfig;
use cse_core::health::Statistics;
use cse_dispatcher::{CseForwarder, Dispatcher, HttpCseForwarder, UnreachableForwarder};
use cse_events::EventBus;
use cse_model::{PolicyRegistry, Resource, ResourceType};
use cse_notifier::{BatchCoordinator, Notifier, NotificationSender, SubscriptionRegistry};
use cse_scheduler::Scheduler;
use cse_security::SecurityGuard;
use cse_storage::{InMemoryStore, Store};
use serde_json::json;

use crate::action_eval::ActionEvaluator;
use crate::expiry::ExpirySweeper;
use crate::ts_monitor::TimeSeriesMonitor;
use crate::tsb::TsbBeacon;

/// `acor` wildcard granting every originator every permission (reference:
/// `cse-security::acp::WILDCARD_ORIGINATOR`). The default ACP a fresh CSE
/// seeds itself with, until an operator locks it down with a narrower one
/// — the same starting point `cse-dispatcher`'s own tests use.
const DEFAULT_ACP_RN: &str = "acpAdmin";

/// Everything a running CSE needs, plus handles to the background
/// monitors so `main` can start them once the runtime is built.
pub struct Runtime {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<Dispatcher>,
    pub notifier: Arc<Notifier>,
    pub sender: Arc<dyn NotificationSender>,
    pub events: EventBus,
    pub scheduler: Scheduler,
    pub stats: Arc<Statistics>,
    pub config: CseConfig,
}

/// A remote CSE's reachability sender, used by `HttpCseForwarder` and
/// `HttpRemoteCseClient` alike: both resolve a `CSE-ID` to a point of
/// access through the same [`RemoteCseDirectory`] (§4.5, §9).
pub fn build_remote_directory(config: &CseConfig) -> RemoteCseDirectory {
    let directory = RemoteCseDirectory::new();
    for (cse_id, poa) in &config.remote_cse_points_of_access {
        directory.register(cse_id.clone(), poa.clone());
    }
    directory
}

impl Runtime {
    /// Build the complete in-process CSE: the `<CSEBase>` (creating it if
    /// storage is empty), every wired component, and a `notifier` already
    /// installed on the event bus. Does not start the background
    /// monitors; call [`crate::monitors::spawn_all`] for that.
    pub async fn bootstrap(config: CseConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        ensure_cse_base(&store, &config).await;
        ensure_default_acp(&store, &config).await;

        let policies = PolicyRegistry::bootstrap();
        let guard = SecurityGuard::new(store.clone());
        let events = EventBus::new();
        let registry = SubscriptionRegistry::new();
        let scheduler = Scheduler::new();

        let directory = build_remote_directory(&config);
        let sender: Arc<dyn NotificationSender> = Arc::new(crate::http_sender::HttpNotificationSender::new());
        let batch = BatchCoordinator::new(store.clone(), sender.clone(), registry.clone(), scheduler.clone());
        let notifier = Arc::new(Notifier::new(registry, sender.clone(), batch));
        notifier.install(&events).await;

        let announcer = if config.announce_enabled {
            let client = Arc::new(HttpRemoteCseClient::new(directory.clone()));
            Some(Arc::new(Announcer::new(client, policies.clone(), config.cse_id.clone())))
        } else {
            None
        };

        let forwarder: Arc<dyn CseForwarder> = if config.announce_enabled {
            Arc::new(HttpCseForwarder::new(directory))
        } else {
            Arc::new(UnreachableForwarder)
        };

        let stats = Statistics::new();

        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            config.clone(),
            policies,
            guard,
            events.clone(),
            notifier.clone(),
            announcer,
            forwarder,
            None,
            stats.clone(),
        ));

        Self { store, dispatcher, notifier, sender, events, scheduler, stats, config }
    }

    /// Start every background monitor on this runtime's scheduler (§B).
    /// Returns immediately; monitors keep running until
    /// `self.scheduler.shutdown()` is called.
    pub fn start_monitors(&self) {
        ExpirySweeper::new(self.store.clone(), self.dispatcher.clone()).spawn(&self.scheduler);
        TimeSeriesMonitor::new(self.store.clone(), self.events.clone(), self.notifier.clone()).spawn(&self.scheduler);
        TsbBeacon::new(self.store.clone(), self.sender.clone()).spawn(&self.scheduler);
        ActionEvaluator::new(self.store.clone(), self.dispatcher.clone()).spawn(&self.scheduler);
    }
}

/// Create the `<CSEBase>` (§3) the first time the server starts against
/// empty storage. A restart against a persisted store (out of scope:
/// this workspace's only `Store` impl is in-memory) would skip this.
async fn ensure_cse_base(store: &Arc<dyn Store>, config: &CseConfig) {
    let srn = format!("/{}", config.cse_rn);
    if store.get_by_srn(&srn).await.ok().flatten().is_some() {
        return;
    }

    let mut base = Resource::new(ResourceType::CseBase, "cb".to_string(), None, config.cse_rn.clone(), srn);
    base.set_attr("csi", json!(config.cse_csi));
    base.set_attr("cst", json!(2)); // IN-CSE
    store.insert_resource(base).await.expect("seed cse base");
}

/// Seed a wildcard-all `<ACP>` under the `<CSEBase>` the first time it
/// starts against empty storage, and attach it via `acpi` so discovery
/// and registration work out of the box.
async fn ensure_default_acp(store: &Arc<dyn Store>, config: &CseConfig) {
    let srn = format!("/{}/{DEFAULT_ACP_RN}", config.cse_rn);
    if store.get_by_srn(&srn).await.ok().flatten().is_some() {
        return;
    }

    let mut acp = Resource::new(ResourceType::Acp, "acp-admin".to_string(), Some("cb".to_string()), DEFAULT_ACP_RN.to_string(), srn);
    acp.set_attr("pv", json!({"acr": [{"acor": ["all"], "acop": 63}]}));
    acp.set_attr("pvs", json!({"acr": [{"acor": ["all"], "acop": 63}]}));
    store.insert_resource(acp).await.expect("seed default acp");

    if let Some(mut base) = store.get_by_ri("cb").await.ok().flatten() {
        base.acpi = Some(vec!["acp-admin".to_string()]);
        store.update_resource(base).await.expect("attach default acp to cse base");
    }
}
