//! A fully wired, in-memory CSE instance for integration tests, grounded
//! on `cse-dispatcher`'s own internal `seeded()` test helper: a
//! `<CSEBase>` with a wildcard `<ACP>` attached, so any originator passes
//! access control without each test needing its own privilege setup.

use std::sync::Arc;

use cse_announce::Announcer;
use cse_core::config::CseConfig;
use cse_core::health::Statistics;
use cse_core::ids::IdAllocator;
use cse_dispatcher::forwarder::UnreachableForwarder;
use cse_dispatcher::{CseForwarder, Dispatcher, Request, Response};
use cse_events::EventBus;
use cse_model::{Operation, PolicyRegistry, Resource, ResourceType};
use cse_notifier::{BatchCoordinator, Notifier, RecordingSender, SubscriptionRegistry};
use cse_scheduler::Scheduler;
use cse_security::SecurityGuard;
use cse_storage::{InMemoryStore, Store};
use serde_json::{json, Value};

/// Originator granted every permission by the harness's wildcard `<ACP>`
/// (`acor: ["all"]`). Tests that need to exercise a denial should use a
/// different originator and their own narrower `<ACP>`.
pub const ADMIN_ORIGINATOR: &str = "CAdmin";

pub const CSE_BASE_RI: &str = "cb";
pub const CSE_BASE_RN: &str = "cse-in";
pub const ADMIN_ACP_RI: &str = "acp-all";

/// A complete set of wired components plus a `<CSEBase>`/`<ACP>` already
/// in storage, ready to dispatch requests against.
pub struct Harness {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<Dispatcher>,
    pub notifier: Arc<Notifier>,
    pub sender: Arc<RecordingSender>,
    pub events: EventBus,
    pub stats: Arc<Statistics>,
    pub config: CseConfig,
    ids: IdAllocator,
}

impl Harness {
    /// Build a harness with the default in-memory store, no announcer,
    /// and an unreachable forwarder (no remote CSE traffic in tests).
    pub async fn new() -> Self {
        Self::with_forwarder(Arc::new(UnreachableForwarder)).await
    }

    /// Build a harness with a caller-supplied forwarder, for tests that
    /// need to observe or fake cross-CSE requests.
    pub async fn with_forwarder(forwarder: Arc<dyn CseForwarder>) -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

        let cse_base = Resource::new(ResourceType::CseBase, CSE_BASE_RI.into(), None, CSE_BASE_RN.into(), format!("/{CSE_BASE_RN}"));
        store.insert_resource(cse_base).await.expect("seed cse base");

        let mut acp = Resource::new(
            ResourceType::Acp,
            ADMIN_ACP_RI.into(),
            Some(CSE_BASE_RI.into()),
            "acpAll".into(),
            format!("/{CSE_BASE_RN}/acpAll"),
        );
        acp.set_attr("pv", json!({"acr": [{"acor": ["all"], "acop": 63}]}));
        acp.set_attr("pvs", json!({"acr": [{"acor": ["all"], "acop": 63}]}));
        store.insert_resource(acp).await.expect("seed acp");

        let mut cse_base = store.get_by_ri(CSE_BASE_RI).await.unwrap().unwrap();
        cse_base.acpi = Some(vec![ADMIN_ACP_RI.to_string()]);
        store.update_resource(cse_base).await.expect("attach acp to cse base");

        let config = CseConfig::default();
        let policies = PolicyRegistry::bootstrap();
        let guard = SecurityGuard::new(store.clone());
        let events = EventBus::new();
        let sender = Arc::new(RecordingSender::new());
        let registry = SubscriptionRegistry::new();
        let scheduler = Scheduler::new();
        let batch = BatchCoordinator::new(store.clone(), sender.clone(), registry.clone(), scheduler);
        let notifier = Arc::new(Notifier::new(registry, sender.clone(), batch));
        notifier.install(&events).await;
        let stats = Statistics::new();

        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            config.clone(),
            policies,
            guard,
            events.clone(),
            notifier.clone(),
            None,
            forwarder,
            None,
            stats.clone(),
        ));

        Self { store, dispatcher, notifier, sender, events, stats, config, ids: IdAllocator::new() }
    }

    /// Attach an announcer wired against `client`, for tests exercising
    /// `at`/`aa` announced mirrors. Rebuilds the dispatcher, so call this
    /// before seeding any other resources.
    pub fn with_announcer(mut self, announcer: Arc<Announcer>) -> Self {
        self.dispatcher = Arc::new(Dispatcher::new(
            self.store.clone(),
            self.config.clone(),
            PolicyRegistry::bootstrap(),
            SecurityGuard::new(self.store.clone()),
            self.events.clone(),
            self.notifier.clone(),
            Some(announcer),
            Arc::new(UnreachableForwarder),
            None,
            self.stats.clone(),
        ));
        self
    }

    /// Build and dispatch a blocking create under `parent_ri`. `content`
    /// is the flat attribute map (no `m2m:<type>` envelope, matching what
    /// `Dispatcher::handle_create` expects).
    pub async fn create(&self, parent_ri: &str, ty: ResourceType, content: Value) -> Response {
        let mut request = Request::new(Operation::Create, parent_ri, ADMIN_ORIGINATOR, self.ids.new_rqi());
        request.resource_type = Some(ty);
        request.content = Some(content);
        self.dispatcher.dispatch(request).await
    }

    /// Build and dispatch a blocking create as a specific originator,
    /// for access-control tests.
    pub async fn create_as(&self, originator: &str, parent_ri: &str, ty: ResourceType, content: Value) -> Response {
        let mut request = Request::new(Operation::Create, parent_ri, originator, self.ids.new_rqi());
        request.resource_type = Some(ty);
        request.content = Some(content);
        self.dispatcher.dispatch(request).await
    }

    pub async fn retrieve(&self, ri: &str) -> Response {
        self.retrieve_as(ADMIN_ORIGINATOR, ri).await
    }

    pub async fn retrieve_as(&self, originator: &str, ri: &str) -> Response {
        let request = Request::new(Operation::Retrieve, ri, originator, self.ids.new_rqi());
        self.dispatcher.dispatch(request).await
    }

    pub async fn update(&self, ri: &str, content: Value) -> Response {
        self.update_as(ADMIN_ORIGINATOR, ri, content).await
    }

    pub async fn update_as(&self, originator: &str, ri: &str, content: Value) -> Response {
        let mut request = Request::new(Operation::Update, ri, originator, self.ids.new_rqi());
        request.content = Some(content);
        self.dispatcher.dispatch(request).await
    }

    pub async fn delete(&self, ri: &str) -> Response {
        self.delete_as(ADMIN_ORIGINATOR, ri).await
    }

    pub async fn delete_as(&self, originator: &str, ri: &str) -> Response {
        let request = Request::new(Operation::Delete, ri, originator, self.ids.new_rqi());
        self.dispatcher.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ae_content;
    use cse_core::rsc::ResponseStatusCode;

    #[tokio::test]
    async fn seeded_cse_base_accepts_an_ae_create() {
        let harness = Harness::new().await;
        let response = harness.create(CSE_BASE_RI, ResourceType::Ae, ae_content("ae1", "app.example")).await;
        assert_eq!(response.rsc, ResponseStatusCode::Created);

        let ri = response.content.unwrap()["ri"].as_str().unwrap().to_string();
        let retrieved = harness.retrieve(&ri).await;
        assert_eq!(retrieved.rsc, ResponseStatusCode::Ok);
    }

    #[tokio::test]
    async fn unknown_originator_without_acp_is_denied() {
        let harness = Harness::new().await;
        let mut acp = harness.store.get_by_ri(ADMIN_ACP_RI).await.unwrap().unwrap();
        acp.set_attr("pv", json!({"acr": [{"acor": ["CSpecific"], "acop": 63}]}));
        harness.store.update_resource(acp).await.unwrap();

        let response = harness.create_as("CSomeoneElse", CSE_BASE_RI, ResourceType::Ae, ae_content("ae1", "app.example")).await;
        assert_eq!(response.rsc, ResponseStatusCode::OriginatorHasNoPrivilege);
    }
}
