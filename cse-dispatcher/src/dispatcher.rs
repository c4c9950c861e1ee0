//! The CRUDN pipeline (§4.1): resolves a request's target, runs access
//! control and attribute validation, commits the change to storage, emits
//! change events, and formats the response. Every other crate in this
//! workspace is a piece this module wires together; none of them know
//! about each other directly (§9 design note on trait seams over cyclic
//! crate dependencies).

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use cse_announce::Announcer;
use cse_core::config::CseConfig;
use cse_core::error::{CseError, CseResult};
use cse_core::health::Statistics;
use cse_core::ids::{join_srn, IdAllocator};
use cse_core::rsc::ResponseStatusCode;
use cse_events::{EventBus, ResourceCreated, ResourceDeleted, ResourceUpdated, TriggerReceivedForAe};
use cse_group::membership::validate_members;
use cse_group::fanout::{fan_out, MemberDispatcher, MemberOutcome};
use cse_model::{
    allowed_child_types, ConsistencyStrategy, Operation, Permission, PolicyRegistry, Resource,
    ResourceType, Validator, ValidationContext,
};
use cse_notifier::{CrsConfig, CrsManager, Notifier};
use cse_storage::{RequestRecord, Store};

use crate::accessor::SnapshotAccessor;
use crate::activation;
use crate::discovery;
use crate::forwarder::CseForwarder;
use crate::locks::ResourceLocks;
use crate::polling::PollingChannelRegistry;
use crate::request::{Request, ResponseType, ResultContent, Response};
use crate::target::{self, LocalTarget, ResolvedTarget, VirtualChild};

/// Results of a non-blocking request, keyed by `rqi` (§4.1 "Non-blocking
/// modes"). The caller polls `<request>` (or the dispatcher's in-process
/// equivalent) once notified or after `rset`.
#[derive(Default)]
struct PendingResults {
    inner: DashMap<String, Response>,
}

impl PendingResults {
    fn store(&self, rqi: String, response: Response) {
        self.inner.insert(rqi, response);
    }

    fn get(&self, rqi: &str) -> Option<Response> {
        self.inner.get(rqi).map(|entry| entry.clone())
    }
}

/// Everything the pipeline needs, constructed once at startup and shared
/// behind an `Arc` (§9 design note on global, read-mostly registries).
pub struct Dispatcher {
    store: Arc<dyn Store>,
    config: CseConfig,
    ids: IdAllocator,
    validator: Validator,
    guard: cse_security::SecurityGuard,
    events: EventBus,
    notifier: Arc<Notifier>,
    announcer: Option<Arc<Announcer>>,
    forwarder: Arc<dyn CseForwarder>,
    locks: ResourceLocks,
    polling: PollingChannelRegistry,
    crs_manager: Option<Arc<CrsManager>>,
    stats: Arc<Statistics>,
    pending: PendingResults,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        config: CseConfig,
        policies: PolicyRegistry,
        guard: cse_security::SecurityGuard,
        events: EventBus,
        notifier: Arc<Notifier>,
        announcer: Option<Arc<Announcer>>,
        forwarder: Arc<dyn CseForwarder>,
        crs_manager: Option<Arc<CrsManager>>,
        stats: Arc<Statistics>,
    ) -> Self {
        Self {
            store,
            config,
            ids: IdAllocator::new(),
            validator: Validator::new(policies),
            guard,
            events,
            notifier,
            announcer,
            forwarder,
            locks: ResourceLocks::new(),
            polling: PollingChannelRegistry::new(),
            crs_manager,
            stats,
            pending: PendingResults::default(),
        }
    }

    pub fn polling_channels(&self) -> &PollingChannelRegistry {
        &self.polling
    }

    /// Retrieve a previously stashed non-blocking result (§4.1 "Non-blocking
    /// modes", SPEC_FULL.md §D.3). Returns the last known state even after
    /// `rset` has elapsed, per that decision.
    pub fn poll_result(&self, request_id: &str) -> Option<Response> {
        self.pending.get(request_id)
    }

    /// Entry point: dispatch `request` and produce a response. Never
    /// panics on a well-formed request; errors are folded into an error
    /// `Response` so transports (out of scope) always get something to
    /// serialize.
    pub async fn dispatch(self: &Arc<Self>, request: Request) -> Response {
        if !matches!(request.response_type, ResponseType::BlockingRequest) {
            return self.dispatch_non_blocking(request).await;
        }
        let response = self.dispatch_blocking(&request).await;
        self.record(&request, &response).await;
        response
    }

    /// Accept a non-blocking request immediately and run it in the
    /// background, stashing the eventual result for polling (§4.1
    /// "Non-blocking modes").
    async fn dispatch_non_blocking(self: &Arc<Self>, request: Request) -> Response {
        let accepted_rsc = match request.response_type {
            ResponseType::NonBlockingRequestSynch => ResponseStatusCode::AcceptedNonBlockingRequestSynch,
            ResponseType::NonBlockingRequestAsynch => ResponseStatusCode::AcceptedNonBlockingRequestAsynch,
            ResponseType::BlockingRequest => unreachable!("handled by caller"),
        };
        let rqi = request.request_id.clone();
        let to = request.to.clone();

        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let response = dispatcher.dispatch_blocking(&request).await;
            dispatcher.record(&request, &response).await;
            dispatcher.pending.store(request.request_id.clone(), response);
        });

        Response::success(
            accepted_rsc,
            rqi.clone(),
            Some(serde_json::json!({ "requestID": rqi })),
            to,
        )
    }

    async fn record(&self, request: &Request, response: &Response) {
        let record = RequestRecord {
            ri: self.ids.new_ri(),
            originator: request.originator.clone(),
            operation: request.op,
            target: request.to.clone(),
            rsc: response.rsc,
            timestamp: cse_core::time::now(),
        };
        let _ = self
            .store
            .record_request(record, self.config.max_request_history)
            .await;
    }

    async fn dispatch_blocking(&self, request: &Request) -> Response {
        match self.dispatch_inner(request).await {
            Ok(response) => response,
            Err(err) => Response::error(err.rsc, request.request_id.clone(), err.to_string(), Some(request.to.clone())),
        }
    }

    async fn dispatch_inner(&self, request: &Request) -> CseResult<Response> {
        if !self.config.supported_release_versions.iter().any(|v| v == &request.release_version) {
            return Err(CseError::new(
                ResponseStatusCode::ReleaseVersionNotSupported,
                format!("release version '{}' is not supported", request.release_version),
            ));
        }
        if let Some(rqet) = request.request_expiration {
            if rqet < cse_core::time::now() {
                return Err(CseError::new(ResponseStatusCode::RequestTimeout, "request expired before dispatch"));
            }
        }

        let resolved = target::resolve(&*self.store, &self.config.cse_id, &self.config.cse_rn, &request.to).await?;
        let local = match resolved {
            ResolvedTarget::Remote { cse_id } => {
                return self.forwarder.forward(&cse_id, request).await;
            }
            ResolvedTarget::Local(local) => local,
        };

        if let Some(virtual_child) = local.virtual_child {
            return self.dispatch_virtual(request, &local, virtual_child).await;
        }

        match request.op {
            Operation::Create => self.handle_create(request, &local.resource).await,
            Operation::Retrieve => self.handle_retrieve(request, &local.resource).await,
            Operation::Discovery => self.handle_discovery(request, &local.resource).await,
            Operation::Update => self.handle_update(request, local.resource).await,
            Operation::Delete => self.handle_delete(request, local.resource).await,
            Operation::Notify => self.handle_notify(request, &local.resource).await,
        }
    }

    /// Structural virtual children never persist a resource of their own
    /// (§3, §4.1 "virtual children"); each resolves to different behavior
    /// on top of its host resource.
    async fn dispatch_virtual(&self, request: &Request, local: &LocalTarget, virtual_child: VirtualChild) -> CseResult<Response> {
        match virtual_child {
            VirtualChild::Latest | VirtualChild::Oldest => {
                self.handle_latest_oldest(request, &local.resource, virtual_child).await
            }
            VirtualChild::Fopt => self.handle_fopt(request, &local.resource, local.fanout_suffix.as_deref()).await,
            VirtualChild::Pcu => self.handle_pcu(request, &local.resource).await,
        }
    }

    async fn handle_latest_oldest(&self, request: &Request, host: &Resource, which: VirtualChild) -> CseResult<Response> {
        self.guard.check(&request.originator, host, Permission::RETRIEVE).await?;
        let mut children: Vec<Resource> = self
            .store
            .children_of(&host.ri)
            .await?
            .into_iter()
            .filter(|r| matches!(r.ty, ResourceType::Cin | ResourceType::Tsi))
            .collect();
        children.sort_by_key(|r| r.ct);
        let chosen = match which {
            VirtualChild::Latest => children.into_iter().next_back(),
            VirtualChild::Oldest => children.into_iter().next(),
            _ => unreachable!(),
        };
        let Some(chosen) = chosen else {
            return Err(CseError::not_found("container has no instances"));
        };
        Ok(Response::success(ResponseStatusCode::Ok, request.request_id.clone(), Some(chosen.to_document()), request.to.clone()))
    }

    /// Fan `request` out to every `<grp>` member (§4.4). Works for any
    /// CRUDN operation, since `fopt` just replicates whatever came in.
    async fn handle_fopt(&self, request: &Request, group: &Resource, suffix: Option<&str>) -> CseResult<Response> {
        self.guard.check(&request.originator, group, Permission::RETRIEVE.union(Permission::NOTIFY)).await.ok();
        let mid: Vec<String> = group
            .get_attr("mid")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let suffix = suffix.map(|s| s.trim_start_matches('/'));
        let content = fan_out(&mid, suffix, request.op, &request.originator, request.content.clone(), self).await;
        Ok(Response::success(ResponseStatusCode::Ok, request.request_id.clone(), Some(content), request.to.clone()))
    }

    async fn handle_pcu(&self, request: &Request, channel: &Resource) -> CseResult<Response> {
        self.guard.check(&request.originator, channel, Permission::RETRIEVE).await?;
        match self.polling.retrieve(&channel.ri, self.config.polling_channel_timeout).await {
            Some(queued) => Ok(Response::success(
                ResponseStatusCode::Ok,
                request.request_id.clone(),
                Some(serde_json::json!({
                    "op": format!("{:?}", queued.request.op),
                    "to": queued.request.to,
                    "fr": queued.request.originator,
                    "pc": queued.request.content,
                })),
                request.to.clone(),
            )),
            None => Err(CseError::new(ResponseStatusCode::RequestTimeout, "no request queued before polling timeout")),
        }
    }

    async fn handle_retrieve(&self, request: &Request, target_resource: &Resource) -> CseResult<Response> {
        if target_resource.ty == ResourceType::Acp {
            self.guard.check_self(&request.originator, target_resource, Permission::RETRIEVE).await?;
        } else {
            self.guard.check(&request.originator, target_resource, Permission::RETRIEVE).await?;
        }
        self.notifier.check_blocking_retrieve(target_resource, false).await?;
        self.stats.record_retrieve();

        if matches!(target_resource.ty, ResourceType::Cnt | ResourceType::Ts) {
            let has_children = !self.store.children_of(&target_resource.ri).await?.is_empty();
            if !has_children {
                self.events
                    .emit(cse_events::ContainerRetrievedWithNoChild { container_ri: target_resource.ri.clone() })
                    .await;
            }
        }

        let content = self.format_content(request, target_resource, None);
        Ok(Response::success(ResponseStatusCode::Ok, request.request_id.clone(), content, request.to.clone()))
    }

    async fn handle_discovery(&self, request: &Request, root: &Resource) -> CseResult<Response> {
        self.guard.check(&request.originator, root, Permission::DISCOVERY).await?;
        let filter = request.filter.clone().unwrap_or_default();
        let results = discovery::discover(&*self.store, &root.ri, &filter).await?;
        let content = match request.result_content {
            ResultContent::DiscoveryResultReferences | ResultContent::Nothing => {
                serde_json::json!({ "m2m:uril": results.iter().map(|r| r.srn.clone()).collect::<Vec<_>>() })
            }
            _ => serde_json::json!({ "m2m:uril": results.into_iter().map(|r| r.to_document()).collect::<Vec<_>>() }),
        };
        Ok(Response::success(ResponseStatusCode::Ok, request.request_id.clone(), Some(content), request.to.clone()))
    }

    async fn handle_notify(&self, request: &Request, target_resource: &Resource) -> CseResult<Response> {
        self.guard.check(&request.originator, target_resource, Permission::NOTIFY).await?;
        if target_resource.ty == ResourceType::Ae {
            self.events
                .emit(TriggerReceivedForAe {
                    ae_ri: target_resource.ri.clone(),
                    payload: request.content.clone().unwrap_or(Value::Null),
                })
                .await;
        }
        Ok(Response::success(ResponseStatusCode::Ok, request.request_id.clone(), None, request.to.clone()))
    }

    async fn handle_create(&self, request: &Request, parent: &Resource) -> CseResult<Response> {
        let ty = request
            .resource_type
            .ok_or_else(|| CseError::new(ResponseStatusCode::InsufficientArguments, "create requires a resource type"))?;
        if !allowed_child_types(parent.ty).contains(&ty) {
            return Err(CseError::invalid_child_type(format!("'{ty}' is not a valid child of '{}'", parent.ty)));
        }
        let content = request
            .content
            .as_ref()
            .and_then(Value::as_object)
            .ok_or_else(|| CseError::new(ResponseStatusCode::InsufficientArguments, "create requires a content body"))?
            .clone();

        self.guard.check(&request.originator, parent, Permission::CREATE).await?;
        self.validator.validate(ty, &content, ValidationContext::Create)?;

        let accessor = SnapshotAccessor::gather(&*self.store, candidate_references(&content)).await?;
        activation::activate(ty, &content, &request.originator, &accessor)?;

        let _guard = self.locks.acquire(&parent.ri).await;

        let rn = content
            .get("rn")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.new_ri());
        let srn = join_srn(&parent.srn, &rn);
        if self.store.get_by_srn(&srn).await?.is_some() {
            return Err(CseError::conflict(format!("a resource named '{rn}' already exists under '{}'", parent.srn)));
        }

        let mut resource = Resource::new(ty, self.ids.new_ri(), Some(parent.ri.clone()), rn, srn);
        resource.cr = Some(request.originator.clone());
        apply_common_attributes(&mut resource, &content);
        split_attributes(&mut resource, content);

        if ty == ResourceType::Grp {
            self.reconcile_group_membership(&mut resource).await?;
        }

        if resource.at.is_some() {
            if let Some(announcer) = &self.announcer {
                let rewritten = announcer.announce_create(&resource).await?;
                resource.at = Some(rewritten);
            }
        }

        if ty == ResourceType::Sub {
            self.notifier.register(&resource).await?;
        }

        self.store.insert_resource(resource.clone()).await?;
        self.stats.record_create();

        if ty == ResourceType::Crs {
            self.register_crs(&resource).await?;
        }
        if ty == ResourceType::Pch {
            self.polling.open(&resource.ri);
        }

        self.events
            .emit(ResourceCreated { resource: resource.clone(), parent_ri: Some(parent.ri.clone()) })
            .await;

        let content = self.format_content(request, &resource, None);
        Ok(Response::success(ResponseStatusCode::Created, request.request_id.clone(), content, request.to.clone()))
    }

    async fn handle_update(&self, request: &Request, mut resource: Resource) -> CseResult<Response> {
        let content = request
            .content
            .as_ref()
            .and_then(Value::as_object)
            .ok_or_else(|| CseError::new(ResponseStatusCode::InsufficientArguments, "update requires a content body"))?
            .clone();

        self.guard.check(&request.originator, &resource, Permission::UPDATE).await?;
        self.validator.validate(resource.ty, &content, ValidationContext::Update)?;

        let accessor = SnapshotAccessor::gather(&*self.store, candidate_references(&content)).await?;
        activation::activate(resource.ty, &content, &request.originator, &accessor)?;

        let _guard = self.locks.acquire(&resource.ri).await;
        let previous = resource.clone();

        apply_common_attributes(&mut resource, &content);
        for (key, value) in content {
            if matches!(key.as_str(), "ty" | "ri" | "pi" | "rn" | "ct" | "lt" | "st") {
                continue;
            }
            resource.set_attr(key, value);
        }
        resource.touch();

        if resource.ty == ResourceType::Grp {
            self.reconcile_group_membership(&mut resource).await?;
        }

        self.notifier.check_blocking_update(&resource).await?;

        if resource.ty == ResourceType::Sub {
            self.notifier.reregister(&resource).await?;
        }
        if resource.at.is_some() {
            if let Some(announcer) = &self.announcer {
                announcer.announce_update(&resource).await?;
            }
        }

        self.store.update_resource(resource.clone()).await?;
        self.stats.record_update();
        self.guard.invalidate(&resource.ri);

        self.events.emit(ResourceUpdated { resource: resource.clone(), previous }).await;

        let content = self.format_content(request, &resource, None);
        Ok(Response::success(ResponseStatusCode::Updated, request.request_id.clone(), content, request.to.clone()))
    }

    async fn handle_delete(&self, request: &Request, resource: Resource) -> CseResult<Response> {
        self.guard.check(&request.originator, &resource, Permission::DELETE).await?;
        let _guard = self.locks.acquire(&resource.ri).await;
        self.delete_cascade(resource, true).await?;
        Ok(Response::success(ResponseStatusCode::Deleted, request.request_id.clone(), None, request.to.clone()))
    }

    /// Delete `ri` and its subtree without an access-control check, for
    /// system-driven removal rather than an originator's own request
    /// (reference: `expireResources`, the reference CSE's background
    /// expiration sweep, which bypasses ACP the same way). Used by the
    /// resource-expiry scanner (SPEC_FULL.md §B.1). Returns without error
    /// if `ri` no longer exists.
    pub async fn expire_resource(&self, ri: &str) -> CseResult<()> {
        let Some(resource) = self.store.get_by_ri(ri).await? else {
            return Ok(());
        };
        let _guard = self.locks.acquire(&resource.ri).await;
        self.delete_cascade(resource, false).await
    }

    /// Shared cascade-delete body for [`Dispatcher::handle_delete`] and
    /// [`Dispatcher::expire_resource`]: walk the subtree, remove bottom-up,
    /// and clean up every component that keeps its own side state for a
    /// resource (§4.1 step 6 delete branch).
    async fn delete_cascade(&self, resource: Resource, counts_as_delete: bool) -> CseResult<()> {
        let mut subtree = self.store.children_of(&resource.ri).await?;
        // Cascade depth-first so children are removed before their parent;
        // order otherwise doesn't matter within a level.
        let mut to_delete = vec![resource];
        while let Some(child) = subtree.pop() {
            subtree.extend(self.store.children_of(&child.ri).await?);
            to_delete.push(child);
        }
        to_delete.sort_by_key(|r| r.srn.len());
        to_delete.reverse();

        for victim in &to_delete {
            self.store.delete_resource(&victim.ri).await?;
            if counts_as_delete {
                self.stats.record_delete();
            } else {
                self.stats.record_expired();
            }
            self.guard.invalidate(&victim.ri);

            if victim.ty == ResourceType::Sub {
                self.notifier.unregister(&victim.ri).await?;
            }
            if victim.ty == ResourceType::Crs {
                if let Some(crs_manager) = &self.crs_manager {
                    crs_manager.unregister(&victim.ri);
                }
            }
            if victim.ty == ResourceType::Pch {
                self.polling.close(&victim.ri);
            }
            if let Some(at) = &victim.at {
                if let Some(announcer) = &self.announcer {
                    announcer.unannounce(at, None).await?;
                }
            }
            self.events
                .emit(ResourceDeleted { resource: victim.clone(), parent_ri: victim.pi.clone() })
                .await;
        }

        Ok(())
    }

    /// Build/refresh `<crs>`'s per-`rrat` `<sub>` children and register its
    /// window tracker (§4.3 "CRS windowing", `crs.rs`'s division-of-labor
    /// doc comment).
    async fn register_crs(&self, crs: &Resource) -> CseResult<()> {
        let Some(crs_manager) = &self.crs_manager else {
            return Ok(());
        };
        let doc = crs.to_document();
        let config = CrsConfig::from_document(crs.ri.clone(), &doc)?;

        for regarded_ri in &config.regarded_resources {
            let Some(regarded) = self.store.get_by_ri(regarded_ri).await? else {
                continue;
            };
            let sub_rn = format!("crsSub-{}", crs.ri);
            let mut sub = Resource::new(
                ResourceType::Sub,
                self.ids.new_ri(),
                Some(regarded.ri.clone()),
                sub_rn.clone(),
                join_srn(&regarded.srn, &sub_rn),
            );
            sub.set_attr("nu", Value::from(vec![cse_notifier::synthetic_uri(&crs.ri, regarded_ri)]));
            sub.set_attr("nct", Value::from(1));
            sub.set_attr("acrs", Value::from(vec![crs.ri.clone()]));
            self.notifier.register(&sub).await?;
            self.store.insert_resource(sub).await?;
        }

        crs_manager.register(config);
        Ok(())
    }

    async fn reconcile_group_membership(&self, resource: &mut Resource) -> CseResult<()> {
        let mt = resource
            .get_attr("mt")
            .and_then(Value::as_i64)
            .and_then(resource_type_from_code)
            .unwrap_or(ResourceType::Mixed);
        let mid: Vec<String> = resource
            .get_attr("mid")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let mnm = resource.get_attr("mnm").and_then(Value::as_i64);
        let csy = resource
            .get_attr("csy")
            .and_then(Value::as_i64)
            .and_then(consistency_strategy_from_code)
            .unwrap_or(ConsistencyStrategy::AbandonMember);

        let accessor = SnapshotAccessor::gather(&*self.store, mid.clone()).await?;
        let result = validate_members(&mid, mt, mnm, csy, &accessor)?;

        resource.set_attr("mid", Value::from(result.mid.clone()));
        resource.set_attr("mt", Value::from(result.mt as i32));
        resource.set_attr("cnm", Value::from(result.mid.len() as i64));
        Ok(())
    }

    fn format_content(&self, request: &Request, resource: &Resource, previous: Option<&Resource>) -> Option<Value> {
        match request.result_content {
            ResultContent::Nothing => None,
            ResultContent::OriginalResource => previous.map(Resource::to_document).or_else(|| Some(resource.to_document())),
            ResultContent::ChildResourceReferences => Some(serde_json::json!({ "m2m:rrl": [] })),
            ResultContent::ModifiedAttributes | ResultContent::Attributes | ResultContent::DiscoveryResultReferences => {
                Some(resource.to_document())
            }
        }
    }
}

/// Extract the resource identifiers an activation hook might dereference
/// (currently only `<DEPR>`'s `rri`), so the dispatcher only snapshots what
/// it needs rather than the whole store (§9 design note).
fn candidate_references(content: &Map<String, Value>) -> Vec<String> {
    content
        .get("rri")
        .and_then(Value::as_str)
        .map(|s| vec![s.to_string()])
        .unwrap_or_default()
}

/// Split the universal/common attributes carried as dedicated `Resource`
/// fields out of the incoming content map, leaving everything else (type-
/// specific and namespaced custom attributes) in `resource.attrs`.
fn apply_common_attributes(resource: &mut Resource, content: &Map<String, Value>) {
    if let Some(et) = content.get("et").and_then(Value::as_str).and_then(cse_core::time::parse_ts) {
        resource.et = Some(et);
    }
    if let Some(acpi) = content.get("acpi").and_then(Value::as_array) {
        resource.acpi = Some(acpi.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
    }
    if let Some(lbl) = content.get("lbl").and_then(Value::as_array) {
        resource.lbl = Some(lbl.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
    }
    if let Some(at) = content.get("at").and_then(Value::as_array) {
        resource.at = Some(at.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
    }
    if let Some(aa) = content.get("aa").and_then(Value::as_array) {
        resource.aa = Some(aa.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());
    }
}

fn split_attributes(resource: &mut Resource, content: Map<String, Value>) {
    for (key, value) in content {
        if matches!(key.as_str(), "ty" | "ri" | "pi" | "rn" | "ct" | "lt" | "et" | "acpi" | "lbl" | "at" | "aa" | "cr" | "st") {
            continue;
        }
        resource.set_attr(key, value);
    }
}

fn resource_type_from_code(n: i64) -> Option<ResourceType> {
    use ResourceType::*;
    Some(match n {
        0 => Mixed,
        1 => Acp,
        2 => Ae,
        3 => Cnt,
        4 => Cin,
        5 => CseBase,
        9 => Grp,
        14 => Node,
        15 => Pch,
        16 => Csr,
        23 => Sub,
        28 => FlexContainer,
        29 => Ts,
        30 => Tsi,
        63 => Actr,
        64 => Depr,
        65 => Sch,
        66 => Tsb,
        67 => Crs,
        _ => return None,
    })
}

fn consistency_strategy_from_code(n: i64) -> Option<ConsistencyStrategy> {
    Some(match n {
        1 => ConsistencyStrategy::AbandonMember,
        2 => ConsistencyStrategy::AbandonGroup,
        3 => ConsistencyStrategy::SetMixed,
        _ => return None,
    })
}

/// Lets `cse-group::fan_out` replay a CRUDN operation against one member
/// without this crate depending back on itself through a different path —
/// `Dispatcher` simply builds a sub-`Request` and recurses into its own
/// pipeline (§4.4).
#[async_trait]
impl MemberDispatcher for Dispatcher {
    async fn dispatch(&self, target: &str, op: Operation, originator: &str, payload: Option<Value>) -> MemberOutcome {
        let mut request = Request::new(op, target, originator, self.ids.new_rqi());
        request.content = payload;
        let response = self.dispatch_blocking(&request).await;
        MemberOutcome {
            rsc: response.rsc,
            rqi: response.request_id,
            pc: response.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_notifier::{sender::RecordingSender, registry::SubscriptionRegistry, BatchCoordinator};
    use cse_scheduler::Scheduler;
    use cse_security::SecurityGuard;
    use cse_storage::InMemoryStore;
    use serde_json::json;

    use crate::forwarder::UnreachableForwarder;

    async fn seeded() -> (Arc<Dispatcher>, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let cse_base = Resource::new(ResourceType::CseBase, "cb".into(), None, "cse-in".into(), "/cse-in".into());
        store.insert_resource(cse_base).await.unwrap();

        let mut acp = Resource::new(ResourceType::Acp, "acp-all".into(), Some("cb".into()), "acpAll".into(), "/cse-in/acpAll".into());
        acp.set_attr("pv", json!({"acr": [{"acor": ["all"], "acop": 63}]}));
        acp.set_attr("pvs", json!({"acr": [{"acor": ["all"], "acop": 63}]}));
        store.insert_resource(acp).await.unwrap();

        let mut cse_base = store.get_by_ri("cb").await.unwrap().unwrap();
        cse_base.acpi = Some(vec!["acp-all".to_string()]);
        store.update_resource(cse_base).await.unwrap();

        let config = CseConfig::default();
        let policies = PolicyRegistry::bootstrap();
        let guard = SecurityGuard::new(store.clone());
        let events = EventBus::new();
        let sender = Arc::new(RecordingSender::new());
        let registry = SubscriptionRegistry::new();
        let scheduler = Scheduler::new();
        let batch = BatchCoordinator::new(store.clone(), sender.clone(), registry.clone(), scheduler);
        let notifier = Arc::new(Notifier::new(registry, sender, batch));
        let forwarder: Arc<dyn CseForwarder> = Arc::new(UnreachableForwarder);
        let stats = Statistics::new();

        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            config,
            policies,
            guard,
            events,
            notifier,
            None,
            forwarder,
            None,
            stats,
        ));
        (dispatcher, store)
    }

    fn acp_target(ri: &str) -> Vec<String> {
        vec![ri.to_string()]
    }

    #[tokio::test]
    async fn create_then_retrieve_round_trips() {
        let (dispatcher, _store) = seeded().await;

        let mut req = Request::new(Operation::Create, "/cse-in", "CAdmin", "rqi1");
        req.resource_type = Some(ResourceType::Cnt);
        req.content = Some(json!({"rn": "cnt1", "acpi": acp_target("acp-all")}));
        let resp = dispatcher.dispatch(req).await;
        assert_eq!(resp.rsc, ResponseStatusCode::Created);

        let get = Request::new(Operation::Retrieve, "/cse-in/cnt1", "CAdmin", "rqi2");
        let resp = dispatcher.dispatch(get).await;
        assert_eq!(resp.rsc, ResponseStatusCode::Ok);
        assert_eq!(resp.content.unwrap()["rn"], json!("cnt1"));
    }

    #[tokio::test]
    async fn create_rejects_disallowed_child_type() {
        let (dispatcher, store) = seeded().await;
        let mut cnt = Resource::new(ResourceType::Cnt, "cnt1".into(), Some("cb".into()), "cnt1".into(), "/cse-in/cnt1".into());
        cnt.acpi = Some(vec!["acp-all".to_string()]);
        store.insert_resource(cnt).await.unwrap();

        let mut req = Request::new(Operation::Create, "/cse-in/cnt1", "CAdmin", "rqi1");
        req.resource_type = Some(ResourceType::Ae);
        req.content = Some(json!({"rn": "ae1"}));
        let resp = dispatcher.dispatch(req).await;
        assert_eq!(resp.rsc, ResponseStatusCode::InvalidChildResourceType);
    }

    #[tokio::test]
    async fn update_bumps_state_tag_and_persists_attribute() {
        let (dispatcher, store) = seeded().await;
        let mut cnt = Resource::new(ResourceType::Cnt, "cnt1".into(), Some("cb".into()), "cnt1".into(), "/cse-in/cnt1".into());
        cnt.acpi = Some(vec!["acp-all".to_string()]);
        store.insert_resource(cnt).await.unwrap();

        let mut req = Request::new(Operation::Update, "/cse-in/cnt1", "CAdmin", "rqi1");
        req.content = Some(json!({"mni": 50}));
        let resp = dispatcher.dispatch(req).await;
        assert_eq!(resp.rsc, ResponseStatusCode::Updated);

        let updated = store.get_by_ri("cnt1").await.unwrap().unwrap();
        assert_eq!(updated.st, 1);
        assert_eq!(updated.get_attr("mni"), Some(&json!(50)));
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let (dispatcher, store) = seeded().await;
        let mut cnt = Resource::new(ResourceType::Cnt, "cnt1".into(), Some("cb".into()), "cnt1".into(), "/cse-in/cnt1".into());
        cnt.acpi = Some(vec!["acp-all".to_string()]);
        store.insert_resource(cnt).await.unwrap();
        let mut cin = Resource::new(ResourceType::Cin, "cin1".into(), Some("cnt1".into()), "cin1".into(), "/cse-in/cnt1/cin1".into());
        cin.acpi = Some(vec!["acp-all".to_string()]);
        store.insert_resource(cin).await.unwrap();

        let req = Request::new(Operation::Delete, "/cse-in/cnt1", "CAdmin", "rqi1");
        let resp = dispatcher.dispatch(req).await;
        assert_eq!(resp.rsc, ResponseStatusCode::Deleted);
        assert!(store.get_by_ri("cnt1").await.unwrap().is_none());
        assert!(store.get_by_ri("cin1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_blocking_request_returns_accepted_immediately() {
        let (dispatcher, store) = seeded().await;
        let mut cnt = Resource::new(ResourceType::Cnt, "cnt1".into(), Some("cb".into()), "cnt1".into(), "/cse-in/cnt1".into());
        cnt.acpi = Some(vec!["acp-all".to_string()]);
        store.insert_resource(cnt).await.unwrap();

        let mut req = Request::new(Operation::Retrieve, "/cse-in/cnt1", "CAdmin", "rqi1");
        req.response_type = ResponseType::NonBlockingRequestAsynch;
        let resp = dispatcher.dispatch(req).await;
        assert_eq!(resp.rsc, ResponseStatusCode::AcceptedNonBlockingRequestAsynch);

        let polled = loop {
            if let Some(response) = dispatcher.poll_result("rqi1") {
                break response;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(polled.rsc, ResponseStatusCode::Ok);
    }

    #[tokio::test]
    async fn fopt_fans_out_retrieve_to_every_member() {
        let (dispatcher, store) = seeded().await;
        for ri in ["cnt1", "cnt2"] {
            let mut cnt = Resource::new(ResourceType::Cnt, ri.into(), Some("cb".into()), ri.into(), format!("/cse-in/{ri}"));
            cnt.acpi = Some(vec!["acp-all".to_string()]);
            store.insert_resource(cnt).await.unwrap();
        }
        let mut grp = Resource::new(ResourceType::Grp, "grp1".into(), Some("cb".into()), "grp1".into(), "/cse-in/grp1".into());
        grp.acpi = Some(vec!["acp-all".to_string()]);
        grp.set_attr("mid", json!(["cnt1", "cnt2"]));
        store.insert_resource(grp).await.unwrap();

        let req = Request::new(Operation::Retrieve, "/cse-in/grp1/fopt", "CAdmin", "rqi1");
        let resp = dispatcher.dispatch(req).await;
        assert_eq!(resp.rsc, ResponseStatusCode::Ok);
        let entries = resp.content.unwrap()["m2m:agr"]["m2m:rsp"].as_array().unwrap().len();
        assert_eq!(entries, 2);
    }
}
