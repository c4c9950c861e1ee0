//! Outbound transport to remote CSEs, isolated behind a trait seam so the
//! announcer stays testable without a live HTTP endpoint (mirrors
//! `cse-notifier::NotificationSender`/`RecordingSender`).

use async_trait::async_trait;
use cse_core::error::{CseError, CseResult};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// Outbound operations the announcer needs against a remote CSE (§4.5).
#[async_trait]
pub trait RemoteCseClient: Send + Sync {
    /// Create an announced-mirror resource of `announced_type` at `cse_id`
    /// carrying `attrs`, returning the mirror's `ri`.
    async fn create(&self, cse_id: &str, announced_type: &str, attrs: Value) -> CseResult<String>;

    /// Update the mirror `remote_ri` at `cse_id` with the recomputed
    /// attribute subset.
    async fn update(&self, cse_id: &str, remote_ri: &str, attrs: Value) -> CseResult<()>;

    /// Delete (unannounce) the mirror `remote_ri` at `cse_id`.
    async fn delete(&self, cse_id: &str, remote_ri: &str) -> CseResult<()>;
}

/// Resolves a remote CSE-ID to the base URL used to reach it (its `poa`,
/// point of access). Populated from `<CSR>` resources by the dispatcher;
/// kept separate from `cse-storage::Store` per the §9 design note
/// preferring small lookup tables over a god storage trait.
#[derive(Clone, Default)]
pub struct RemoteCseDirectory {
    endpoints: Arc<DashMap<String, String>>,
}

impl RemoteCseDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, cse_id: impl Into<String>, base_url: impl Into<String>) {
        self.endpoints.insert(cse_id.into(), base_url.into());
    }

    pub fn endpoint(&self, cse_id: &str) -> Option<String> {
        self.endpoints.get(cse_id).map(|e| e.clone())
    }
}

/// `reqwest`-backed `RemoteCseClient`. Requests target
/// `<base-url>/<announced_type short name>` for create, and
/// `<base-url>/<remote_ri>` for update/delete.
pub struct HttpRemoteCseClient {
    client: reqwest::Client,
    directory: RemoteCseDirectory,
}

impl HttpRemoteCseClient {
    pub fn new(directory: RemoteCseDirectory) -> Self {
        Self {
            client: reqwest::Client::new(),
            directory,
        }
    }

    fn base_url(&self, cse_id: &str) -> CseResult<String> {
        self.directory
            .endpoint(cse_id)
            .ok_or_else(|| CseError::new(cse_core::rsc::ResponseStatusCode::TargetNotReachable, format!("no known point of access for '{cse_id}'")))
    }
}

#[async_trait]
impl RemoteCseClient for HttpRemoteCseClient {
    async fn create(&self, cse_id: &str, announced_type: &str, attrs: Value) -> CseResult<String> {
        let base = self.base_url(cse_id)?;
        let response = self
            .client
            .post(format!("{base}/{announced_type}"))
            .json(&attrs)
            .send()
            .await
            .map_err(|err| CseError::new(cse_core::rsc::ResponseStatusCode::TargetNotReachable, err.to_string()))?;
        if !response.status().is_success() {
            return Err(CseError::new(
                cse_core::rsc::ResponseStatusCode::OperationDeniedByRemoteEntity,
                format!("remote CSE rejected announce with status {}", response.status()),
            ));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|err| CseError::new(cse_core::rsc::ResponseStatusCode::TargetNotReachable, err.to_string()))?;
        body.get("ri")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CseError::internal("remote CSE response missing 'ri'"))
    }

    async fn update(&self, cse_id: &str, remote_ri: &str, attrs: Value) -> CseResult<()> {
        let base = self.base_url(cse_id)?;
        let response = self
            .client
            .put(format!("{base}/{remote_ri}"))
            .json(&attrs)
            .send()
            .await
            .map_err(|err| CseError::new(cse_core::rsc::ResponseStatusCode::TargetNotReachable, err.to_string()))?;
        if !response.status().is_success() {
            return Err(CseError::new(
                cse_core::rsc::ResponseStatusCode::OperationDeniedByRemoteEntity,
                format!("remote CSE rejected mirror update with status {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn delete(&self, cse_id: &str, remote_ri: &str) -> CseResult<()> {
        let base = self.base_url(cse_id)?;
        let response = self
            .client
            .delete(format!("{base}/{remote_ri}"))
            .send()
            .await
            .map_err(|err| CseError::new(cse_core::rsc::ResponseStatusCode::TargetNotReachable, err.to_string()))?;
        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(CseError::new(
                cse_core::rsc::ResponseStatusCode::OperationDeniedByRemoteEntity,
                format!("remote CSE rejected mirror delete with status {}", response.status()),
            ));
        }
        Ok(())
    }
}
