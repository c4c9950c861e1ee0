//! Cross-CSE request forwarding (§4.1 step 1 "Route cross-CSE requests"),
//! grounded on `cse-announce::remote`'s `RemoteCseClient`/`RemoteCseDirectory`
//! split — the same outbound-transport seam, applied to whole requests
//! instead of announce create/update/delete payloads.

use async_trait::async_trait;
use cse_announce::RemoteCseDirectory;
use cse_core::error::{CseError, CseResult};
use cse_core::rsc::ResponseStatusCode;
use cse_model::Operation;
use serde_json::Value;

use crate::request::{Request, Response};

/// Outbound transport the dispatcher forwards a whole request through when
/// its `to` names a different CSE-ID (§4.1 step 1).
#[async_trait]
pub trait CseForwarder: Send + Sync {
    async fn forward(&self, cse_id: &str, request: &Request) -> CseResult<Response>;
}

fn op_method(op: Operation) -> &'static str {
    match op {
        Operation::Create => "POST",
        Operation::Retrieve | Operation::Discovery => "GET",
        Operation::Update => "PUT",
        Operation::Delete => "DELETE",
        Operation::Notify => "POST",
    }
}

/// `reqwest`-backed forwarder, resolving the target CSE-ID's point of
/// access through a [`RemoteCseDirectory`] the same way `HttpRemoteCseClient`
/// does for announcements.
pub struct HttpCseForwarder {
    client: reqwest::Client,
    directory: RemoteCseDirectory,
}

impl HttpCseForwarder {
    pub fn new(directory: RemoteCseDirectory) -> Self {
        Self {
            client: reqwest::Client::new(),
            directory,
        }
    }
}

#[async_trait]
impl CseForwarder for HttpCseForwarder {
    async fn forward(&self, cse_id: &str, request: &Request) -> CseResult<Response> {
        let base = self
            .directory
            .endpoint(cse_id)
            .ok_or_else(|| CseError::new(ResponseStatusCode::TargetNotReachable, format!("no known point of access for '{cse_id}'")))?;

        let mut builder = self
            .client
            .request(op_method(request.op).parse().expect("static method literal"), format!("{base}{}", request.to))
            .header("X-M2M-Origin", &request.originator)
            .header("X-M2M-RI", &request.request_id);
        if let Some(content) = &request.content {
            builder = builder.json(content);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| CseError::new(ResponseStatusCode::TargetNotReachable, err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or(Value::Null);

        let rsc = if status.is_success() {
            match request.op {
                Operation::Create => ResponseStatusCode::Created,
                Operation::Delete => ResponseStatusCode::Deleted,
                Operation::Update => ResponseStatusCode::Updated,
                _ => ResponseStatusCode::Ok,
            }
        } else {
            ResponseStatusCode::OperationDeniedByRemoteEntity
        };

        Ok(Response::success(rsc, request.request_id.clone(), Some(body), request.to.clone()))
    }
}

/// Forwarder for single-node deployments with no remote CSEs registered:
/// every forward attempt fails with `TargetNotReachable`, the same outcome
/// an empty [`RemoteCseDirectory`] would produce.
pub struct UnreachableForwarder;

#[async_trait]
impl CseForwarder for UnreachableForwarder {
    async fn forward(&self, cse_id: &str, _request: &Request) -> CseResult<Response> {
        Err(CseError::new(
            ResponseStatusCode::TargetNotReachable,
            format!("no remote CSE forwarding configured for '{cse_id}'"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubForwarder;

    #[async_trait]
    impl CseForwarder for StubForwarder {
        async fn forward(&self, cse_id: &str, request: &Request) -> CseResult<Response> {
            Ok(Response::success(
                ResponseStatusCode::Ok,
                request.request_id.clone(),
                Some(serde_json::json!({ "cse_id": cse_id })),
                request.to.clone(),
            ))
        }
    }

    #[tokio::test]
    async fn stub_forwarder_round_trips_request_id() {
        let forwarder = StubForwarder;
        let req = Request::new(Operation::Retrieve, "/otherCSE/ae1", "CAdmin", "rqi1");
        let resp = forwarder.forward("otherCSE", &req).await.unwrap();
        assert_eq!(resp.request_id, "rqi1");
    }
}
