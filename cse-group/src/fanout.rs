//! `fopt` fan-out routing and response aggregation (§4.4 paragraphs 1-3),
//! grounded on the reference CSE's `GroupManager.fopt_handleNotification`-
//! style fan-out switch (`CRUD` request replicated to each `mid`).
//!
//! Fan-out needs to recursively dispatch a sub-request per member, but the
//! actual dispatcher depends on this crate for group handling — routing
//! both ways would be cyclic. The `MemberDispatcher` seam (mirrors
//! `cse-notifier::NotificationSender`) lets the dispatcher hand this crate a
//! callback instead.

use async_trait::async_trait;
use cse_core::rsc::ResponseStatusCode;
use cse_model::Operation;
use serde_json::{json, Value};

/// A single member's outcome, as returned by `MemberDispatcher::dispatch`.
#[derive(Debug, Clone)]
pub struct MemberOutcome {
    pub rsc: ResponseStatusCode,
    pub rqi: String,
    pub pc: Option<Value>,
}

/// Callback the dispatcher implements so this crate can replay an operation
/// against one member without depending on `cse-dispatcher`.
#[async_trait]
pub trait MemberDispatcher: Send + Sync {
    /// Dispatch `op` against `target` (the member's URI with `suffix`
    /// already appended) on behalf of `originator`, carrying `payload`.
    async fn dispatch(
        &self,
        target: &str,
        op: Operation,
        originator: &str,
        payload: Option<Value>,
    ) -> MemberOutcome;
}

/// Fan a single operation out to every member of `mid`, appending `suffix`
/// (e.g. `la`/`ol`, or nothing) to each member's target path, and aggregate
/// the results into `{m2m:agr: {m2m:rsp: [...]}}` (§4.4 paragraph 2-3).
///
/// Overall `rsc` is always `Ok`; per-member failures live in their own
/// `m2m:rsp` entry. Members that are themselves groups are expected to
/// recurse through their own `fopt` inside the `MemberDispatcher`
/// implementation — this function only replicates one level.
pub async fn fan_out(
    mid: &[String],
    suffix: Option<&str>,
    op: Operation,
    originator: &str,
    payload: Option<Value>,
    dispatcher: &dyn MemberDispatcher,
) -> Value {
    let mut responses = Vec::with_capacity(mid.len());
    for member in mid {
        let target = match suffix {
            Some(s) if !s.is_empty() => format!("{member}/{s}"),
            _ => member.clone(),
        };
        let outcome = dispatcher.dispatch(&target, op, originator, payload.clone()).await;
        responses.push(json!({
            "rsc": outcome.rsc as i32,
            "rqi": outcome.rqi,
            "pc": outcome.pc,
            "to": target,
        }));
    }

    json!({
        "m2m:agr": {
            "m2m:rsp": responses,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingDispatcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MemberDispatcher for RecordingDispatcher {
        async fn dispatch(&self, target: &str, _op: Operation, _originator: &str, payload: Option<Value>) -> MemberOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MemberOutcome {
                rsc: ResponseStatusCode::Created,
                rqi: format!("rqi-{target}"),
                pc: payload,
            }
        }
    }

    #[tokio::test]
    async fn fans_out_to_every_member_and_appends_suffix() {
        let dispatcher = RecordingDispatcher { calls: AtomicUsize::new(0) };
        let payload = json!({"con": "aValue"});
        let result = fan_out(
            &["cnt1".to_string(), "cnt2".to_string()],
            None,
            Operation::Create,
            "CAdmin",
            Some(payload.clone()),
            &dispatcher,
        )
        .await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 2);
        let entries = result["m2m:agr"]["m2m:rsp"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["rsc"], json!(ResponseStatusCode::Created as i32));
        assert_eq!(entries[0]["pc"], payload);
    }

    #[tokio::test]
    async fn overall_status_stays_ok_even_on_member_failure() {
        struct FailingDispatcher;
        #[async_trait]
        impl MemberDispatcher for FailingDispatcher {
            async fn dispatch(&self, target: &str, _op: Operation, _originator: &str, _payload: Option<Value>) -> MemberOutcome {
                MemberOutcome {
                    rsc: ResponseStatusCode::NotFound,
                    rqi: format!("rqi-{target}"),
                    pc: None,
                }
            }
        }

        let result = fan_out(
            &["cnt1".to_string()],
            Some("la"),
            Operation::Retrieve,
            "CAdmin",
            None,
            &FailingDispatcher,
        )
        .await;

        let entries = result["m2m:agr"]["m2m:rsp"].as_array().unwrap();
        assert_eq!(entries[0]["to"], json!("cnt1/la"));
        assert_eq!(entries[0]["rsc"], json!(ResponseStatusCode::NotFound as i32));
    }
}
