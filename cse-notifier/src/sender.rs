//! Transport-agnostic notification delivery, the seam between the
//! notifier's matching/batching logic and whatever carries a notification
//! to its target (reference: `NotificationManager._sendRequest`, which the
//! CSE routes through its CSE-internal request dispatch rather than a raw
//! HTTP client — transports are out of scope here, so this trait is the
//! boundary a server binary implements).

use async_trait::async_trait;
use cse_core::error::CseResult;
use serde_json::Value;

/// Outcome of a single delivery attempt, distinguishing the two failure
/// modes the reference remaps during blocking-update/-retrieve handshakes
/// (`TARGET_NOT_REACHABLE` vs `OPERATION_NOT_ALLOWED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    TargetNotReachable,
    OperationNotAllowed,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver `payload` (an `m2m:sgn` or `m2m:agn` envelope) to `uri`.
    async fn send(&self, uri: &str, payload: &Value) -> CseResult<DeliveryOutcome>;
}

/// Records every delivery attempt instead of sending anywhere, grounded on
/// the reference test suite's notification-server stub used across the
/// subscription/CRS test modules.
#[derive(Default)]
pub struct RecordingSender {
    sent: tokio::sync::Mutex<Vec<(String, Value)>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, uri: &str, payload: &Value) -> CseResult<DeliveryOutcome> {
        self.sent.lock().await.push((uri.to_string(), payload.clone()));
        Ok(DeliveryOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recording_sender_captures_every_call() {
        let sender = RecordingSender::new();
        sender.send("http://a", &json!({"m2m:sgn": {}})).await.unwrap();
        sender.send("http://b", &json!({"m2m:sgn": {}})).await.unwrap();
        assert_eq!(sender.sent().await.len(), 2);
    }
}
