//! `<PCH>/pcu` polling-channel handshake (§3, §4.1 "virtual children"): an
//! AE behind a firewall retrieves requests queued for it by blocking on
//! `pcu` instead of exposing a `poa` the CSE can reach. Grounded on the
//! reference CSE's `PCH`/`PollingChannelWorker` queue-per-channel
//! design, trimmed to the request/response primitive this workspace
//! carries instead of a full transport binding.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::request::Request;

const QUEUE_DEPTH: usize = 32;

/// One pending request queued for a `<PCH>`'s owning AE to pick up.
#[derive(Clone)]
pub struct QueuedRequest {
    pub request: Request,
}

/// Per-`<PCH>` request queues, keyed by the channel resource's `ri`.
#[derive(Default)]
pub struct PollingChannelRegistry {
    channels: DashMap<String, mpsc::Sender<QueuedRequest>>,
    receivers: DashMap<String, tokio::sync::Mutex<mpsc::Receiver<QueuedRequest>>>,
}

impl PollingChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) the queue for `pch_ri`. Called when a `<PCH>` is
    /// created.
    pub fn open(&self, pch_ri: &str) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        self.channels.insert(pch_ri.to_string(), tx);
        self.receivers.insert(pch_ri.to_string(), tokio::sync::Mutex::new(rx));
    }

    pub fn close(&self, pch_ri: &str) {
        self.channels.remove(pch_ri);
        self.receivers.remove(pch_ri);
    }

    /// Queue `request` for `pch_ri`'s owner to retrieve via `pcu`. Returns
    /// `false` if the channel isn't open or is full.
    pub fn enqueue(&self, pch_ri: &str, request: Request) -> bool {
        let Some(tx) = self.channels.get(pch_ri) else {
            return false;
        };
        tx.try_send(QueuedRequest { request }).is_ok()
    }

    /// Block up to `wait` for the next queued request on `pch_ri`'s `pcu`.
    pub async fn retrieve(&self, pch_ri: &str, wait: Duration) -> Option<QueuedRequest> {
        let receiver = self.receivers.get(pch_ri)?;
        let mut guard = receiver.lock().await;
        timeout(wait, guard.recv()).await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_model::Operation;

    #[tokio::test]
    async fn retrieve_returns_what_was_enqueued() {
        let registry = PollingChannelRegistry::new();
        registry.open("pch1");
        let req = Request::new(Operation::Retrieve, "/cse-in/ae1/cnt1", "CAdmin", "rqi1");
        assert!(registry.enqueue("pch1", req));

        let queued = registry.retrieve("pch1", Duration::from_millis(100)).await.unwrap();
        assert_eq!(queued.request.request_id, "rqi1");
    }

    #[tokio::test]
    async fn retrieve_times_out_when_nothing_queued() {
        let registry = PollingChannelRegistry::new();
        registry.open("pch1");
        assert!(registry.retrieve("pch1", Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn enqueue_fails_for_unopened_channel() {
        let registry = PollingChannelRegistry::new();
        let req = Request::new(Operation::Retrieve, "/cse-in/ae1", "CAdmin", "rqi1");
        assert!(!registry.enqueue("missing", req));
    }
}
