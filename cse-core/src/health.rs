//! Liveness/readiness snapshot and the `statistics` singleton table (§6, §A.5).
//!
//! Transport-neutral: produces a serializable snapshot that a transport
//! adapter (out of scope here) turns into `GET /health` / `GET /health/ready`.

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down(String),
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

/// A named health indicator, analogous to the teacher's `HealthIndicator`
/// trait, generalized away from an HTTP response type.
pub trait HealthIndicator: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn check(&self) -> impl Future<Output = HealthStatus> + Send;
    /// Whether this check affects readiness (vs. liveness-only).
    fn affects_readiness(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub checks: Vec<(String, HealthStatus)>,
}

/// The oneM2M `statistics` singleton table (§6): running counters updated
/// by the dispatcher, notifier, and scheduler as they operate.
#[derive(Default)]
pub struct Statistics {
    resource_count: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    retrieves: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    expired: AtomicU64,
}

impl Statistics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_create(&self) {
        self.creates.fetch_add(1, Ordering::Relaxed);
        self.resource_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retrieve(&self) {
        self.retrieves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.resource_count.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            resource_count: self.resource_count.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            retrieves: self.retrieves.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub resource_count: u64,
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub retrieves: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_delete_nets_to_zero_resources() {
        let stats = Statistics::new();
        stats.record_create();
        stats.record_create();
        stats.record_delete();
        let snap = stats.snapshot();
        assert_eq!(snap.resource_count, 1);
        assert_eq!(snap.creates, 2);
        assert_eq!(snap.deletes, 1);
    }

    #[test]
    fn notification_counters_are_independent() {
        let stats = Statistics::new();
        stats.record_notification_sent();
        stats.record_notification_sent();
        stats.record_notification_failed();
        let snap = stats.snapshot();
        assert_eq!(snap.notifications_sent, 2);
        assert_eq!(snap.notifications_failed, 1);
    }
}
