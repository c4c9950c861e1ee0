//! Upper Tester hook (spec.md §1 lists the HTTP surface as out of scope;
//! SPEC_FULL.md §B keeps only its internal reset/expiration-shortening
//! behavior, the minimum an integration test driver needs). Grounded on
//! `cse-test::Harness::new` for the reset shape and on `CseConfig`'s
//! duration fields for what "shorten expirations" means in this
//! workspace: there is no wall-clock-faking here, only the default
//! `et`/`rqet` durations a fresh `<CSEBase>` hands out to children that
//! don't specify their own.

use std::sync::Arc;

use cse_core::config::CseConfig;
use tokio::sync::RwLock;

use crate::runtime::Runtime;

/// Holds the currently running `Runtime` and can replace it wholesale.
/// Not wired to any transport in this workspace; intended for an
/// in-process test driver to call directly, the way the reference CSE's
/// Upper Tester exposes `X-M2M-UTest: reset` to its HTTP test harness.
pub struct UpperTester {
    runtime: RwLock<Arc<Runtime>>,
    base_config: CseConfig,
}

impl UpperTester {
    /// Bootstrap the first runtime from `base_config` and hold it.
    pub async fn new(base_config: CseConfig) -> Self {
        let runtime = Runtime::bootstrap(base_config.clone()).await;
        Self { runtime: RwLock::new(Arc::new(runtime)), base_config }
    }

    /// Tear down all state and rebuild the CSE from scratch (fresh
    /// in-memory store, fresh `<CSEBase>`/`<ACP>`).
    pub async fn reset(&self) -> Arc<Runtime> {
        let fresh = Arc::new(Runtime::bootstrap(self.base_config.clone()).await);
        *self.runtime.write().await = fresh.clone();
        fresh
    }

    /// Shorten the default resource/request expiration durations applied
    /// to subsequently created resources, then reset so the new config
    /// takes effect. Used by expiry-sweep integration tests that don't
    /// want to wait a year for `et` to pass.
    pub async fn reset_with_short_expirations(&self, resource_secs: u64, request_secs: u64) -> Arc<Runtime> {
        let mut cfg = self.base_config.clone();
        cfg.default_resource_expiration = std::time::Duration::from_secs(resource_secs);
        cfg.default_request_expiration = std::time::Duration::from_secs(request_secs);
        let fresh = Arc::new(Runtime::bootstrap(cfg).await);
        *self.runtime.write().await = fresh.clone();
        fresh
    }

    pub async fn current(&self) -> Arc<Runtime> {
        self.runtime.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reset_replaces_the_runtime() {
        let ut = UpperTester::new(CseConfig::default()).await;
        let first = ut.current().await;
        let second = ut.reset().await;
        assert!(!Arc::ptr_eq(&first.store, &second.store));
    }

    #[tokio::test]
    async fn reset_with_short_expirations_updates_config() {
        let ut = UpperTester::new(CseConfig::default()).await;
        let runtime = ut.reset_with_short_expirations(5, 2).await;
        assert_eq!(runtime.config.default_resource_expiration, std::time::Duration::from_secs(5));
        assert_eq!(runtime.config.default_request_expiration, std::time::Duration::from_secs(2));
    }
}
