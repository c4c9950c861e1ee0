//! The access-control guard the dispatcher calls into on every request
//! (§4.1 step 3): resolves the target's `acpi` list, evaluates each
//! referenced ACP's privileges, and caches the decision.

use crate::acp::AccessControlPolicy;
use crate::cache::{CacheKey, DecisionCache};
use cse_core::error::{CseError, CseResult};
use cse_model::{Permission, Resource};
use cse_storage::Store;
use std::sync::Arc;
use std::time::Duration;

/// Default decision-cache TTL (§4.1 step 3 is on the hot path of every
/// request; a short TTL keeps revoked privileges from lingering).
pub const DEFAULT_DECISION_TTL: Duration = Duration::from_secs(5);

pub struct SecurityGuard {
    store: Arc<dyn Store>,
    cache: DecisionCache,
}

impl SecurityGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cache: DecisionCache::new(DEFAULT_DECISION_TTL),
        }
    }

    /// Check whether `originator` may perform `required` on `target`.
    /// The CSE's admin originator (`target.cr` match, or a configured
    /// super-user) is not special-cased here; the reference implementation
    /// grants the creator full rights by always including them in `pvs`
    /// at creation time, which this engine evaluates the same as any other
    /// rule (§4.1 step 6 create branch).
    pub async fn check(
        &self,
        originator: &str,
        target: &Resource,
        required: Permission,
    ) -> CseResult<()> {
        let key = CacheKey::new(originator, &target.ri, required.0);
        if let Some(allowed) = self.cache.get(&key) {
            return if allowed {
                Ok(())
            } else {
                Err(CseError::no_privilege(format!(
                    "originator '{originator}' lacks required privilege on '{}'",
                    target.ri
                )))
            };
        }

        let allowed = self.evaluate(originator, target, required).await?;
        self.cache.set(key, allowed);
        if allowed {
            Ok(())
        } else {
            Err(CseError::no_privilege(format!(
                "originator '{originator}' lacks required privilege on '{}'",
                target.ri
            )))
        }
    }

    async fn evaluate(&self, originator: &str, target: &Resource, required: Permission) -> CseResult<bool> {
        let Some(acpi) = &target.acpi else {
            return Ok(false);
        };
        for acp_ri in acpi {
            let Some(acp_resource) = self.store.get_by_ri(acp_ri).await? else {
                continue;
            };
            let policy = parse_acp(&acp_resource);
            if policy.allows(originator, required) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Check access to an `<ACP>` resource itself: governed by the `pvs`
    /// rule set of the ACPs it is itself subject to, not the `pv` rule set
    /// it grants to others (§4.1 step 3 "target's creator for <ACP>
    /// itself"). Not cached — `<ACP>` access is rare enough that the extra
    /// cache bookkeeping isn't worth it.
    pub async fn check_self(
        &self,
        originator: &str,
        target: &Resource,
        required: Permission,
    ) -> CseResult<()> {
        let Some(acpi) = &target.acpi else {
            return Err(CseError::no_privilege(format!(
                "originator '{originator}' lacks required self-privilege on '{}'",
                target.ri
            )));
        };
        for acp_ri in acpi {
            let Some(acp_resource) = self.store.get_by_ri(acp_ri).await? else {
                continue;
            };
            let policy = parse_acp(&acp_resource);
            if policy.allows_self(originator, required) {
                return Ok(());
            }
        }
        Err(CseError::no_privilege(format!(
            "originator '{originator}' lacks required self-privilege on '{}'",
            target.ri
        )))
    }

    /// Invalidate cached decisions for a target whose `acpi` (or a
    /// referenced ACP) just changed.
    pub fn invalidate(&self, target_ri: &str) {
        self.cache.invalidate_target(target_ri);
    }
}

fn parse_acp(resource: &Resource) -> AccessControlPolicy {
    let pv = resource
        .get_attr("pv")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let pvs = resource
        .get_attr("pvs")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    AccessControlPolicy {
        ri: resource.ri.clone(),
        privileges: AccessControlPolicy::parse_rule_set(&pv),
        self_privileges: AccessControlPolicy::parse_rule_set(&pvs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_model::ResourceType;
    use cse_storage::InMemoryStore;
    use serde_json::json;

    fn acp_resource(ri: &str, originators: &[&str], operations: u8) -> Resource {
        let mut r = Resource::new(ResourceType::Acp, ri.to_string(), None, "acp1".into(), "/cse-in/acp1".into());
        r.set_attr(
            "pv",
            json!({"acr": [{"acor": originators, "acop": operations}]}),
        );
        r.set_attr(
            "pvs",
            json!({"acr": [{"acor": originators, "acop": 63}]}),
        );
        r
    }

    #[tokio::test]
    async fn grants_when_originator_listed_with_required_operation() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .insert_resource(acp_resource("acp1", &["CAdmin"], 2))
            .await
            .unwrap();
        let guard = SecurityGuard::new(store);

        let mut target = Resource::new(ResourceType::Cnt, "ri1".into(), None, "cnt1".into(), "/cse-in/cnt1".into());
        target.acpi = Some(vec!["acp1".into()]);

        assert!(guard.check("CAdmin", &target, Permission::RETRIEVE).await.is_ok());
    }

    #[tokio::test]
    async fn denies_when_no_acp_grants_the_operation() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .insert_resource(acp_resource("acp1", &["CAdmin"], 2))
            .await
            .unwrap();
        let guard = SecurityGuard::new(store);

        let mut target = Resource::new(ResourceType::Cnt, "ri1".into(), None, "cnt1".into(), "/cse-in/cnt1".into());
        target.acpi = Some(vec!["acp1".into()]);

        let err = guard
            .check("CAdmin", &target, Permission::DELETE)
            .await
            .unwrap_err();
        assert_eq!(err.rsc, cse_core::rsc::ResponseStatusCode::OriginatorHasNoPrivilege);
    }

    #[tokio::test]
    async fn no_acpi_denies_by_default() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let guard = SecurityGuard::new(store);
        let target = Resource::new(ResourceType::Cnt, "ri1".into(), None, "cnt1".into(), "/cse-in/cnt1".into());
        assert!(guard.check("CAdmin", &target, Permission::RETRIEVE).await.is_err());
    }
}
