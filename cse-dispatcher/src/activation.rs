//! Resource-specific activation hooks run after attribute validation but
//! before commit (§4.1 step 5). Most resource types need nothing beyond
//! the generic attribute-policy pass; the few that carry cross-attribute
//! or cross-resource invariants are handled here, delegating to
//! `cse-model::factory` for `<ACTR>`/`<DEPR>` and checking the remaining
//! invariants locally.

use cse_core::error::{CseError, CseResult};
use cse_model::factory::{self, ResourceAccessor};
use cse_model::ResourceType;
use serde_json::{Map, Value};

/// Run the activation hook for `ty`, if any. `accessor` resolves sibling
/// attribute existence for the types that need it (`<DEPR>`'s `rri`).
pub fn activate(
    ty: ResourceType,
    attrs: &Map<String, Value>,
    originator: &str,
    accessor: &dyn ResourceAccessor,
) -> CseResult<()> {
    match ty {
        ResourceType::Actr => factory::validate_actr(attrs, originator, accessor).map_err(Into::into),
        ResourceType::Depr => factory::validate_depr(attrs, originator, accessor).map_err(Into::into),
        ResourceType::Ts => validate_ts(attrs),
        ResourceType::Acp => validate_acp(attrs),
        _ => Ok(()),
    }
}

/// `<TS>` invariant: `mdt` (missingDataDetectTime) requires `pei`
/// (periodicInterval) to be present, and the detection window must not
/// exceed half the nominal period or every sample would trip it.
fn validate_ts(attrs: &Map<String, Value>) -> CseResult<()> {
    let Some(mdt) = attrs.get("mdt").and_then(Value::as_i64) else {
        return Ok(());
    };
    let pei = attrs
        .get("pei")
        .and_then(Value::as_i64)
        .ok_or_else(|| CseError::bad_request("'mdt' requires 'pei' to be set").with_attribute("mdt"))?;
    if mdt > pei / 2 {
        return Err(
            CseError::bad_request("'mdt' must not exceed half of 'pei'").with_attribute("mdt"),
        );
    }
    Ok(())
}

/// `<ACP>` invariant: both `pv` and `pvs` must carry at least one rule, or
/// the policy can never grant anyone access (reference: `ACP.activate`
/// rejects an empty `acr` list the same way).
fn validate_acp(attrs: &Map<String, Value>) -> CseResult<()> {
    for attribute in ["pv", "pvs"] {
        let rules_empty = attrs
            .get(attribute)
            .and_then(|v| v.get("acr"))
            .and_then(Value::as_array)
            .map_or(true, |acr| acr.is_empty());
        if rules_empty {
            return Err(
                CseError::bad_request(format!("'{attribute}.acr' must not be empty")).with_attribute(attribute),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    struct NoopAccessor;
    impl ResourceAccessor for NoopAccessor {
        fn resource_exists(&self, _ri: &str) -> bool {
            false
        }
        fn has_attribute(&self, _ri: &str, _attribute: &str) -> bool {
            false
        }
    }

    #[test]
    fn ts_rejects_mdt_without_pei() {
        let mut attrs = Map::new();
        attrs.insert("mdt".into(), json!(5));
        let err = activate(ResourceType::Ts, &attrs, "CAdmin", &NoopAccessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("mdt"));
    }

    #[test]
    fn ts_rejects_mdt_over_half_of_pei() {
        let mut attrs = Map::new();
        attrs.insert("pei".into(), json!(100));
        attrs.insert("mdt".into(), json!(60));
        let err = activate(ResourceType::Ts, &attrs, "CAdmin", &NoopAccessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("mdt"));
    }

    #[test]
    fn ts_accepts_mdt_within_half_of_pei() {
        let mut attrs = Map::new();
        attrs.insert("pei".into(), json!(100));
        attrs.insert("mdt".into(), json!(40));
        assert!(activate(ResourceType::Ts, &attrs, "CAdmin", &NoopAccessor).is_ok());
    }

    #[test]
    fn acp_rejects_empty_privilege_rules() {
        let mut attrs = Map::new();
        attrs.insert("pv".into(), json!({"acr": []}));
        attrs.insert("pvs".into(), json!({"acr": [{"acor": ["CAdmin"], "acop": 63}]}));
        let err = activate(ResourceType::Acp, &attrs, "CAdmin", &NoopAccessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("pv"));
    }

    #[test]
    fn acp_accepts_nonempty_privileges() {
        let mut attrs = Map::new();
        let rule = json!({"acr": [{"acor": ["CAdmin"], "acop": 63}]});
        attrs.insert("pv".into(), rule.clone());
        attrs.insert("pvs".into(), rule);
        assert!(activate(ResourceType::Acp, &attrs, "CAdmin", &NoopAccessor).is_ok());
    }

    #[test]
    fn other_types_have_no_activation_hook() {
        let attrs = Map::new();
        let _ = HashSet::<&str>::new();
        assert!(activate(ResourceType::Cnt, &attrs, "CAdmin", &NoopAccessor).is_ok());
    }
}
