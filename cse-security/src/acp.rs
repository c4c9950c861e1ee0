//! `<ACP>` access-control-rule evaluation (§4.1 step 3, §7 GLOSSARY),
//! grounded on the reference CSE's `acr`/`acor`/`acop` rule shape (see
//! `original_source/tests/testPCH_PCU.py`, `testNTSR.py`).

use cse_model::Permission;
use serde_json::Value;

/// The originator wildcard meaning "any registered or unregistered
/// originator" (reference: `acor: ["all"]`).
pub const WILDCARD_ORIGINATOR: &str = "all";

/// A single access-control rule: a set of originators granted a set of
/// operations, optionally gated by a context (not modeled further here —
/// time-window/IP-range contexts are an Open Question, see DESIGN.md).
#[derive(Debug, Clone)]
pub struct AccessControlRule {
    pub originators: Vec<String>,
    pub operations: Permission,
}

impl AccessControlRule {
    pub fn grants(&self, originator: &str, required: Permission) -> bool {
        if !self.operations.contains(required) {
            return false;
        }
        self.originators
            .iter()
            .any(|o| o == WILDCARD_ORIGINATOR || o == originator)
    }
}

/// An ACP's two rule sets: `pv` (privileges, governs access to whatever
/// points `acpi` at this ACP) and `pvs` (self-privileges, governs access
/// to the ACP resource itself). `pvs` must be non-empty (§4.2 special
/// validation rule).
#[derive(Debug, Clone)]
pub struct AccessControlPolicy {
    pub ri: String,
    pub privileges: Vec<AccessControlRule>,
    pub self_privileges: Vec<AccessControlRule>,
}

impl AccessControlPolicy {
    pub fn allows(&self, originator: &str, required: Permission) -> bool {
        self.privileges
            .iter()
            .any(|rule| rule.grants(originator, required))
    }

    pub fn allows_self(&self, originator: &str, required: Permission) -> bool {
        self.self_privileges
            .iter()
            .any(|rule| rule.grants(originator, required))
    }

    /// Parse the `pv`/`pvs` attribute shape: `{"acr": [{"acor": [...], "acop": N}, ...]}`.
    pub fn parse_rule_set(value: &Value) -> Vec<AccessControlRule> {
        let Some(rules) = value.get("acr").and_then(Value::as_array) else {
            return Vec::new();
        };
        rules
            .iter()
            .filter_map(|rule| {
                let originators = rule
                    .get("acor")?
                    .as_array()?
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                let operations = rule.get("acop")?.as_i64()? as u8;
                Some(AccessControlRule {
                    originators,
                    operations: Permission(operations),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_originator_grants_to_anyone() {
        let rule = AccessControlRule {
            originators: vec![WILDCARD_ORIGINATOR.to_string()],
            operations: Permission::ALL,
        };
        assert!(rule.grants("CAnyone", Permission::RETRIEVE));
    }

    #[test]
    fn rule_denies_operation_not_in_mask() {
        let rule = AccessControlRule {
            originators: vec!["CAdmin".into()],
            operations: Permission::RETRIEVE,
        };
        assert!(!rule.grants("CAdmin", Permission::DELETE));
    }

    #[test]
    fn parse_rule_set_reads_acor_and_acop() {
        let pv = json!({
            "acr": [
                {"acor": ["CAdmin", "CSuper"], "acop": 63}
            ]
        });
        let rules = AccessControlPolicy::parse_rule_set(&pv);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].grants("CSuper", Permission::DELETE));
        assert!(!rules[0].grants("CStranger", Permission::DELETE));
    }
}
