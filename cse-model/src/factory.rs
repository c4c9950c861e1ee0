//! Per-resource-type lifecycle hooks invoked by the dispatcher around
//! create/update/deactivate (§4.1 step 6, §4.6), grounded on the reference
//! CSE's `activate`/`update`/`deactivate` methods on individual resource
//! classes, most notably `acme/resources/ACTR.py` and
//! `acme/resources/DEPR.py`.
//!
//! The dispatcher owns storage and originator context; this module stays
//! storage-agnostic by going through the `ResourceAccessor` seam instead of
//! depending on `cse-storage` directly (§9 design note: explicit lookup
//! tables/trait seams over cyclic crate dependencies).

use crate::types::EvalMode;
use cse_core::error::CseError;
use serde_json::{Map, Value};

/// What the factory needs to know about sibling/referenced resources
/// without depending on the storage crate.
pub trait ResourceAccessor {
    fn resource_exists(&self, ri: &str) -> bool;
    fn has_attribute(&self, ri: &str, attribute: &str) -> bool;
}

/// Validate an `<ACTR>` resource at creation or update time (reference:
/// `ACTR.activate`/`ACTR.update`).
///
/// - `evm` (evalMode) must be present whenever `ecp` is present and vice
///   versa (coupling invariant).
/// - `sbjt` must name an attribute that exists on the CSE itself (subject
///   of the evaluation criteria).
/// - `apv.fr`, if present, must equal the requesting originator — an
///   action cannot impersonate another originator.
pub fn validate_actr(
    attrs: &Map<String, Value>,
    originator: &str,
    _accessor: &dyn ResourceAccessor,
) -> Result<(), CseError> {
    let has_evm = attrs.contains_key("evm");
    let has_ecp = attrs.contains_key("ecp");
    if has_evm != has_ecp {
        return Err(
            CseError::bad_request("'evm' and 'ecp' must be present together").with_attribute("evm")
        );
    }
    if let Some(evm) = attrs.get("evm").and_then(Value::as_i64) {
        if !matches!(evm, 0..=3) {
            return Err(CseError::bad_request("invalid evalMode value").with_attribute("evm"));
        }
        if evm == EvalMode::Off as i64 && has_ecp {
            return Err(
                CseError::bad_request("evalMode 'off' must not carry evalCriteria")
                    .with_attribute("ecp"),
            );
        }
    }

    // `sbjt` names an attribute on the subject resource (the ACTR's parent),
    // not a resource ID, so existence is checked by the dispatcher against
    // the parent's attribute set once it is dereferenced.
    if let Some(sbjt) = attrs.get("sbjt").and_then(Value::as_str) {
        if sbjt.is_empty() {
            return Err(CseError::bad_request("'sbjt' must not be empty").with_attribute("sbjt"));
        }
    }

    check_action_originator(attrs, originator)
}

/// Validate a `<DEPR>` resource at creation or update time (reference:
/// `DEPR.activate`/`DEPR.update`).
///
/// - `rri` must reference an existing, accessible resource.
/// - `evc.sbjt` must name an attribute that exists on that resource.
pub fn validate_depr(
    attrs: &Map<String, Value>,
    originator: &str,
    accessor: &dyn ResourceAccessor,
) -> Result<(), CseError> {
    let rri = attrs
        .get("rri")
        .and_then(Value::as_str)
        .ok_or_else(|| CseError::bad_request("missing mandatory attribute 'rri'").with_attribute("rri"))?;
    if !accessor.resource_exists(rri) {
        return Err(CseError::not_found(format!("referenced resource '{rri}' does not exist"))
            .with_attribute("rri"));
    }

    if let Some(evc) = attrs.get("evc").and_then(Value::as_object) {
        if let Some(sbjt) = evc.get("sbjt").and_then(Value::as_str) {
            if !accessor.has_attribute(rri, sbjt) {
                return Err(CseError::bad_request(format!(
                    "referenced resource has no attribute '{sbjt}'"
                ))
                .with_attribute("evc"));
            }
        } else {
            return Err(CseError::bad_request("'evc' missing 'sbjt'").with_attribute("evc"));
        }
    }

    check_action_originator(attrs, originator)
}

fn check_action_originator(attrs: &Map<String, Value>, originator: &str) -> Result<(), CseError> {
    if let Some(apv) = attrs.get("apv").and_then(Value::as_object) {
        if let Some(fr) = apv.get("fr").and_then(Value::as_str) {
            if fr != originator {
                return Err(CseError::bad_request(
                    "'apv.fr' must equal the requesting originator",
                )
                .with_attribute("apv"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    struct FakeAccessor {
        resources: HashSet<&'static str>,
        attributes: HashSet<(&'static str, &'static str)>,
    }

    impl ResourceAccessor for FakeAccessor {
        fn resource_exists(&self, ri: &str) -> bool {
            self.resources.contains(ri)
        }

        fn has_attribute(&self, ri: &str, attribute: &str) -> bool {
            self.attributes
                .iter()
                .any(|(r, a)| *r == ri && *a == attribute)
        }
    }

    #[test]
    fn actr_requires_evm_and_ecp_together() {
        let accessor = FakeAccessor {
            resources: HashSet::new(),
            attributes: HashSet::new(),
        };
        let mut attrs = Map::new();
        attrs.insert("evm".into(), json!(1));
        let err = validate_actr(&attrs, "CAdmin", &accessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("evm"));
    }

    #[test]
    fn actr_rejects_apv_fr_mismatch() {
        let accessor = FakeAccessor {
            resources: HashSet::new(),
            attributes: HashSet::new(),
        };
        let mut attrs = Map::new();
        attrs.insert("apv".into(), json!({"fr": "CSomeoneElse"}));
        let err = validate_actr(&attrs, "CAdmin", &accessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("apv"));
    }

    #[test]
    fn depr_rejects_missing_referenced_resource() {
        let accessor = FakeAccessor {
            resources: HashSet::new(),
            attributes: HashSet::new(),
        };
        let mut attrs = Map::new();
        attrs.insert("rri".into(), json!("cnt123"));
        let err = validate_depr(&attrs, "CAdmin", &accessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("rri"));
    }

    #[test]
    fn depr_rejects_sbjt_not_on_referenced_resource() {
        let mut resources = HashSet::new();
        resources.insert("cnt123");
        let accessor = FakeAccessor {
            resources,
            attributes: HashSet::new(),
        };
        let mut attrs = Map::new();
        attrs.insert("rri".into(), json!("cnt123"));
        attrs.insert("evc".into(), json!({"sbjt": "cbs", "thld": 1000, "optr": 3}));
        let err = validate_depr(&attrs, "CAdmin", &accessor).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("evc"));
    }

    #[test]
    fn depr_accepts_valid_reference_and_subject() {
        let mut resources = HashSet::new();
        resources.insert("cnt123");
        let mut attributes = HashSet::new();
        attributes.insert(("cnt123", "cbs"));
        let accessor = FakeAccessor {
            resources,
            attributes,
        };
        let mut attrs = Map::new();
        attrs.insert("rri".into(), json!("cnt123"));
        attrs.insert("evc".into(), json!({"sbjt": "cbs", "thld": 1000, "optr": 3}));
        assert!(validate_depr(&attrs, "CAdmin", &accessor).is_ok());
    }
}
