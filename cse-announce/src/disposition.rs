//! Attribute-subset selection for announced mirrors (§4.5 paragraph 1),
//! grounded on the reference CSE's `Announcer._announcedAttributes`, which
//! walks a resource's attribute policy table and keeps `MA` attributes plus
//! any `OA` attribute named in `aa`.

use cse_model::{AnnounceDisposition, PolicyRegistry, ResourceType};
use serde_json::{Map, Value};

/// Select the subset of `attrs` that should be mirrored: every `MA`
/// attribute, plus `OA` attributes named in `aa`. `NA` attributes and
/// attributes with no known policy are never mirrored.
pub fn select_announced_attributes(
    ty: ResourceType,
    attrs: &Map<String, Value>,
    policies: &PolicyRegistry,
    aa: &[String],
) -> Map<String, Value> {
    let mut selected = Map::new();
    for (name, value) in attrs {
        let Some(policy) = policies.policy_for(ty, name) else {
            continue;
        };
        let include = match policy.announce {
            AnnounceDisposition::Ma => true,
            AnnounceDisposition::Oa => aa.iter().any(|a| a == name),
            AnnounceDisposition::Na => false,
        };
        if include {
            selected.insert(name.clone(), value.clone());
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mandatory_attributes_are_always_selected() {
        let policies = PolicyRegistry::bootstrap();
        let mut attrs = Map::new();
        attrs.insert("ct".into(), json!("20260101T000000"));
        let selected = select_announced_attributes(ResourceType::Ae, &attrs, &policies, &[]);
        assert!(selected.contains_key("ct"));
    }

    #[test]
    fn optional_attributes_need_opt_in_via_aa() {
        let policies = PolicyRegistry::bootstrap();
        let mut attrs = Map::new();
        attrs.insert("lbl".into(), json!(["a", "b"]));
        let without = select_announced_attributes(ResourceType::Ae, &attrs, &policies, &[]);
        assert!(!without.contains_key("lbl"));
        let with = select_announced_attributes(ResourceType::Ae, &attrs, &policies, &["lbl".to_string()]);
        assert!(with.contains_key("lbl"));
    }

    #[test]
    fn never_announced_attributes_are_dropped() {
        let policies = PolicyRegistry::bootstrap();
        let mut attrs = Map::new();
        attrs.insert("ri".into(), json!("C123"));
        let selected = select_announced_attributes(ResourceType::Ae, &attrs, &policies, &["ri".to_string()]);
        assert!(!selected.contains_key("ri"));
    }
}
