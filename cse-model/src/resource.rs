//! The universal resource node (§3).

use crate::types::ResourceType;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// The universal resource node in the hierarchy (§3).
///
/// Common/universal attributes are strongly typed fields; type-specific
/// attributes live in `attrs` as a `shortName -> value` map (the design
/// note in `spec.md` §9 prefers the map representation at storage
/// boundaries and structs inside components — `attrs` *is* that storage
/// boundary representation; components that need typed access go through
/// `cse-model::policy`'s typed getters).
#[derive(Debug, Clone)]
pub struct Resource {
    pub ty: ResourceType,
    pub ri: String,
    pub pi: Option<String>,
    pub rn: String,
    pub srn: String,
    pub ct: DateTime<Utc>,
    pub lt: DateTime<Utc>,
    pub et: Option<DateTime<Utc>>,
    pub acpi: Option<Vec<String>>,
    pub lbl: Option<Vec<String>>,
    pub at: Option<Vec<String>>,
    pub aa: Option<Vec<String>>,
    pub cr: Option<String>,
    /// State tag, incremented on every successful update (§8).
    pub st: i64,
    /// Type-specific and any remaining universal/common attributes.
    pub attrs: Map<String, Value>,
}

impl Resource {
    pub fn new(ty: ResourceType, ri: String, pi: Option<String>, rn: String, srn: String) -> Self {
        let now = Utc::now();
        Self {
            ty,
            ri,
            pi,
            rn,
            srn,
            ct: now,
            lt: now,
            et: None,
            acpi: None,
            lbl: None,
            at: None,
            aa: None,
            cr: None,
            st: 0,
            attrs: Map::new(),
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.ty.is_virtual()
    }

    pub fn is_announced(&self) -> bool {
        self.at.as_ref().is_some_and(|at| !at.is_empty())
    }

    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        match name {
            "ri" | "pi" | "rn" | "ty" | "ct" | "lt" | "et" | "acpi" | "lbl" | "at" | "aa"
            | "cr" | "st" => true,
            other => self.attrs.contains_key(other),
        }
    }

    /// Touch `lt` and bump `st`, as every successful update must (§3, §8).
    pub fn touch(&mut self) {
        self.lt = Utc::now();
        self.st += 1;
    }

    /// Serialize the full resource (universal + common + specific attributes)
    /// into a flat JSON object keyed by short names, as the wire
    /// representation and the storage document both use (§6).
    pub fn to_document(&self) -> Value {
        let mut map = self.attrs.clone();
        map.insert("ty".to_string(), Value::from(self.ty as i32));
        map.insert("ri".to_string(), Value::from(self.ri.clone()));
        if let Some(pi) = &self.pi {
            map.insert("pi".to_string(), Value::from(pi.clone()));
        }
        map.insert("rn".to_string(), Value::from(self.rn.clone()));
        map.insert(
            "ct".to_string(),
            Value::from(cse_core::time::format_ts(self.ct)),
        );
        map.insert(
            "lt".to_string(),
            Value::from(cse_core::time::format_ts(self.lt)),
        );
        if let Some(et) = &self.et {
            map.insert("et".to_string(), Value::from(cse_core::time::format_ts(*et)));
        }
        if let Some(acpi) = &self.acpi {
            map.insert("acpi".to_string(), Value::from(acpi.clone()));
        }
        if let Some(lbl) = &self.lbl {
            map.insert("lbl".to_string(), Value::from(lbl.clone()));
        }
        if let Some(at) = &self.at {
            map.insert("at".to_string(), Value::from(at.clone()));
        }
        if let Some(aa) = &self.aa {
            map.insert("aa".to_string(), Value::from(aa.clone()));
        }
        if let Some(cr) = &self.cr {
            map.insert("cr".to_string(), Value::from(cr.clone()));
        }
        map.insert("st".to_string(), Value::from(self.st));
        Value::Object(map)
    }

    /// Names of attributes that differ between `self` and `other`, used to
    /// build the `modifiedAttributes` notification content (§4.3).
    pub fn diff_attribute_names(&self, previous: &Resource) -> Vec<String> {
        let mut names = Vec::new();
        for (k, v) in &self.attrs {
            if previous.attrs.get(k) != Some(v) {
                names.push(k.clone());
            }
        }
        for k in previous.attrs.keys() {
            if !self.attrs.contains_key(k) {
                names.push(k.clone());
            }
        }
        names
    }
}

/// Allowed child-resource types per parent type (§4.1 step 4), grounded on
/// each reference resource class's `_allowedChildResourceTypes`.
pub fn allowed_child_types(parent: ResourceType) -> &'static [ResourceType] {
    use ResourceType::*;
    match parent {
        CseBase => &[Acp, Ae, Cnt, Grp, Node, Pch, Csr, Sub, FlexContainer, Ts, Tsb, Sch],
        Ae => &[Acp, Cnt, Grp, Sub, FlexContainer, Ts, Actr],
        Cnt => &[Cnt, Cin, Sub, FlexContainer, Acp],
        Ts => &[Tsi, Sub, Actr],
        Grp => &[Sub],
        FlexContainer => &[FlexContainer, Sub, Acp],
        Node => &[Sub, Acp],
        Csr => &[Acp, Cnt, Grp, Sub, FlexContainer, Ts],
        Actr => &[Depr, Sub],
        Pch => &[],
        Sub | Crs => &[],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_bumps_state_tag_and_lt() {
        let mut r = Resource::new(ResourceType::Cnt, "ri1".into(), Some("pi1".into()), "cnt1".into(), "/cse-in/cnt1".into());
        let before = r.lt;
        std::thread::sleep(std::time::Duration::from_millis(2));
        r.touch();
        assert_eq!(r.st, 1);
        assert!(r.lt >= before);
    }

    #[test]
    fn diff_attribute_names_detects_added_changed_removed() {
        let mut a = Resource::new(ResourceType::Cnt, "ri1".into(), None, "c".into(), "/cse-in/c".into());
        a.set_attr("lbl_custom", Value::from("x"));
        a.set_attr("mni", Value::from(10));
        let mut b = a.clone();
        b.set_attr("mni", Value::from(20));
        b.attrs.remove("lbl_custom");
        b.set_attr("new_attr", Value::from(true));

        let diff = b.diff_attribute_names(&a);
        assert!(diff.contains(&"mni".to_string()));
        assert!(diff.contains(&"new_attr".to_string()));
        assert!(diff.contains(&"lbl_custom".to_string()));
    }

    #[test]
    fn allowed_child_types_for_cnt_excludes_ae() {
        let allowed = allowed_child_types(ResourceType::Cnt);
        assert!(allowed.contains(&ResourceType::Cin));
        assert!(!allowed.contains(&ResourceType::Ae));
    }
}
