//! Attribute-policy validation engine (§4.2), grounded on the reference
//! CSE's `acme/services/Validator.py`.

use crate::policy::{AttributeDataType, AttributePolicy, Optionality, PolicyRegistry};
use crate::types::ResourceType;
use cse_core::error::CseError;
use serde_json::{Map, Value};

/// Which operation the attribute set is being validated for, since
/// optionality differs by operation (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    Create,
    Update,
    Discovery,
}

/// Validates resource attribute sets against the registered attribute
/// policies (§4.2).
pub struct Validator {
    policies: PolicyRegistry,
}

impl Validator {
    pub fn new(policies: PolicyRegistry) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Validate an incoming attribute map for a resource of type `ty` in
    /// the given `context` (§4.1 step 5, §4.2).
    ///
    /// Checks, per attribute in the registry: mandatory-but-absent,
    /// not-permitted-but-present, and (if present) type compliance. Unknown
    /// attributes that carry no namespace prefix and are not in the
    /// registry are rejected; namespaced custom attributes (containing
    /// `:`) are passed through unchecked, as flexContainer specializations
    /// own their own attribute tables (§4.2).
    pub fn validate(
        &self,
        ty: ResourceType,
        attrs: &Map<String, Value>,
        context: ValidationContext,
    ) -> Result<(), CseError> {
        let policies = self.policies.attributes_for(ty);
        for policy in &policies {
            let present = attrs.contains_key(policy.short_name);
            let optionality = match context {
                ValidationContext::Create => policy.optional_create,
                ValidationContext::Update => policy.optional_update,
                ValidationContext::Discovery => policy.optional_discovery,
            };
            match (optionality, present) {
                (Optionality::M, false) => {
                    return Err(CseError::bad_request(format!(
                        "missing mandatory attribute '{}'",
                        policy.short_name
                    ))
                    .with_attribute(policy.short_name.to_string()));
                }
                (Optionality::Np, true) => {
                    return Err(CseError::bad_request(format!(
                        "attribute '{}' not permitted in this request",
                        policy.short_name
                    ))
                    .with_attribute(policy.short_name.to_string()));
                }
                _ => {}
            }
            if present {
                let value = &attrs[policy.short_name];
                self.validate_value(policy, value)?;
            }
        }

        for key in attrs.keys() {
            if key.contains(':') {
                continue;
            }
            if !policies.iter().any(|p| p.short_name == key) {
                return Err(CseError::bad_request(format!("unknown attribute '{key}'"))
                    .with_attribute(key.clone()));
            }
        }
        Ok(())
    }

    fn validate_value(&self, policy: &AttributePolicy, value: &Value) -> Result<(), CseError> {
        if type_matches(&policy.data_type, value) {
            return Ok(());
        }
        Err(CseError::bad_request(format!(
            "attribute '{}' has the wrong type",
            policy.short_name
        ))
        .with_attribute(policy.short_name.to_string()))
    }
}

fn type_matches(ty: &AttributeDataType, value: &Value) -> bool {
    use AttributeDataType::*;
    match ty {
        PositiveInteger => value.as_i64().is_some_and(|n| n > 0),
        NonNegativeInteger | UnsignedInt | UnsignedLong => value.as_i64().is_some_and(|n| n >= 0),
        Integer => value.is_i64() || value.is_u64(),
        Float => value.is_f64() || value.is_i64(),
        Boolean => value.is_boolean(),
        String => value.is_string(),
        AnyUri => value.as_str().is_some_and(is_valid_uri),
        Timestamp | AbsRelTimestamp => {
            value.as_str().is_some_and(|s| cse_core::time::parse_ts(s).is_some())
        }
        Duration => {
            value.as_str().is_some_and(|s| cse_core::time::parse_iso8601_duration(s).is_some())
        }
        Base64 => value.is_string(),
        GeoCoordinates => is_valid_geo_coordinates(value),
        Enum(_) => value.is_string() || value.is_i64(),
        List(inner) => value.as_array().is_some_and(|a| a.iter().all(|v| type_matches(inner, v))),
        ListNonEmpty(inner) => {
            value.as_array().is_some_and(|a| !a.is_empty() && a.iter().all(|v| type_matches(inner, v)))
        }
        Dict | Complex(_) => value.is_object(),
        Any => true,
    }
}

fn is_valid_uri(s: &str) -> bool {
    !s.is_empty() && (s.starts_with('/') || s.contains("://"))
}

/// GeoJSON-ish `{type, coordinates}` validation, grounded on the reference
/// CSE's geo-query support used by discovery (`geoQuery`).
fn is_valid_geo_coordinates(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let Some(kind) = obj.get("typ").and_then(Value::as_str) else {
        return false;
    };
    let Some(coordinates) = obj.get("crd") else {
        return false;
    };
    match kind {
        "Point" => coordinates.as_array().is_some_and(|c| c.len() == 2 && c.iter().all(Value::is_number)),
        "LineString" | "MultiPoint" => coordinates
            .as_array()
            .is_some_and(|points| points.iter().all(is_point_pair)),
        "Polygon" => coordinates.as_array().is_some_and(|rings| {
            rings.iter().all(|ring| {
                ring.as_array()
                    .is_some_and(|points| points.len() >= 4 && points.iter().all(is_point_pair))
            })
        }),
        _ => false,
    }
}

fn is_point_pair(value: &Value) -> bool {
    value.as_array().is_some_and(|p| p.len() == 2 && p.iter().all(Value::is_number))
}

/// Validates a oneM2M `<schedule>` entry string (`se`, §4.6). The reference
/// implementation accepts extended cron syntax with seconds; this parser
/// checks field count and per-field character set without pulling in a
/// full cron grammar (actual recurrence matching happens in
/// `cse-scheduler` via the `cron` crate).
pub fn validate_schedule_entry(entry: &str) -> bool {
    let fields: Vec<&str> = entry.split_whitespace().collect();
    if fields.len() != 6 && fields.len() != 7 {
        return false;
    }
    fields.iter().all(|f| {
        f.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '-' | '/'))
    })
}

/// Validates a `cnf` (contentInfo) value, formatted as
/// `media-type:encoding[:contentSecurity]` (§4.2).
pub fn validate_content_info(cnf: &str) -> bool {
    let parts: Vec<&str> = cnf.split(':').collect();
    matches!(parts.len(), 2 | 3) && !parts[0].is_empty() && parts[1].parse::<u32>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> PolicyRegistry {
        PolicyRegistry::bootstrap()
    }

    #[test]
    fn create_rejects_missing_mandatory_attribute() {
        let v = Validator::new(registry());
        let attrs = Map::new();
        let err = v
            .validate(ResourceType::Acp, &attrs, ValidationContext::Create)
            .unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("pv"));
    }

    #[test]
    fn create_accepts_well_typed_cnt_attributes() {
        let v = Validator::new(registry());
        let mut attrs = Map::new();
        attrs.insert("mni".into(), json!(50));
        assert!(v
            .validate(ResourceType::Cnt, &attrs, ValidationContext::Create)
            .is_ok());
    }

    #[test]
    fn create_rejects_wrong_typed_attribute() {
        let v = Validator::new(registry());
        let mut attrs = Map::new();
        attrs.insert("mni".into(), json!("not-a-number"));
        let err = v
            .validate(ResourceType::Cnt, &attrs, ValidationContext::Create)
            .unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("mni"));
    }

    #[test]
    fn unknown_unnamespaced_attribute_rejected() {
        let v = Validator::new(registry());
        let mut attrs = Map::new();
        attrs.insert("pv".into(), json!({}));
        attrs.insert("pvs".into(), json!({}));
        attrs.insert("bogus".into(), json!(1));
        let err = v
            .validate(ResourceType::Acp, &attrs, ValidationContext::Create)
            .unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("bogus"));
    }

    #[test]
    fn namespaced_custom_attribute_passes_through() {
        let v = Validator::new(registry());
        let mut attrs = Map::new();
        attrs.insert("pv".into(), json!({}));
        attrs.insert("pvs".into(), json!({}));
        attrs.insert("myorg:custom".into(), json!(42));
        assert!(v
            .validate(ResourceType::Acp, &attrs, ValidationContext::Create)
            .is_ok());
    }

    #[test]
    fn schedule_entry_accepts_six_and_seven_fields() {
        assert!(validate_schedule_entry("* * * * * *"));
        assert!(validate_schedule_entry("0 0 12 * * ? 2030"));
        assert!(!validate_schedule_entry("not a schedule"));
    }

    #[test]
    fn content_info_requires_numeric_encoding() {
        assert!(validate_content_info("text/plain:0"));
        assert!(!validate_content_info("text/plain:abc"));
    }

    #[test]
    fn geo_point_and_polygon_validate_shape() {
        assert!(is_valid_geo_coordinates(&json!({"typ": "Point", "crd": [1.0, 2.0]})));
        assert!(is_valid_geo_coordinates(
            &json!({"typ": "Polygon", "crd": [[[0.0,0.0],[0.0,1.0],[1.0,1.0],[0.0,0.0]]]})
        ));
        assert!(!is_valid_geo_coordinates(&json!({"typ": "Point", "crd": [1.0]})));
    }
}
