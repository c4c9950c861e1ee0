//! The notifier's working view of a `<sub>` resource (§4.3), parsed out of
//! the generic attribute map once and kept in the `SubscriptionRegistry`
//! rather than re-parsed on every event, grounded on the reference CSE's
//! internal "subscription" storage document (as opposed to the `<sub>`
//! resource itself — see `NotificationManager.checkSubscriptions`'s
//! comment on this distinction).

use cse_model::{NotificationContentType, NotificationEventType, Resource, ResourceType};
use serde_json::Value;

/// `bn` — batch notification policy.
#[derive(Debug, Clone)]
pub struct BatchPolicy {
    pub duration_secs: f64,
    pub max_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub ri: String,
    pub parent_ri: String,
    pub notification_uris: Vec<String>,
    pub content_type: NotificationContentType,
    pub event_types: Vec<NotificationEventType>,
    /// `enc/chty` — restrict createDirectChild/deleteDirectChild to these types.
    pub child_types: Option<Vec<ResourceType>>,
    /// `enc/atr` — restrict resourceUpdate notifications to these attributes.
    pub attributes: Option<Vec<String>>,
    pub batch: Option<BatchPolicy>,
    /// `ln` — latest-notify: batch flush sends only the newest entry.
    pub latest_notify: bool,
    pub expiration_counter: Option<i64>,
    pub creator: Option<String>,
    pub subscriber_uri: Option<String>,
    pub associated_crs: Vec<String>,
    /// `mdn` — missingDataMaxNr: how many accumulated missing `<TSI>`s the
    /// `<TS>` monitor must see before firing `ReportOnGeneratedMissingDataPoints`.
    pub missing_data_threshold: Option<u64>,
}

impl SubscriptionConfig {
    /// Parse a `<sub>` resource into its notifier-facing configuration.
    /// Returns `None` if mandatory fields (`nu`, `nct`) are missing —
    /// the validator should already have rejected such a resource, so
    /// this is a defensive parse, not a second validation pass.
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        let parent_ri = resource.pi.clone()?;
        let notification_uris = string_list(resource.get_attr("nu")?)?;
        let content_type = resource
            .get_attr("nct")
            .and_then(Value::as_i64)
            .and_then(content_type_from_i64)?;

        let enc = resource.get_attr("enc");
        let event_types = enc
            .and_then(|enc| enc.get("net"))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_i64().and_then(event_type_from_i64)).collect())
            .unwrap_or_else(|| vec![NotificationEventType::ResourceUpdate]);

        let child_types = enc
            .and_then(|enc| enc.get("chty"))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_i64()).filter_map(resource_type_from_i64).collect());

        let attributes = enc
            .and_then(|enc| enc.get("atr"))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());

        let missing_data_threshold = enc
            .and_then(|enc| enc.get("md"))
            .and_then(|md| md.get("num"))
            .and_then(Value::as_u64);

        let batch = resource.get_attr("bn").and_then(|bn| {
            let duration_secs = bn
                .get("dur")
                .and_then(Value::as_str)
                .and_then(|s| cse_core::time::parse_iso8601_duration(s))
                .map(|d| d.num_milliseconds() as f64 / 1000.0)?;
            let max_count = bn.get("num").and_then(Value::as_u64);
            Some(BatchPolicy { duration_secs, max_count })
        });

        Some(Self {
            ri: resource.ri.clone(),
            parent_ri,
            notification_uris,
            content_type,
            event_types,
            child_types,
            attributes,
            batch,
            latest_notify: resource.get_attr("ln").and_then(Value::as_bool).unwrap_or(false),
            expiration_counter: resource.get_attr("exc").and_then(Value::as_i64),
            creator: resource.cr.clone(),
            subscriber_uri: resource.get_attr("su").and_then(Value::as_str).map(str::to_string),
            associated_crs: resource
                .get_attr("acrs")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            missing_data_threshold,
        })
    }

    /// Whether this subscription cares about `reason` at all (reference:
    /// `reason not in sub['net']`).
    pub fn wants_event(&self, reason: NotificationEventType) -> bool {
        self.event_types.contains(&reason)
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
}

fn content_type_from_i64(n: i64) -> Option<NotificationContentType> {
    use NotificationContentType::*;
    Some(match n {
        1 => All,
        2 => ModifiedAttributes,
        3 => Ri,
        4 => TriggerPayload,
        5 => TimeSeriesNotification,
        _ => return None,
    })
}

fn event_type_from_i64(n: i64) -> Option<NotificationEventType> {
    use NotificationEventType::*;
    Some(match n {
        1 => ResourceUpdate,
        2 => ResourceDelete,
        3 => CreateDirectChild,
        4 => DeleteDirectChild,
        5 => RetrieveCntNoChild,
        6 => TriggerReceivedForAe,
        7 => BlockingUpdate,
        8 => ReportOnGeneratedMissingDataPoints,
        9 => BlockingRetrieve,
        10 => BlockingRetrieveDirectChild,
        _ => return None,
    })
}

fn resource_type_from_i64(n: i64) -> Option<ResourceType> {
    use ResourceType::*;
    Some(match n {
        1 => Acp,
        2 => Ae,
        3 => Cnt,
        4 => Cin,
        5 => CseBase,
        9 => Grp,
        14 => Node,
        15 => Pch,
        16 => Csr,
        23 => Sub,
        28 => FlexContainer,
        29 => Ts,
        30 => Tsi,
        63 => Actr,
        64 => Depr,
        65 => Sch,
        66 => Tsb,
        67 => Crs,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sub_resource() -> Resource {
        let mut r = Resource::new(ResourceType::Sub, "sub1".into(), Some("cnt1".into()), "sub".into(), "/cse-in/cnt1/sub".into());
        r.set_attr("nu", json!(["http://example.com/notify"]));
        r.set_attr("nct", json!(1));
        r.set_attr("enc", json!({"net": [3, 4]}));
        r.set_attr("bn", json!({"num": 5, "dur": "PT10S"}));
        r
    }

    #[test]
    fn parses_core_fields() {
        let cfg = SubscriptionConfig::from_resource(&sub_resource()).unwrap();
        assert_eq!(cfg.notification_uris, vec!["http://example.com/notify".to_string()]);
        assert_eq!(cfg.content_type, NotificationContentType::All);
        assert!(cfg.wants_event(NotificationEventType::CreateDirectChild));
        assert!(!cfg.wants_event(NotificationEventType::ResourceUpdate));
    }

    #[test]
    fn parses_batch_policy_duration_and_count() {
        let cfg = SubscriptionConfig::from_resource(&sub_resource()).unwrap();
        let batch = cfg.batch.unwrap();
        assert_eq!(batch.max_count, Some(5));
        assert_eq!(batch.duration_secs, 10.0);
    }

    #[test]
    fn parses_missing_data_threshold() {
        let mut r = sub_resource();
        r.set_attr("enc", json!({"net": [8], "md": {"num": 2}}));
        let cfg = SubscriptionConfig::from_resource(&r).unwrap();
        assert_eq!(cfg.missing_data_threshold, Some(2));
    }

    #[test]
    fn missing_nu_fails_to_parse() {
        let mut r = Resource::new(ResourceType::Sub, "sub1".into(), Some("cnt1".into()), "sub".into(), "/cse-in/cnt1/sub".into());
        r.set_attr("nct", json!(1));
        assert!(SubscriptionConfig::from_resource(&r).is_none());
    }
}
