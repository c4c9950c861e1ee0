//! The transport-neutral request/response primitive (§6), and discovery
//! filter criteria. Transports (out of scope) build a `Request` from
//! whatever wire format they speak and hand it to the dispatcher.

use chrono::{DateTime, Utc};
use cse_core::rsc::ResponseStatusCode;
use cse_model::{Operation, ResourceType};
use serde_json::Value;

/// `rt` — how the caller wants the response delivered (§4.1 "Non-blocking
/// modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    BlockingRequest,
    NonBlockingRequestSynch,
    NonBlockingRequestAsynch,
}

/// `rcn` — what the response's primitive content should carry (§4.1 step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultContent {
    #[default]
    Attributes,
    ChildResourceReferences,
    Nothing,
    ModifiedAttributes,
    DiscoveryResultReferences,
    OriginalResource,
}

/// `lbq` — how multiple `labels` combine (§6 "label logical operation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelOp {
    #[default]
    Or,
    And,
}

/// A rectangular `loc` bounding-box query (§6 "geo-query on loc", §9
/// design note on the `GeoPoint`/`GeoPolygon` type shared with the
/// validator). Matches a resource whose `loc` attribute is a GeoJSON
/// `Point` falling within `[min_lon, max_lon] x [min_lat, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBoundingBox {
    fn contains_point(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

/// Discovery filter criteria (§6 "Filter criteria for discovery"). All
/// fields are conjunctive (AND) except `labels`, whose combination is
/// governed by `label_op`.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub resource_types: Vec<ResourceType>,
    pub labels: Vec<String>,
    pub label_op: LabelOp,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub modified_since: Option<DateTime<Utc>>,
    pub unmodified_since: Option<DateTime<Utc>>,
    /// `pi` — restrict discovery to descendants of this resource's direct
    /// children (§6 "parent filter"). `discover` already roots the walk at
    /// a target; this additionally filters matches by their immediate
    /// parent, for queries that want only a specific subtree branch.
    pub parent: Option<String>,
    /// `sza`/`szb` — inclusive byte-size range, checked against the
    /// `cs`/`conlen` size attribute content-bearing types carry (`<CIN>`
    /// `cs`, `<CNT>` `cbs`). Resources without a size attribute never
    /// match a size-bounded query.
    pub size_min: Option<i64>,
    pub size_max: Option<i64>,
    /// `lvl` — maximum recursion depth below the discovery root (1 = only
    /// direct children). `None` means unbounded, the default.
    pub max_level: Option<u32>,
    /// Exact-match `shortName -> value` pairs against `attrs` (§6
    /// "attribute-value match").
    pub attribute_match: Vec<(String, Value)>,
    /// `geoQuery` on `loc` (§6, §9).
    pub geo_within: Option<GeoBoundingBox>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FilterCriteria {
    pub fn matches(&self, resource: &cse_model::Resource) -> bool {
        if !self.resource_types.is_empty() && !self.resource_types.contains(&resource.ty) {
            return false;
        }
        if !self.labels.is_empty() {
            let owned = resource.lbl.as_deref().unwrap_or(&[]);
            let matched = match self.label_op {
                LabelOp::Or => self.labels.iter().any(|l| owned.contains(l)),
                LabelOp::And => self.labels.iter().all(|l| owned.contains(l)),
            };
            if !matched {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if resource.pi.as_deref() != Some(parent.as_str()) {
                return false;
            }
        }
        if self.size_min.is_some() || self.size_max.is_some() {
            let size = resource
                .attrs
                .get("cs")
                .or_else(|| resource.attrs.get("cbs"))
                .and_then(Value::as_i64);
            match size {
                Some(size) => {
                    if self.size_min.is_some_and(|min| size < min) || self.size_max.is_some_and(|max| size > max) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if !self.attribute_match.is_empty() {
            let all_match = self
                .attribute_match
                .iter()
                .all(|(name, expected)| resource.attrs.get(name) == Some(expected));
            if !all_match {
                return false;
            }
        }
        if let Some(bbox) = self.geo_within {
            let point = resource
                .attrs
                .get("loc")
                .filter(|loc| loc.get("typ").and_then(Value::as_str) == Some("Point"))
                .and_then(|loc| loc.get("crd"))
                .and_then(Value::as_array)
                .filter(|crd| crd.len() == 2)
                .and_then(|crd| Some((crd[0].as_f64()?, crd[1].as_f64()?)));
            match point {
                Some((lon, lat)) if bbox.contains_point(lon, lat) => {}
                _ => return false,
            }
        }
        if let Some(after) = self.created_after {
            if resource.ct < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if resource.ct > before {
                return false;
            }
        }
        if let Some(since) = self.modified_since {
            if resource.lt < since {
                return false;
            }
        }
        if let Some(unmodified) = self.unmodified_since {
            if resource.lt > unmodified {
                return false;
            }
        }
        true
    }
}

/// A dispatcher request, built by a transport adapter from its wire format
/// (§6).
#[derive(Debug, Clone)]
pub struct Request {
    pub op: Operation,
    pub to: String,
    pub originator: String,
    pub request_id: String,
    pub release_version: String,
    pub resource_type: Option<ResourceType>,
    pub content: Option<Value>,
    pub result_content: ResultContent,
    pub response_type: ResponseType,
    pub request_expiration: Option<DateTime<Utc>>,
    pub operation_execution_time: Option<DateTime<Utc>>,
    pub result_expiration: Option<DateTime<Utc>>,
    pub filter: Option<FilterCriteria>,
}

impl Request {
    pub fn new(op: Operation, to: impl Into<String>, originator: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            op,
            to: to.into(),
            originator: originator.into(),
            request_id: request_id.into(),
            release_version: "5".to_string(),
            resource_type: None,
            content: None,
            result_content: ResultContent::default(),
            response_type: ResponseType::default(),
            request_expiration: None,
            operation_execution_time: None,
            result_expiration: None,
            filter: None,
        }
    }
}

/// The dispatcher's response (§6, §4.1 step 8).
#[derive(Debug, Clone)]
pub struct Response {
    pub rsc: ResponseStatusCode,
    pub request_id: String,
    pub content: Option<Value>,
    pub to: Option<String>,
    pub originating_timestamp: DateTime<Utc>,
}

impl Response {
    pub fn success(rsc: ResponseStatusCode, request_id: impl Into<String>, content: Option<Value>, to: impl Into<String>) -> Self {
        Self {
            rsc,
            request_id: request_id.into(),
            content,
            to: Some(to.into()),
            originating_timestamp: Utc::now(),
        }
    }

    pub fn error(rsc: ResponseStatusCode, request_id: impl Into<String>, message: impl Into<String>, to: Option<String>) -> Self {
        Self {
            rsc,
            request_id: request_id.into(),
            content: Some(serde_json::json!({ "debugInfo": message.into() })),
            to,
            originating_timestamp: Utc::now(),
        }
    }
}
