//! Declarative per-attribute validation policies (§4.2) and the registries
//! that hold them, loaded once at startup and read-only thereafter (§9
//! design note on global registries).

use crate::types::{AnnounceDisposition, ResourceType};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Whether an attribute may/must appear for a given operation (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optionality {
    /// Not Permitted — must not be present.
    Np,
    /// Optional.
    O,
    /// Mandatory — must be present.
    M,
}

/// The attribute's data type (§4.2), grounded on the reference's `BasicType`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeDataType {
    PositiveInteger,
    NonNegativeInteger,
    UnsignedInt,
    UnsignedLong,
    Integer,
    Float,
    Boolean,
    String,
    AnyUri,
    Timestamp,
    AbsRelTimestamp,
    Duration,
    Base64,
    GeoCoordinates,
    Enum(&'static str),
    List(Box<AttributeDataType>),
    ListNonEmpty(Box<AttributeDataType>),
    Dict,
    Complex(&'static str),
    Any,
}

/// Per-attribute policy entry (§4.2).
#[derive(Debug, Clone)]
pub struct AttributePolicy {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub data_type: AttributeDataType,
    pub optional_create: Optionality,
    pub optional_update: Optionality,
    pub optional_discovery: Optionality,
    pub announce: AnnounceDisposition,
    pub namespace: &'static str,
}

impl AttributePolicy {
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        data_type: AttributeDataType,
        optional_create: Optionality,
        optional_update: Optionality,
        optional_discovery: Optionality,
        announce: AnnounceDisposition,
    ) -> Self {
        Self {
            short_name,
            long_name,
            data_type,
            optional_create,
            optional_update,
            optional_discovery,
            announce,
            namespace: "m2m",
        }
    }
}

/// A flexContainer specialization registered at startup (§4.2).
#[derive(Debug, Clone)]
pub struct FlexContainerSpecialization {
    /// `tpe` — `domain:shortname`.
    pub tpe: String,
    pub container_definition: String,
    pub lname: String,
    pub attributes: Vec<AttributePolicy>,
}

/// Global, read-only-after-startup registry of attribute policies, enum
/// value tables, and flexContainer specializations (§4.2, §9 design note on
/// global registries — initialized once, hot-reloaded via snapshot swap).
#[derive(Clone)]
pub struct PolicyRegistry {
    inner: Arc<PolicyRegistryInner>,
}

struct PolicyRegistryInner {
    common: Vec<AttributePolicy>,
    by_type: DashMap<ResourceType, Vec<AttributePolicy>>,
    enums: DashMap<&'static str, HashSet<String>>,
    flex_containers: DashMap<String, FlexContainerSpecialization>,
}

impl PolicyRegistry {
    /// Build the registry with the common/universal attributes plus the
    /// per-type attribute tables this implementation knows about.
    pub fn bootstrap() -> Self {
        let registry = Self {
            inner: Arc::new(PolicyRegistryInner {
                common: common_attributes(),
                by_type: DashMap::new(),
                enums: DashMap::new(),
                flex_containers: DashMap::new(),
            }),
        };
        for (ty, attrs) in crate::builtin::builtin_type_policies() {
            registry.inner.by_type.insert(ty, attrs);
        }
        for (name, values) in crate::builtin::builtin_enum_tables() {
            registry
                .inner
                .enums
                .insert(name, values.into_iter().map(str::to_string).collect());
        }
        registry
    }

    pub fn common_attributes(&self) -> &[AttributePolicy] {
        &self.inner.common
    }

    /// All attribute policies applicable to a type: its own plus the common
    /// set (§4.2).
    pub fn attributes_for(&self, ty: ResourceType) -> Vec<AttributePolicy> {
        let mut result = self.inner.common.clone();
        if let Some(specific) = self.inner.by_type.get(&ty) {
            result.extend(specific.clone());
        }
        result
    }

    pub fn policy_for(&self, ty: ResourceType, short_name: &str) -> Option<AttributePolicy> {
        self.attributes_for(ty)
            .into_iter()
            .find(|p| p.short_name == short_name)
    }

    pub fn enum_values(&self, name: &str) -> Option<HashSet<String>> {
        self.inner.enums.get(name).map(|v| v.clone())
    }

    /// Register a flexContainer specialization. Fails (returns `false`) if a
    /// `containerDefinition` is already registered for a different `tpe`
    /// (§4.2 invariant: container definitions unique across the registry).
    pub fn register_flex_container(&self, spec: FlexContainerSpecialization) -> bool {
        for existing in self.inner.flex_containers.iter() {
            if existing.container_definition == spec.container_definition && existing.tpe != spec.tpe
            {
                return false;
            }
        }
        self.inner.flex_containers.insert(spec.tpe.clone(), spec);
        true
    }

    pub fn flex_container(&self, tpe: &str) -> Option<FlexContainerSpecialization> {
        self.inner.flex_containers.get(tpe).map(|v| v.clone())
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::bootstrap()
    }
}

/// Universal and common attributes present on (almost) every resource
/// (§3, §4.2).
fn common_attributes() -> Vec<AttributePolicy> {
    use AttributeDataType::*;
    use AnnounceDisposition as A;
    use Optionality::*;
    vec![
        AttributePolicy::new("ty", "resourceType", Integer, Np, Np, O, A::Ma),
        AttributePolicy::new("ri", "resourceID", String, Np, Np, O, A::Na),
        AttributePolicy::new("pi", "parentID", String, Np, Np, O, A::Na),
        AttributePolicy::new("rn", "resourceName", String, O, Np, O, A::Na),
        AttributePolicy::new("ct", "creationTime", Timestamp, Np, Np, O, A::Ma),
        AttributePolicy::new("lt", "lastModifiedTime", Timestamp, Np, Np, O, A::Ma),
        AttributePolicy::new("et", "expirationTime", AbsRelTimestamp, O, O, O, A::Ma),
        AttributePolicy::new(
            "acpi",
            "accessControlPolicyIDs",
            ListNonEmpty(Box::new(String)),
            O,
            O,
            O,
            A::Na,
        ),
        AttributePolicy::new("lbl", "labels", List(Box::new(String)), O, O, O, A::Oa),
        AttributePolicy::new("at", "announceTo", List(Box::new(AnyUri)), O, O, Np, A::Na),
        AttributePolicy::new("aa", "announcedAttribute", List(Box::new(String)), O, O, Np, A::Na),
        AttributePolicy::new("cr", "creator", AnyUri, O, Np, O, A::Ma),
        AttributePolicy::new("st", "stateTag", NonNegativeInteger, Np, Np, O, A::Ma),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_includes_common_attributes_for_every_type() {
        let reg = PolicyRegistry::bootstrap();
        let attrs = reg.attributes_for(ResourceType::Cnt);
        assert!(attrs.iter().any(|p| p.short_name == "ri"));
        assert!(attrs.iter().any(|p| p.short_name == "mni"));
    }

    #[test]
    fn duplicate_container_definition_rejected_for_different_tpe() {
        let reg = PolicyRegistry::bootstrap();
        let a = FlexContainerSpecialization {
            tpe: "org:binarySwitch".into(),
            container_definition: "org.onem2m.home.device.binarySwitch".into(),
            lname: "binarySwitch".into(),
            attributes: vec![],
        };
        let b = FlexContainerSpecialization {
            tpe: "org:otherSwitch".into(),
            container_definition: "org.onem2m.home.device.binarySwitch".into(),
            lname: "otherSwitch".into(),
            attributes: vec![],
        };
        assert!(reg.register_flex_container(a));
        assert!(!reg.register_flex_container(b));
    }
}
