//! Synchronous snapshots bridging the async [`Store`] to the synchronous
//! trait seams `cse-model::factory::ResourceAccessor` and
//! `cse-group::membership::MemberAccessor` expect. The dispatcher pre-fetches
//! whatever a validation/membership pass needs before calling into either
//! crate, since neither trait may suspend.

use cse_model::ResourceType;
use cse_storage::Store;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct SnapshotAccessor {
    existing: HashSet<String>,
    attributes: HashMap<String, HashSet<String>>,
    types: HashMap<String, ResourceType>,
}

impl SnapshotAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fetch `ris` from `store`, recording existence, attribute names,
    /// and type for each one found. Missing `ri`s are simply absent from
    /// the snapshot (`resource_exists` returns `false` for them).
    pub async fn gather(store: &dyn Store, ris: impl IntoIterator<Item = String>) -> cse_core::error::CseResult<Self> {
        let mut snapshot = Self::new();
        for ri in ris {
            if let Some(resource) = store.get_by_ri(&ri).await? {
                snapshot.types.insert(ri.clone(), resource.ty);
                let mut names: HashSet<String> = resource.attrs.keys().cloned().collect();
                names.insert("ri".to_string());
                names.insert("rn".to_string());
                names.insert("ty".to_string());
                snapshot.attributes.insert(ri.clone(), names);
                snapshot.existing.insert(ri);
            }
        }
        Ok(snapshot)
    }
}

impl cse_model::factory::ResourceAccessor for SnapshotAccessor {
    fn resource_exists(&self, ri: &str) -> bool {
        self.existing.contains(ri)
    }

    fn has_attribute(&self, ri: &str, attribute: &str) -> bool {
        self.attributes
            .get(ri)
            .is_some_and(|names| names.contains(attribute))
    }
}

impl cse_group::membership::MemberAccessor for SnapshotAccessor {
    fn member_type(&self, ri: &str) -> Option<ResourceType> {
        self.types.get(ri).copied()
    }
}
