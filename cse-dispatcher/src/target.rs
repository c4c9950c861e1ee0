//! Target resolution (§4.1 step 1): turns a request's `to` address into
//! either a local resource (optionally through a virtual child) or a
//! remote CSE to forward to.

use cse_core::error::{CseError, CseResult};
use cse_model::Resource;
use cse_storage::Store;

/// Structural virtual children the dispatcher resolves without ever
/// persisting a resource for them (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualChild {
    /// `<cnt|ts>/la` — latest child instance.
    Latest,
    /// `<cnt|ts>/ol` — oldest child instance.
    Oldest,
    /// `<grp>/fopt` — group fan-out.
    Fopt,
    /// `<pch>/pcu` — polling-channel URI.
    Pcu,
}

impl VirtualChild {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "la" => Some(Self::Latest),
            "ol" => Some(Self::Oldest),
            "fopt" => Some(Self::Fopt),
            "pcu" => Some(Self::Pcu),
            _ => None,
        }
    }
}

/// A request target resolved to a concrete, already-persisted resource.
#[derive(Debug, Clone)]
pub struct LocalTarget {
    pub resource: Resource,
    pub virtual_child: Option<VirtualChild>,
    /// For `fopt`, anything after the `/fopt` segment — appended to each
    /// member's target path by the fan-out routine (§4.4).
    pub fanout_suffix: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    Local(LocalTarget),
    Remote { cse_id: String },
}

/// Resolve `to` against `store`. Structured addresses are expected to
/// start with `local_cse_rn`, SP-relative addresses with `local_cse_id`;
/// any other leading path segment names a different CSE and is routed to
/// the forwarder (§4.1 step 1).
pub async fn resolve(
    store: &dyn Store,
    local_cse_id: &str,
    local_cse_rn: &str,
    to: &str,
) -> CseResult<ResolvedTarget> {
    if let Some(cse_id) = remote_cse_id(to, local_cse_id, local_cse_rn) {
        return Ok(ResolvedTarget::Remote { cse_id });
    }

    let (base, virtual_child, fanout_suffix) = split_virtual_suffix(to);

    let ri = store
        .resolve(&base)
        .await?
        .ok_or_else(|| CseError::not_found(format!("no resource at '{base}'")))?;
    let resource = store
        .get_by_ri(&ri)
        .await?
        .ok_or_else(|| CseError::not_found(format!("no resource at '{base}'")))?;

    Ok(ResolvedTarget::Local(LocalTarget {
        resource,
        virtual_child,
        fanout_suffix,
    }))
}

fn remote_cse_id(to: &str, local_cse_id: &str, local_cse_rn: &str) -> Option<String> {
    let rest = to.strip_prefix('/')?;
    let seg = rest.split('/').next().unwrap_or("");
    let local_cse_id = local_cse_id.trim_start_matches('/');
    if seg.is_empty() || seg == local_cse_id || seg == local_cse_rn {
        None
    } else {
        Some(seg.to_string())
    }
}

/// Strip a trailing virtual-child segment. `/fopt` consumes everything
/// after it as the fan-out suffix rather than trying to resolve it as a
/// further virtual child.
fn split_virtual_suffix(to: &str) -> (String, Option<VirtualChild>, Option<String>) {
    let trimmed = to.trim_end_matches('/');
    if let Some(idx) = trimmed.rfind("/fopt") {
        let after = &trimmed[idx + "/fopt".len()..];
        if after.is_empty() || after.starts_with('/') {
            let base = trimmed[..idx].to_string();
            let suffix = if after.is_empty() { None } else { Some(after.to_string()) };
            return (base, Some(VirtualChild::Fopt), suffix);
        }
    }
    if let Some((base, last)) = trimmed.rsplit_once('/') {
        if let Some(vc) = VirtualChild::from_segment(last) {
            return (base.to_string(), Some(vc), None);
        }
    }
    (trimmed.to_string(), None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_model::ResourceType;
    use cse_storage::InMemoryStore;

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_resource(Resource::new(ResourceType::CseBase, "cb".into(), None, "cse-in".into(), "/cse-in".into()))
            .await
            .unwrap();
        store
            .insert_resource(Resource::new(ResourceType::Cnt, "cnt1".into(), Some("cb".into()), "cnt1".into(), "/cse-in/cnt1".into()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn resolves_structured_address_to_local_resource() {
        let store = seeded_store().await;
        let resolved = resolve(&store, "id-in", "cse-in", "/cse-in/cnt1").await.unwrap();
        match resolved {
            ResolvedTarget::Local(local) => {
                assert_eq!(local.resource.ri, "cnt1");
                assert!(local.virtual_child.is_none());
            }
            _ => panic!("expected local target"),
        }
    }

    #[tokio::test]
    async fn strips_latest_virtual_child_suffix() {
        let store = seeded_store().await;
        let resolved = resolve(&store, "id-in", "cse-in", "/cse-in/cnt1/la").await.unwrap();
        match resolved {
            ResolvedTarget::Local(local) => {
                assert_eq!(local.resource.ri, "cnt1");
                assert_eq!(local.virtual_child, Some(VirtualChild::Latest));
            }
            _ => panic!("expected local target"),
        }
    }

    #[tokio::test]
    async fn captures_fopt_suffix() {
        let store = seeded_store().await;
        store
            .insert_resource(Resource::new(ResourceType::Grp, "grp1".into(), Some("cb".into()), "grp1".into(), "/cse-in/grp1".into()))
            .await
            .unwrap();
        let resolved = resolve(&store, "id-in", "cse-in", "/cse-in/grp1/fopt/la").await.unwrap();
        match resolved {
            ResolvedTarget::Local(local) => {
                assert_eq!(local.resource.ri, "grp1");
                assert_eq!(local.virtual_child, Some(VirtualChild::Fopt));
                assert_eq!(local.fanout_suffix.as_deref(), Some("/la"));
            }
            _ => panic!("expected local target"),
        }
    }

    #[tokio::test]
    async fn routes_other_cse_ids_to_remote() {
        let store = seeded_store().await;
        let resolved = resolve(&store, "id-in", "cse-in", "/otherCSE/ae1").await.unwrap();
        match resolved {
            ResolvedTarget::Remote { cse_id } => assert_eq!(cse_id, "otherCSE"),
            _ => panic!("expected remote target"),
        }
    }

    #[tokio::test]
    async fn unknown_local_address_is_not_found() {
        let store = seeded_store().await;
        let err = resolve(&store, "id-in", "cse-in", "/cse-in/missing").await.unwrap_err();
        assert_eq!(err.rsc, cse_core::rsc::ResponseStatusCode::NotFound);
    }
}
