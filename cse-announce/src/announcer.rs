//! Announced-mirror lifecycle (§4.5), grounded on the reference CSE's
//! `Announcer.announceResource`/`announceUpdateResource`/
//! `deAnnounceResource`.
//!
//! An `at` entry is either a bare CSE-ID (not yet announced) or
//! `<cse-id>/<remoteRi>` (already has a mirror). `announce_create` turns the
//! former into the latter; `announce_update`/`unannounce` operate on the
//! latter.

use crate::disposition::select_announced_attributes;
use crate::remote::RemoteCseClient;
use cse_core::error::{CseError, CseResult};
use cse_core::ids::sp_relative;
use cse_model::{PolicyRegistry, Resource};
use std::sync::Arc;

pub struct Announcer {
    client: Arc<dyn RemoteCseClient>,
    policies: PolicyRegistry,
    local_cse_id: String,
}

/// One `at` entry, split into its CSE-ID and (if already announced) the
/// mirror's `ri`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AtEntry {
    cse_id: String,
    remote_ri: Option<String>,
}

fn parse_at_entry(entry: &str) -> AtEntry {
    match entry.split_once('/') {
        Some((cse_id, remote_ri)) => AtEntry {
            cse_id: cse_id.to_string(),
            remote_ri: Some(remote_ri.to_string()),
        },
        None => AtEntry {
            cse_id: entry.to_string(),
            remote_ri: None,
        },
    }
}

impl Announcer {
    pub fn new(client: Arc<dyn RemoteCseClient>, policies: PolicyRegistry, local_cse_id: impl Into<String>) -> Self {
        Self {
            client,
            policies,
            local_cse_id: local_cse_id.into(),
        }
    }

    /// Push a create of `resource`'s announced-type mirror to every CSE-ID
    /// named in `at` that doesn't already carry a mirror, returning the
    /// rewritten `at` list with `<cse-id>/<remoteRi>` entries (§4.5 "Create").
    pub async fn announce_create(&self, resource: &Resource) -> CseResult<Vec<String>> {
        let Some(at) = &resource.at else {
            return Ok(Vec::new());
        };
        let announced_type = resource
            .ty
            .announced_variant()
            .ok_or_else(|| CseError::bad_request("resource type cannot be announced").with_attribute("at"))?;

        let aa = resource
            .aa
            .clone()
            .unwrap_or_default();
        let mut attrs = select_announced_attributes(resource.ty, &resource.attrs, &self.policies, &aa);
        attrs.insert(
            "lnk".to_string(),
            serde_json::Value::from(sp_relative(&self.local_cse_id, &resource.ri)),
        );

        let mut rewritten = Vec::with_capacity(at.len());
        for entry in at {
            let parsed = parse_at_entry(entry);
            if parsed.remote_ri.is_some() {
                rewritten.push(entry.clone());
                continue;
            }
            let remote_ri = self
                .client
                .create(&parsed.cse_id, announced_type.short_name(), serde_json::Value::Object(attrs.clone()))
                .await?;
            rewritten.push(format!("{}/{}", parsed.cse_id, remote_ri));
        }
        Ok(rewritten)
    }

    /// Recompute the attribute subset and push an update to every existing
    /// mirror named in `at` (§4.5 "Update").
    pub async fn announce_update(&self, resource: &Resource) -> CseResult<()> {
        let Some(at) = &resource.at else {
            return Ok(());
        };
        let aa = resource.aa.clone().unwrap_or_default();
        let attrs = select_announced_attributes(resource.ty, &resource.attrs, &self.policies, &aa);

        for entry in at {
            let parsed = parse_at_entry(entry);
            let Some(remote_ri) = parsed.remote_ri else {
                continue;
            };
            self.client
                .update(&parsed.cse_id, &remote_ri, serde_json::Value::Object(attrs.clone()))
                .await?;
        }
        Ok(())
    }

    /// Unannounce every mirror in `at` (full delete of the original) or only
    /// `target_cse_ids` (a CSE-ID removed from `at`) (§4.5 "Delete").
    pub async fn unannounce(&self, at: &[String], target_cse_ids: Option<&[String]>) -> CseResult<()> {
        for entry in at {
            let parsed = parse_at_entry(entry);
            let Some(remote_ri) = parsed.remote_ri else {
                continue;
            };
            if let Some(targets) = target_cse_ids {
                if !targets.iter().any(|id| id == &parsed.cse_id) {
                    continue;
                }
            }
            self.client.delete(&parsed.cse_id, &remote_ri).await?;
        }
        Ok(())
    }
}
