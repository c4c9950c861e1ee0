//! Discovery (`fu=1`/`rcn=discoveryResultReferences`, §4.1 step 8, §6
//! "Filter criteria for discovery"): a recursive subtree walk from the
//! targeted resource, keeping anything [`FilterCriteria::matches`]
//! accepts.

use cse_core::error::CseResult;
use cse_model::Resource;
use cse_storage::Store;

use crate::request::FilterCriteria;

/// Walk the subtree rooted at `root`'s children, depth-first, collecting
/// every descendant the filter matches. `root` itself is never included —
/// discovery targets a resource's descendants, not the resource (§6).
/// Honors `filter.max_level` (`lvl`, 1 = direct children only) by not
/// descending past the requested depth.
pub async fn discover(store: &dyn Store, root: &str, filter: &FilterCriteria) -> CseResult<Vec<Resource>> {
    let mut matches = Vec::new();
    let mut stack: Vec<(Resource, u32)> = store
        .children_of(root)
        .await?
        .into_iter()
        .map(|r| (r, 1))
        .collect();
    while let Some((resource, depth)) = stack.pop() {
        if filter.max_level.is_none_or(|max| depth <= max) {
            if filter.matches(&resource) {
                matches.push(resource.clone());
            }
        }
        if filter.max_level.is_none_or(|max| depth < max) {
            let children = store.children_of(&resource.ri).await?;
            stack.extend(children.into_iter().map(|c| (c, depth + 1)));
        }
    }

    if let Some(offset) = filter.offset {
        if offset >= matches.len() {
            return Ok(Vec::new());
        }
        matches.drain(0..offset);
    }
    if let Some(limit) = filter.limit {
        matches.truncate(limit);
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{GeoBoundingBox, LabelOp};
    use cse_model::ResourceType;
    use cse_storage::InMemoryStore;

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_resource(Resource::new(ResourceType::Cnt, "root".into(), None, "cnt1".into(), "/cse-in/cnt1".into()))
            .await
            .unwrap();
        store
            .insert_resource(Resource::new(ResourceType::Cin, "cin1".into(), Some("root".into()), "cin1".into(), "/cse-in/cnt1/cin1".into()))
            .await
            .unwrap();
        store
            .insert_resource(Resource::new(ResourceType::Cnt, "sub1".into(), Some("root".into()), "sub1".into(), "/cse-in/cnt1/sub1".into()))
            .await
            .unwrap();
        store
            .insert_resource(Resource::new(ResourceType::Cin, "cin2".into(), Some("sub1".into()), "cin2".into(), "/cse-in/cnt1/sub1/cin2".into()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn walks_entire_subtree_by_default() {
        let store = seeded_store().await;
        let results = discover(&store, "root", &FilterCriteria::default()).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn filters_by_resource_type() {
        let store = seeded_store().await;
        let filter = FilterCriteria {
            resource_types: vec![ResourceType::Cin],
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.ty == ResourceType::Cin));
    }

    #[tokio::test]
    async fn limit_and_offset_apply_after_filtering() {
        let store = seeded_store().await;
        let filter = FilterCriteria {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn max_level_stops_recursion_at_the_requested_depth() {
        let store = seeded_store().await;
        let filter = FilterCriteria {
            max_level: Some(1),
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.ri == "cin1" || r.ri == "sub1"));
    }

    #[tokio::test]
    async fn parent_filter_restricts_to_one_branch() {
        let store = seeded_store().await;
        let filter = FilterCriteria {
            parent: Some("sub1".into()),
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ri, "cin2");
    }

    #[tokio::test]
    async fn attribute_match_checks_exact_values() {
        let store = seeded_store().await;
        let mut cin1 = store.get_by_ri("cin1").await.unwrap().unwrap();
        cin1.set_attr("con", serde_json::json!("target"));
        store.update_resource(cin1).await.unwrap();

        let filter = FilterCriteria {
            attribute_match: vec![("con".to_string(), serde_json::json!("target"))],
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ri, "cin1");
    }

    #[tokio::test]
    async fn label_and_requires_every_label() {
        let store = seeded_store().await;
        let mut cin1 = store.get_by_ri("cin1").await.unwrap().unwrap();
        cin1.lbl = Some(vec!["a".into(), "b".into()]);
        store.update_resource(cin1).await.unwrap();
        let mut cin2 = store.get_by_ri("cin2").await.unwrap().unwrap();
        cin2.lbl = Some(vec!["a".into()]);
        store.update_resource(cin2).await.unwrap();

        let filter = FilterCriteria {
            labels: vec!["a".into(), "b".into()],
            label_op: LabelOp::And,
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ri, "cin1");
    }

    #[tokio::test]
    async fn geo_bounding_box_matches_point_within_range() {
        let store = seeded_store().await;
        let mut cin1 = store.get_by_ri("cin1").await.unwrap().unwrap();
        cin1.set_attr("loc", serde_json::json!({"typ": "Point", "crd": [10.0, 20.0]}));
        store.update_resource(cin1).await.unwrap();

        let filter = FilterCriteria {
            geo_within: Some(GeoBoundingBox { min_lon: 0.0, max_lon: 15.0, min_lat: 15.0, max_lat: 25.0 }),
            ..Default::default()
        };
        let results = discover(&store, "root", &filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ri, "cin1");
    }
}
