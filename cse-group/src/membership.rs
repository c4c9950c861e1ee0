//! Group membership validation (§4.4 consistency strategy), grounded on the
//! reference CSE's `GRP.validateAndConstructMemberType`/`GRP._checkConsistency`.

use cse_core::error::{CseError, CseResult};
use cse_model::{ConsistencyStrategy, ResourceType};

/// What the membership check needs to know about a candidate member without
/// depending on `cse-storage` directly (mirrors `cse-model::factory`'s
/// `ResourceAccessor` seam).
pub trait MemberAccessor {
    /// The member's resource type, or `None` if it does not exist (or is a
    /// remote address the CSE cannot resolve locally).
    fn member_type(&self, ri: &str) -> Option<ResourceType>;
}

/// Outcome of validating a group's proposed membership against its
/// consistency strategy.
pub struct MembershipResult {
    /// The (possibly pruned) member list to persist.
    pub mid: Vec<String>,
    /// The (possibly rewritten to `Mixed`) member type to persist.
    pub mt: ResourceType,
}

/// Validate `mid` against `mt`/`mnm`/`csy` (§4.4 paragraph 4).
///
/// - `AbandonMember` drops mismatched/missing members from `mid`.
/// - `AbandonGroup` rejects the whole request on the first mismatch.
/// - `SetMixed` keeps every member and rewrites `mt` to `Mixed`.
///
/// `mnm` is enforced against the final `mid` length, after pruning.
pub fn validate_members(
    mid: &[String],
    mt: ResourceType,
    mnm: Option<i64>,
    csy: ConsistencyStrategy,
    accessor: &dyn MemberAccessor,
) -> CseResult<MembershipResult> {
    let mut kept = Vec::with_capacity(mid.len());
    let mut mixed = false;

    for ri in mid {
        let found = accessor.member_type(ri);
        let compatible = mt == ResourceType::Mixed || found == Some(mt);
        match (found, compatible) {
            (Some(_), true) => kept.push(ri.clone()),
            _ => match csy {
                ConsistencyStrategy::AbandonMember => continue,
                ConsistencyStrategy::AbandonGroup => {
                    return Err(CseError::bad_request(format!(
                        "group member '{ri}' does not exist or is type-inconsistent"
                    ))
                    .with_attribute("mid"));
                }
                ConsistencyStrategy::SetMixed => {
                    if found.is_none() {
                        return Err(CseError::bad_request(format!(
                            "group member '{ri}' does not exist"
                        ))
                        .with_attribute("mid"));
                    }
                    kept.push(ri.clone());
                    mixed = true;
                }
            },
        }
    }

    if let Some(mnm) = mnm {
        if kept.len() as i64 > mnm {
            return Err(CseError::new(
                cse_core::rsc::ResponseStatusCode::MaxNumberOfMemberExceeded,
                "member count exceeds 'mnm'",
            )
            .with_attribute("mid"));
        }
    }

    Ok(MembershipResult {
        mid: kept,
        mt: if mixed { ResourceType::Mixed } else { mt },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeAccessor(HashMap<&'static str, ResourceType>);
    impl MemberAccessor for FakeAccessor {
        fn member_type(&self, ri: &str) -> Option<ResourceType> {
            self.0.get(ri).copied()
        }
    }

    #[test]
    fn abandon_member_drops_mismatched_entries() {
        let accessor = FakeAccessor(HashMap::from([("cnt1", ResourceType::Cnt), ("ae1", ResourceType::Ae)]));
        let result = validate_members(
            &["cnt1".into(), "ae1".into()],
            ResourceType::Cnt,
            None,
            ConsistencyStrategy::AbandonMember,
            &accessor,
        )
        .unwrap();
        assert_eq!(result.mid, vec!["cnt1".to_string()]);
        assert_eq!(result.mt, ResourceType::Cnt);
    }

    #[test]
    fn abandon_group_rejects_on_first_mismatch() {
        let accessor = FakeAccessor(HashMap::from([("ae1", ResourceType::Ae)]));
        let err = validate_members(
            &["ae1".into()],
            ResourceType::Cnt,
            None,
            ConsistencyStrategy::AbandonGroup,
            &accessor,
        )
        .unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("mid"));
    }

    #[test]
    fn set_mixed_rewrites_member_type() {
        let accessor = FakeAccessor(HashMap::from([("cnt1", ResourceType::Cnt), ("ae1", ResourceType::Ae)]));
        let result = validate_members(
            &["cnt1".into(), "ae1".into()],
            ResourceType::Cnt,
            None,
            ConsistencyStrategy::SetMixed,
            &accessor,
        )
        .unwrap();
        assert_eq!(result.mid.len(), 2);
        assert_eq!(result.mt, ResourceType::Mixed);
    }

    #[test]
    fn mnm_exceeded_after_pruning_is_rejected() {
        let accessor = FakeAccessor(HashMap::from([("cnt1", ResourceType::Cnt), ("cnt2", ResourceType::Cnt)]));
        let err = validate_members(
            &["cnt1".into(), "cnt2".into()],
            ResourceType::Cnt,
            Some(1),
            ConsistencyStrategy::AbandonMember,
            &accessor,
        )
        .unwrap_err();
        assert_eq!(
            err.rsc,
            cse_core::rsc::ResponseStatusCode::MaxNumberOfMemberExceeded
        );
    }
}
