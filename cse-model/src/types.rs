//! oneM2M resource-type, permission, and notification enums (§3, §4, §7,
//! GLOSSARY). Grounded on the reference CSE's `acme/etc/Types.py`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// oneM2M resource type code (`ty`). Values match the reference
/// implementation's `ResourceTypes` so wire-level interop keeps the same
/// numeric space (§3 invariant: `ty` immutable after create).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResourceType {
    Mixed = 0,
    Acp = 1,
    Ae = 2,
    Cnt = 3,
    Cin = 4,
    CseBase = 5,
    Grp = 9,
    Node = 14,
    Pch = 15,
    Csr = 16,
    Req = 17,
    Sub = 23,
    FlexContainer = 28,
    Ts = 29,
    Tsi = 30,
    Actr = 63,
    Depr = 64,
    Sch = 65,
    Tsb = 66,
    Crs = 67,
    // Virtual children — not stored, resolved structurally by the dispatcher.
    CntLa = -20002,
    CntOl = -20001,
    TsLa = -20008,
    TsOl = -20007,
    GrpFopt = -20003,
    PchPcu = -20006,
    // Announced mirrors carry the same code offset the reference uses.
    AeAnnc = 10002,
    CntAnnc = 10003,
    CinAnnc = 10004,
    GrpAnnc = 10009,
    TsAnnc = 10029,
    TsiAnnc = 10030,
    ActrAnnc = 10063,
}

impl ResourceType {
    /// True for virtual child resources that are never persisted directly.
    pub fn is_virtual(self) -> bool {
        matches!(
            self,
            ResourceType::CntLa
                | ResourceType::CntOl
                | ResourceType::TsLa
                | ResourceType::TsOl
                | ResourceType::GrpFopt
                | ResourceType::PchPcu
        )
    }

    /// True for `<xAnnc>` announced-mirror resource types.
    pub fn is_announced(self) -> bool {
        matches!(
            self,
            ResourceType::AeAnnc
                | ResourceType::CntAnnc
                | ResourceType::CinAnnc
                | ResourceType::GrpAnnc
                | ResourceType::TsAnnc
                | ResourceType::TsiAnnc
                | ResourceType::ActrAnnc
        )
    }

    /// The announced-mirror type for this resource type, if any (§4.5).
    pub fn announced_variant(self) -> Option<ResourceType> {
        Some(match self {
            ResourceType::Ae => ResourceType::AeAnnc,
            ResourceType::Cnt => ResourceType::CntAnnc,
            ResourceType::Cin => ResourceType::CinAnnc,
            ResourceType::Grp => ResourceType::GrpAnnc,
            ResourceType::Ts => ResourceType::TsAnnc,
            ResourceType::Tsi => ResourceType::TsiAnnc,
            ResourceType::Actr => ResourceType::ActrAnnc,
            _ => return None,
        })
    }

    pub fn short_name(self) -> &'static str {
        use ResourceType::*;
        match self {
            Mixed => "mixed",
            Acp => "m2m:acp",
            Ae => "m2m:ae",
            Cnt => "m2m:cnt",
            Cin => "m2m:cin",
            CseBase => "m2m:cb",
            Grp => "m2m:grp",
            Node => "m2m:nod",
            Pch => "m2m:pch",
            Csr => "m2m:csr",
            Req => "m2m:req",
            Sub => "m2m:sub",
            FlexContainer => "m2m:fcnt",
            Ts => "m2m:ts",
            Tsi => "m2m:tsi",
            Actr => "m2m:actr",
            Depr => "m2m:dep",
            Sch => "m2m:sch",
            Tsb => "m2m:tsb",
            Crs => "m2m:crs",
            CntLa => "m2m:cnt_la",
            CntOl => "m2m:cnt_ol",
            TsLa => "m2m:ts_la",
            TsOl => "m2m:ts_ol",
            GrpFopt => "m2m:grp_fopt",
            PchPcu => "m2m:pch_pcu",
            AeAnnc => "m2m:aeA",
            CntAnnc => "m2m:cntA",
            CinAnnc => "m2m:cinA",
            GrpAnnc => "m2m:grpA",
            TsAnnc => "m2m:tsA",
            TsiAnnc => "m2m:tsiA",
            ActrAnnc => "m2m:actrA",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// CRUDN + discovery permission bitmask (§4.1, §7, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission(pub u8);

impl Permission {
    pub const NONE: Permission = Permission(0);
    pub const CREATE: Permission = Permission(1);
    pub const RETRIEVE: Permission = Permission(2);
    pub const UPDATE: Permission = Permission(4);
    pub const DELETE: Permission = Permission(8);
    pub const NOTIFY: Permission = Permission(16);
    pub const DISCOVERY: Permission = Permission(32);
    pub const ALL: Permission = Permission(63);

    pub fn contains(self, other: Permission) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }
}

/// The operation carried by a request (`op`, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Retrieve,
    Update,
    Delete,
    Notify,
    Discovery,
}

impl Operation {
    /// The permission required to perform this operation (§4.1 step 3).
    pub fn required_permission(self) -> Permission {
        match self {
            Operation::Create => Permission::CREATE,
            Operation::Retrieve => Permission::RETRIEVE,
            Operation::Update => Permission::UPDATE,
            Operation::Delete => Permission::DELETE,
            Operation::Notify => Permission::NOTIFY,
            Operation::Discovery => Permission::DISCOVERY,
        }
    }
}

/// Notification event types (`net`, §3, §4.3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum NotificationEventType {
    ResourceUpdate = 1,
    ResourceDelete = 2,
    CreateDirectChild = 3,
    DeleteDirectChild = 4,
    RetrieveCntNoChild = 5,
    TriggerReceivedForAe = 6,
    BlockingUpdate = 7,
    ReportOnGeneratedMissingDataPoints = 8,
    BlockingRetrieve = 9,
    BlockingRetrieveDirectChild = 10,
}

/// Notification content type (`nct`, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum NotificationContentType {
    All = 1,
    ModifiedAttributes = 2,
    Ri = 3,
    TriggerPayload = 4,
    TimeSeriesNotification = 5,
}

impl NotificationEventType {
    /// Whether this event type may be carried with the given content type
    /// (reference: `NotificationEventType.isAllowedNCT`).
    pub fn allows_content_type(self, nct: NotificationContentType) -> bool {
        use NotificationContentType as C;
        use NotificationEventType as E;
        match nct {
            C::All => matches!(
                self,
                E::ResourceUpdate | E::ResourceDelete | E::CreateDirectChild | E::DeleteDirectChild
            ),
            C::ModifiedAttributes => matches!(self, E::ResourceUpdate | E::BlockingUpdate),
            C::Ri => matches!(
                self,
                E::ResourceUpdate | E::ResourceDelete | E::CreateDirectChild | E::DeleteDirectChild
            ),
            C::TriggerPayload => matches!(self, E::TriggerReceivedForAe),
            C::TimeSeriesNotification => matches!(self, E::ReportOnGeneratedMissingDataPoints),
        }
    }
}

/// `<ACTR>` evaluation mode (§3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum EvalMode {
    Off = 0,
    Once = 1,
    Periodic = 2,
    Continuous = 3,
}

/// `<ACTR>` evaluation criteria operator (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum EvalCriteriaOperator {
    Equal = 1,
    NotEqual = 2,
    GreaterThan = 3,
    LessThan = 4,
    GreaterThanEqual = 5,
    LessThanEqual = 6,
}

/// Notification event category (`nec`, §4.6 schedule gating).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventCategory {
    Immediate = 2,
    BestEffort = 3,
    Latest = 4,
}

/// Announce disposition of an attribute (`MA`/`OA`/`NA`, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnounceDisposition {
    Na,
    Oa,
    Ma,
}

/// Group consistency strategy (`csy`, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConsistencyStrategy {
    AbandonMember = 1,
    AbandonGroup = 2,
    SetMixed = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_union_and_contains() {
        let p = Permission::CREATE.union(Permission::RETRIEVE);
        assert!(p.contains(Permission::CREATE));
        assert!(p.contains(Permission::RETRIEVE));
        assert!(!p.contains(Permission::DELETE));
    }

    #[test]
    fn operation_maps_to_expected_permission() {
        assert_eq!(Operation::Create.required_permission(), Permission::CREATE);
        assert_eq!(Operation::Discovery.required_permission(), Permission::DISCOVERY);
    }

    #[test]
    fn resource_update_allows_all_and_modified_and_ri_content() {
        let ev = NotificationEventType::ResourceUpdate;
        assert!(ev.allows_content_type(NotificationContentType::All));
        assert!(ev.allows_content_type(NotificationContentType::ModifiedAttributes));
        assert!(ev.allows_content_type(NotificationContentType::Ri));
        assert!(!ev.allows_content_type(NotificationContentType::TriggerPayload));
    }

    #[test]
    fn resource_type_roundtrips_short_name() {
        assert_eq!(ResourceType::Cnt.short_name(), "m2m:cnt");
        assert_eq!(ResourceType::Cnt.announced_variant(), Some(ResourceType::CntAnnc));
        assert!(ResourceType::CntLa.is_virtual());
        assert!(ResourceType::CntAnnc.is_announced());
    }
}
