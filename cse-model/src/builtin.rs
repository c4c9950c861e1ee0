//! Built-in per-type attribute policies and enumeration value tables,
//! grounded on the reference implementation's resource classes
//! (`acme/resources/*.py`) and `acme/etc/Types.py`.

use crate::policy::{AttributeDataType::*, AttributePolicy, Optionality::*};
use crate::types::{AnnounceDisposition as A, ResourceType};

/// Per-type attribute tables (§4.2). Only attributes specific to the type
/// are listed here; universal/common attributes come from
/// `PolicyRegistry::common_attributes`.
pub(crate) fn builtin_type_policies() -> Vec<(ResourceType, Vec<AttributePolicy>)> {
    vec![
        (ResourceType::CseBase, cse_base_attributes()),
        (ResourceType::Ae, ae_attributes()),
        (ResourceType::Cnt, cnt_attributes()),
        (ResourceType::Cin, cin_attributes()),
        (ResourceType::Sub, sub_attributes()),
        (ResourceType::Acp, acp_attributes()),
        (ResourceType::Grp, grp_attributes()),
        (ResourceType::Ts, ts_attributes()),
        (ResourceType::Tsi, tsi_attributes()),
        (ResourceType::Actr, actr_attributes()),
        (ResourceType::Depr, depr_attributes()),
        (ResourceType::Sch, sch_attributes()),
        (ResourceType::Crs, crs_attributes()),
        (ResourceType::Csr, csr_attributes()),
        (ResourceType::Tsb, tsb_attributes()),
    ]
}

pub(crate) fn builtin_enum_tables() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        ("evm", vec!["0", "1", "2", "3"]),
        ("optr", vec!["1", "2", "3", "4", "5", "6"]),
        ("csy", vec!["1", "2", "3"]),
        ("twt", vec!["1", "2"]),
    ]
}

fn cse_base_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("csi", "cseID", String, M, Np, O, A::Na),
        AttributePolicy::new("cst", "cseType", Integer, M, Np, O, A::Na),
        AttributePolicy::new("csz", "contentSerialization", List(Box::new(String)), O, O, O, A::Na),
        AttributePolicy::new("srt", "supportedResourceType", List(Box::new(Integer)), M, Np, O, A::Na),
        AttributePolicy::new("poa", "pointOfAccess", List(Box::new(AnyUri)), O, O, O, A::Na),
        AttributePolicy::new("rr", "requestReachability", Boolean, M, O, O, A::Na),
        AttributePolicy::new("nl", "nodeLink", AnyUri, O, O, O, A::Na),
    ]
}

fn ae_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("aei", "aeID", String, Np, Np, O, A::Ma),
        AttributePolicy::new("apn", "appName", String, O, O, O, A::Oa),
        AttributePolicy::new("api", "appID", String, M, Np, O, A::Ma),
        AttributePolicy::new("rr", "requestReachability", Boolean, M, M, O, A::Ma),
        AttributePolicy::new("csz", "contentSerialization", List(Box::new(String)), O, O, O, A::Oa),
        AttributePolicy::new("poa", "pointOfAccess", List(Box::new(AnyUri)), O, O, O, A::Oa),
        AttributePolicy::new("nl", "nodeLink", AnyUri, O, O, O, A::Oa),
        AttributePolicy::new("or", "ontologyRef", AnyUri, O, O, O, A::Oa),
    ]
}

fn cnt_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("mni", "maxNrOfInstances", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("mbs", "maxByteSize", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("mia", "maxInstanceAge", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("cni", "currentNrOfInstances", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("cbs", "currentByteSize", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("li", "locationID", String, O, Np, O, A::Na),
        AttributePolicy::new("or", "ontologyRef", AnyUri, O, O, O, A::Oa),
        AttributePolicy::new("disr", "disableRetrieval", Boolean, O, O, O, A::Na),
    ]
}

fn cin_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("cnf", "contentInfo", String, O, Np, O, A::Oa),
        AttributePolicy::new("cs", "contentSize", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("con", "content", Any, M, Np, O, A::Oa),
        AttributePolicy::new("or", "ontologyRef", AnyUri, O, Np, O, A::Oa),
    ]
}

fn sub_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("enc", "eventNotificationCriteria", Complex("m2m:eventNotificationCriteria"), O, O, O, A::Na),
        AttributePolicy::new("exc", "expirationCounter", PositiveInteger, O, O, O, A::Na),
        AttributePolicy::new("nu", "notificationURI", ListNonEmpty(Box::new(AnyUri)), M, O, O, A::Na),
        AttributePolicy::new("gpi", "groupID", String, O, O, O, A::Na),
        AttributePolicy::new("nfu", "notificationForwardingURI", AnyUri, O, O, O, A::Na),
        AttributePolicy::new("bn", "batchNotify", Complex("m2m:batchNotify"), O, O, O, A::Na),
        AttributePolicy::new("rl", "rateLimit", Complex("m2m:rateLimit"), O, O, O, A::Na),
        AttributePolicy::new("psn", "preSubscriptionNotify", NonNegativeInteger, O, O, O, A::Na),
        AttributePolicy::new("pn", "pendingNotification", Enum("m2m:pendingNotification"), O, O, O, A::Na),
        AttributePolicy::new("nsp", "notificationStoragePriority", NonNegativeInteger, O, O, O, A::Na),
        AttributePolicy::new("ln", "latestNotify", Boolean, O, O, O, A::Na),
        AttributePolicy::new("nct", "notificationContentType", Integer, M, O, O, A::Na),
        AttributePolicy::new("nec", "notificationEventCat", Integer, O, O, O, A::Na),
        AttributePolicy::new("su", "subscriberURI", AnyUri, O, Np, O, A::Na),
        AttributePolicy::new("acrs", "associatedCrossResourceSub", List(Box::new(String)), O, O, O, A::Na),
    ]
}

fn acp_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("pv", "privileges", Complex("m2m:setOfAcrs"), M, O, O, A::Oa),
        AttributePolicy::new("pvs", "selfPrivileges", Complex("m2m:setOfAcrs"), M, O, O, A::Oa),
    ]
}

fn grp_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("mt", "memberType", Integer, M, O, O, A::Oa),
        AttributePolicy::new("cnm", "currentNrOfMembers", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("mnm", "maxNrOfMembers", PositiveInteger, M, O, O, A::Oa),
        AttributePolicy::new("mid", "memberIDs", ListNonEmpty(Box::new(AnyUri)), M, O, O, A::Oa),
        AttributePolicy::new("macp", "memberTypeValidated", Boolean, Np, Np, O, A::Oa),
        AttributePolicy::new("csy", "consistencyStrategy", Integer, O, O, O, A::Oa),
        AttributePolicy::new("mtv", "memberTypeValidated", Boolean, Np, Np, O, A::Oa),
        AttributePolicy::new("nar", "nodeArray", List(Box::new(String)), Np, Np, Np, A::Na),
    ]
}

fn ts_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("mni", "maxNrOfInstances", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("mbs", "maxByteSize", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("mia", "maxInstanceAge", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("cni", "currentNrOfInstances", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("cbs", "currentByteSize", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("pei", "periodicInterval", Duration, O, O, O, A::Oa),
        AttributePolicy::new("mdt", "missingDataDetectTime", Duration, O, O, O, A::Oa),
        AttributePolicy::new("mdn", "missingDataMaxNr", PositiveInteger, O, O, O, A::Oa),
        AttributePolicy::new("mdlt", "missingDataList", List(Box::new(Timestamp)), Np, Np, O, A::Na),
        AttributePolicy::new("mdc", "missingDataCurrentNr", NonNegativeInteger, Np, Np, O, A::Na),
    ]
}

fn tsi_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("dgt", "dataGenerationTime", AbsRelTimestamp, M, Np, O, A::Oa),
        AttributePolicy::new("con", "content", Any, M, Np, O, A::Oa),
        AttributePolicy::new("cs", "contentSize", NonNegativeInteger, Np, Np, O, A::Oa),
        AttributePolicy::new("snr", "sequenceNr", NonNegativeInteger, O, Np, O, A::Na),
    ]
}

fn actr_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("sbjt", "subject", String, M, O, O, A::Na),
        AttributePolicy::new("dep", "dependency", String, O, O, O, A::Na),
        AttributePolicy::new("apy", "actionPriority", NonNegativeInteger, O, O, O, A::Na),
        AttributePolicy::new("evm", "evalMode", Integer, M, O, O, A::Na),
        AttributePolicy::new("evc", "evalControlParams", Complex("m2m:evalControlParams"), O, O, O, A::Na),
        AttributePolicy::new("ecp", "evalCriteria", Complex("m2m:evalCriteria"), M, O, O, A::Na),
        AttributePolicy::new("orc", "originatorToRequestFor", AnyUri, M, O, O, A::Na),
        AttributePolicy::new("apv", "actionToPerform", Complex("m2m:actionToPerform"), M, O, O, A::Na),
        AttributePolicy::new("air", "actionInputResources", List(Box::new(String)), O, O, O, A::Na),
        AttributePolicy::new("acn", "actionStatus", Integer, Np, Np, O, A::Na),
    ]
}

fn depr_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("sfc", "sequentialFlowControl", Boolean, O, O, O, A::Na),
        AttributePolicy::new("rri", "referencedResourceID", String, M, O, O, A::Na),
        AttributePolicy::new("evc", "evalCriteria", Complex("m2m:evalCriteria"), M, O, O, A::Na),
        AttributePolicy::new("apv", "actionToPerform", Complex("m2m:actionToPerform"), M, O, O, A::Na),
        AttributePolicy::new("acn", "actionStatus", Integer, Np, Np, O, A::Na),
    ]
}

fn sch_attributes() -> Vec<AttributePolicy> {
    vec![AttributePolicy::new("se", "scheduleEntries", ListNonEmpty(Box::new(String)), M, O, O, A::Na)]
}

fn crs_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("twt", "timeWindowType", Integer, M, O, O, A::Na),
        AttributePolicy::new("tws", "timeWindowSize", Duration, M, O, O, A::Na),
        AttributePolicy::new("rrat", "regularResourceAsTarget", ListNonEmpty(Box::new(String)), O, O, O, A::Na),
        AttributePolicy::new("nu", "notificationURI", ListNonEmpty(Box::new(AnyUri)), O, O, O, A::Na),
        AttributePolicy::new("eem", "eventEvaluationMode", Integer, O, O, O, A::Na),
        AttributePolicy::new("encs", "encapsulatedCriteria", Complex("m2m:eventNotificationCriteria"), O, O, O, A::Na),
        AttributePolicy::new("acrs", "associatedCrossResourceSub", List(Box::new(String)), O, O, O, A::Na),
    ]
}

fn tsb_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("bcni", "beaconInterval", Duration, M, O, O, A::Na),
        AttributePolicy::new("bcnu", "beaconNotificationURI", ListNonEmpty(Box::new(AnyUri)), M, O, O, A::Na),
    ]
}

fn csr_attributes() -> Vec<AttributePolicy> {
    vec![
        AttributePolicy::new("csi", "cseID", String, M, Np, O, A::Na),
        AttributePolicy::new("poa", "pointOfAccess", List(Box::new(AnyUri)), O, O, O, A::Na),
        AttributePolicy::new("cb", "cseBase", AnyUri, M, O, O, A::Na),
        AttributePolicy::new("rr", "requestReachability", Boolean, M, O, O, A::Na),
        AttributePolicy::new("csz", "contentSerialization", List(Box::new(String)), O, O, O, A::Na),
    ]
}
