//! Resource and create-content builders shared across the workspace's
//! tests. Content builders return the flat attribute map
//! [`cse_dispatcher::Dispatcher::dispatch`] expects in `Request::content`
//! for a `Create`; resource builders return a bare [`Resource`] for tests
//! that poke storage or the notifier directly instead of going through
//! the dispatcher.

use cse_model::{Resource, ResourceType};
use serde_json::{json, Value};

/// A bare resource with no attributes beyond the universal set, for tests
/// that need a `Resource` without round-tripping through the dispatcher.
pub fn resource(ty: ResourceType, ri: &str, pi: Option<&str>, rn: &str, srn: &str) -> Resource {
    Resource::new(ty, ri.to_string(), pi.map(str::to_string), rn.to_string(), srn.to_string())
}

/// `<AE>` create content: `api` (app-id) and `rr` (request reachability).
pub fn ae_content(rn: &str, api: &str) -> Value {
    json!({ "rn": rn, "api": api, "rr": true })
}

/// `<CNT>` create content with an `mni` (max number of instances) cap.
pub fn cnt_content(rn: &str, mni: u64) -> Value {
    json!({ "rn": rn, "mni": mni })
}

/// `<CIN>` create content carrying `con` (content).
pub fn cin_content(con: Value) -> Value {
    json!({ "con": con })
}

/// `<TS>` create content with a `pei`/`mdt` missing-data monitoring pair.
pub fn ts_content(rn: &str, pei_ms: i64, mdt_ms: i64, mdn: Option<u64>) -> Value {
    let mut v = json!({
        "rn": rn,
        "pei": format!("PT{:.3}S", pei_ms as f64 / 1000.0),
        "mdt": format!("PT{:.3}S", mdt_ms as f64 / 1000.0),
    });
    if let Some(mdn) = mdn {
        v["mdn"] = json!(mdn);
    }
    v
}

/// `<TSI>` create content carrying `con` and an explicit `dgt` (data
/// generation time), for tests that need deterministic spacing.
pub fn tsi_content(con: Value, dgt: Option<&str>) -> Value {
    let mut v = json!({ "con": con });
    if let Some(dgt) = dgt {
        v["dgt"] = json!(dgt);
    }
    v
}

/// `<SUB>` create content: one or more notification URIs, the event
/// types to watch (`net` codes), and an optional batch policy.
pub fn sub_content(rn: &str, nu: Vec<&str>, net: Vec<i64>) -> Value {
    json!({
        "rn": rn,
        "nu": nu,
        "nct": 1,
        "enc": { "net": net },
    })
}

/// `<SUB>` create content requesting missing-data reports, with `mdn`
/// (missingDataMaxNr) set under `enc/md/num`.
pub fn missing_data_sub_content(rn: &str, nu: Vec<&str>, mdn: u64) -> Value {
    json!({
        "rn": rn,
        "nu": nu,
        "nct": 5,
        "enc": { "net": [8], "md": { "num": mdn } },
    })
}

/// `<ACP>` create content granting `acop` to every originator in `acor`.
pub fn acp_content(rn: &str, acor: Vec<&str>, acop: i64) -> Value {
    json!({
        "rn": rn,
        "pv": { "acr": [{ "acor": acor.clone(), "acop": acop }] },
        "pvs": { "acr": [{ "acor": acor, "acop": acop }] },
    })
}

/// `<GRP>` create content listing member resource IDs.
pub fn grp_content(rn: &str, mt: i64, members: Vec<&str>) -> Value {
    json!({ "rn": rn, "mt": mt, "mid": members })
}
