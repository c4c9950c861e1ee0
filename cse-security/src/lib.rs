//! Access-control policy evaluation (§4.1 step 3), grounded on the
//! teacher's OpenFGA guard/cache/registry split (`r2e-openfga`) but
//! adapted to oneM2M's `<ACP>` privilege-rule model rather than a
//! Zanzibar relationship graph.

pub mod acp;
pub mod cache;
pub mod guard;

pub use acp::{AccessControlPolicy, AccessControlRule};
pub use guard::SecurityGuard;
