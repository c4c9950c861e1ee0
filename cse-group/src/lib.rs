//! Group `fopt` fan-out and membership consistency enforcement (§4.4).

pub mod fanout;
pub mod membership;

pub use fanout::{fan_out, MemberDispatcher, MemberOutcome};
pub use membership::{validate_members, MemberAccessor, MembershipResult};
