//! Announced-mirror creation, update, and deletion against remote CSEs (§4.5).

pub mod announcer;
pub mod disposition;
pub mod remote;

pub use announcer::Announcer;
pub use disposition::select_announced_attributes;
pub use remote::{HttpRemoteCseClient, RemoteCseClient, RemoteCseDirectory};
