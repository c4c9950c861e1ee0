//! Shared test fixtures for the workspace: resource builders and a fully
//! wired in-memory [`Dispatcher`](cse_dispatcher::Dispatcher) harness, so
//! every crate's integration tests start from the same seeded CSE instead
//! of re-deriving the wiring dispatcher's own unit tests already did.

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::{Harness, ADMIN_ORIGINATOR};
