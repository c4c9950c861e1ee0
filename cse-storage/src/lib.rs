//! Document-table storage abstraction (§4, §9): the `Store` trait plus a
//! `DashMap`-backed in-memory implementation.

pub mod memory;
pub mod store;

pub use memory::InMemoryStore;
pub use store::{BufferedNotification, RequestRecord, Store};
