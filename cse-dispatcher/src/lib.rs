//! The CRUDN request pipeline: resolves a request's target, enforces
//! access control and attribute policy, commits to storage, emits change
//! events, and formats the response (SPEC_FULL.md §4.1).
//!
//! This crate is the seam where every other crate in the workspace meets.
//! None of `cse-model`, `cse-security`, `cse-notifier`, `cse-group`,
//! `cse-announce` or `cse-storage` depend on each other directly; they're
//! wired together here.

pub mod accessor;
pub mod activation;
pub mod discovery;
pub mod dispatcher;
pub mod forwarder;
pub mod locks;
pub mod polling;
pub mod request;
pub mod target;

pub use accessor::SnapshotAccessor;
pub use dispatcher::Dispatcher;
pub use forwarder::{CseForwarder, HttpCseForwarder, UnreachableForwarder};
pub use locks::ResourceLocks;
pub use polling::PollingChannelRegistry;
pub use request::{FilterCriteria, Request, Response, ResponseType, ResultContent};
pub use target::{LocalTarget, ResolvedTarget, VirtualChild};
