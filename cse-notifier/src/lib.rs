//! Subscription verification/deletion handshakes, event-driven matching,
//! `bn` batching, and `<crs>` windowing (§4.3, §4.6 of SPEC_FULL.md).

pub mod batch;
pub mod crs;
pub mod crs_manager;
pub mod matcher;
pub mod notifier;
pub mod registry;
pub mod sender;
pub mod subscription;

pub use batch::BatchCoordinator;
pub use crs::{CrsConfig, EventEvaluationMode, TimeWindowType, WindowTracker};
pub use crs_manager::{synthetic_uri, CrsManager, RoutingSender};
pub use matcher::{matches, MatchInput};
pub use notifier::Notifier;
pub use registry::SubscriptionRegistry;
pub use sender::{DeliveryOutcome, NotificationSender, RecordingSender};
pub use subscription::{BatchPolicy, SubscriptionConfig};
