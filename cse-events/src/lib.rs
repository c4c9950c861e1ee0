//! The CSE's in-process event bus and the resource-change event types
//! carried over it (§4.1 step 6, §9 design note: components communicate
//! through the bus rather than cyclic direct calls).

pub mod bus;
pub mod events;

pub use bus::EventBus;
pub use events::{
    ContainerRetrievedWithNoChild, MissingDataDetected, ResourceCreated, ResourceDeleted,
    ResourceUpdated, TriggerReceivedForAe,
};
