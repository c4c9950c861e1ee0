//! Typed oneM2M resource model: resource types, the universal resource
//! node, the attribute-policy registry, the validation engine, and the
//! per-type lifecycle hooks layered on top of it (§3, §4.1, §4.2, §4.6).

mod builtin;

pub mod action;
pub mod factory;
pub mod policy;
pub mod resource;
pub mod types;
pub mod validator;

pub use action::{ActionToPerform, EvalCriteria};
pub use policy::{AttributeDataType, AttributePolicy, FlexContainerSpecialization, Optionality, PolicyRegistry};
pub use resource::{allowed_child_types, Resource};
pub use types::*;
pub use validator::{Validator, ValidationContext};
