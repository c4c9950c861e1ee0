//! Background task scheduling and `<schedule>` active-window evaluation
//! (§4.6, §A.1 of SPEC_FULL.md).

pub mod job;
pub mod schedule_window;

pub use job::{JobRegistry, ScheduleConfig, Scheduler, ScheduledJobInfo, ScheduledTask};
pub use schedule_window::is_active;
