//! Delivery timing.

mod queue;
mod scheduler;

pub use queue::DeliveryQueue;
pub use scheduler::{
    DeliveryPlan, ResponseScheduler, ScheduleMode, ScheduledTurn, SchedulerConfig, StaggerRange,
};
