//! Cycle orchestration and scheduling.
//!
//! The [`Scheduler`] turns cron expressions into [`Trigger`]s; the
//! [`Orchestrator`] runs one pipeline cycle per trigger.

pub mod orchestrator;
pub mod schedule;
pub mod trigger;

pub use orchestrator::{CycleReport, CycleState, Orchestrator};
pub use schedule::{CronExpr, Schedule, ScheduleError, Scheduler};
pub use trigger::{Trigger, TriggerSource};
