//! Scheduling domain models.
//!
//! Plain data types for problems and solutions. Everything here is
//! solver-agnostic; the MILP encoding lives in [`crate::milp`].
//!
//! # Domain Mappings
//!
//! | u-schedule-milp | Imaging department | Manufacturing |
//! |-----------------|--------------------|---------------|
//! | Task | Patient exam | Job |
//! | Machine | Scanner / MRI | Machine |
//! | Staff group | Technologist pool | Operator crew |
//! | Maintenance window | Calibration slot | Planned downtime |

mod maintenance;
mod objective;
mod problem;
mod schedule;
mod staff;
mod task;

pub use maintenance::{windows_for_machine, MaintenanceWindow};
pub use objective::{ObjectiveSpec, DEFAULT_COMPLETION_WEIGHT, DEFAULT_MAKESPAN_WEIGHT};
pub use problem::SchedulingProblem;
pub use schedule::{Schedule, ScheduleEntry, Violation, ViolationType};
pub use staff::StaffCapacity;
pub use task::Task;
