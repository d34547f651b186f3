//! MILP scheduling for tasks sharing machines and staff.
//!
//! Builds a mixed-integer linear program from a task set, solves it with a
//! pluggable engine and reads the schedule back. The formulation covers
//! shared-machine and shared-staff exclusion, sequence-dependent setups,
//! release times, hard or soft deadlines, maintenance blackouts,
//! slot-discretized staff capacity and optional machine reassignment.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `MaintenanceWindow`, `StaffCapacity`,
//!   `SchedulingProblem`, `Schedule`, `ObjectiveSpec`
//! - **`normalize`**: Raw JSON records to canonical tasks (lenient or strict)
//! - **`validation`**: Input integrity checks and schedule audits
//! - **`milp`**: Resource index, horizon sizing, model builder, objective
//!   composer, engine abstraction (`good_lp`)
//! - **`scheduler`**: Solve orchestration, objective comparison, KPIs
//! - **`worker`**: Background solve thread with a single in-flight job
//! - **`config`**: Solve options
//! - **`demo_data`**: Sample and random instances
//!
//! # Example
//!
//! ```no_run
//! use u_schedule_milp::config::SolveOptions;
//! use u_schedule_milp::models::{SchedulingProblem, Task};
//! use u_schedule_milp::scheduler::MilpScheduler;
//!
//! let problem = SchedulingProblem::new(vec![
//!     Task::new("P1", 20.0, "IRM1"),
//!     Task::new("P2", 10.0, "IRM1"),
//! ]);
//! let outcome = MilpScheduler::new()
//!     .solve(&problem, &SolveOptions::default())
//!     .unwrap();
//! assert_eq!(outcome.schedule.len(), 2);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Manne (1960), "On the Job-Shop Scheduling Problem"
//! - Ku & Beck (2016), "Mixed Integer Programming models for job shop scheduling"

pub mod config;
pub mod demo_data;
pub mod error;
pub mod milp;
pub mod models;
pub mod normalize;
pub mod scheduler;
pub mod validation;
pub mod worker;

pub use error::SchedulerError;
