//! MILP scheduling, objective comparison and KPI evaluation.
//!
//! # Pipeline
//!
//! `MilpScheduler::solve` validates the problem, builds one constraint
//! model, composes the selected objective, runs the engine and reads the
//! schedule back. `MilpScheduler::compare` repeats that pipeline once per
//! objective over the same problem.
//!
//! # KPI
//!
//! `ScheduleKpi` computes standard scheduling metrics: makespan, weighted
//! completion, lateness, on-time rate, utilization, staff workload and
//! flow time.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - T'kindt & Billaut (2006), "Multicriteria Scheduling"

mod compare;
mod kpi;
mod solve;

pub use compare::{Comparison, ComparisonEntry, ComparisonRow, ComparisonRun, FailurePolicy};
pub use kpi::ScheduleKpi;
pub use solve::{MilpScheduler, SolveOutcome, SolveStatus, LEX_MAKESPAN_TOLERANCE};
