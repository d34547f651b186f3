//! MILP formulation of the scheduling problem.
//!
//! - [`index`]: dense machine and staff-group indices
//! - [`horizon`]: planning horizon and big-M sizing
//! - [`builder`]: constraint model with feature flags
//! - [`objective`]: objective composition
//! - [`engine`]: solver backend abstraction
//!
//! # Reference
//! - Pinedo (2016), "Scheduling", Ch. 3.5 (Disjunctive Programming)
//! - Williams (2013), "Model Building in Mathematical Programming", Ch. 9

pub mod builder;
pub mod engine;
pub mod horizon;
pub mod index;
pub mod objective;

pub use builder::{ModelLayout, ModelStats, ScheduleModel, ScheduleModelBuilder, SLOT_EPSILON};
pub use engine::{EngineSolution, EngineStatus, GoodLpEngine, MilpEngine, MilpProblem};
pub use horizon::Horizon;
pub use index::ResourceIndex;
pub use objective::{compose_objective, LinearObjective};
