//! MILP engine abstraction.
//!
//! The scheduler talks to solvers through [`MilpEngine`] so the model
//! builder stays independent of any backend and tests can substitute
//! scripted engines. [`GoodLpEngine`] runs models on `good_lp`'s bundled
//! pure-Rust `microlp` backend under the configured time budget.

use std::time::Instant;

use good_lp::{
    default_solver, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionStatus, SolverModel, Variable, WithMipGap, WithTimeLimit,
};
use tracing::{debug, warn};

use crate::config::{SearchFocus, SolverLimits};

/// A complete minimization problem.
pub struct MilpProblem {
    /// Decision variables with bounds and integrality.
    pub variables: ProblemVariables,
    /// Objective to minimize.
    pub objective: Expression,
    /// Linear constraints.
    pub constraints: Vec<Constraint>,
}

/// How an engine run terminated.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineStatus {
    /// Proven optimal.
    Optimal,
    /// Budget exhausted; values hold the best incumbent.
    TimeLimitReached,
    /// No assignment satisfies the constraints.
    Infeasible,
    /// Objective has no finite minimum.
    Unbounded,
    /// Any other termination.
    Other(String),
}

impl EngineStatus {
    /// Whether the run produced variable values.
    pub fn has_solution(&self) -> bool {
        matches!(self, Self::Optimal | Self::TimeLimitReached)
    }
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSolution {
    /// Termination status.
    pub status: EngineStatus,
    /// Values of the watched variables, in request order. Empty unless
    /// [`EngineStatus::has_solution`].
    pub values: Vec<f64>,
}

impl EngineSolution {
    /// A run that produced no values.
    pub fn without_values(status: EngineStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }
}

/// A MILP backend.
pub trait MilpEngine {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Minimizes `problem` and reports the values of `watch`.
    fn optimize(
        &self,
        problem: MilpProblem,
        limits: &SolverLimits,
        watch: &[Variable],
    ) -> EngineSolution;
}

/// Relative gap accepted when the search focuses on feasibility.
pub const FEASIBILITY_MIP_GAP: f32 = 0.05;

/// `good_lp` with the `microlp` branch-and-bound backend.
///
/// The time budget is handed to microlp. When it runs out with an incumbent
/// the run reports [`EngineStatus::TimeLimitReached`]; when it runs out
/// before any feasible point is found the run reports
/// [`EngineStatus::Other`]. [`SearchFocus::Feasibility`] accepts a
/// [`FEASIBILITY_MIP_GAP`] relative gap, which is reported the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpEngine;

impl GoodLpEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

impl MilpEngine for GoodLpEngine {
    fn name(&self) -> &str {
        "good_lp/microlp"
    }

    fn optimize(
        &self,
        problem: MilpProblem,
        limits: &SolverLimits,
        watch: &[Variable],
    ) -> EngineSolution {
        let MilpProblem {
            variables,
            objective,
            constraints,
        } = problem;

        let mut model = variables
            .minimise(objective)
            .using(default_solver)
            .with_time_limit(limits.time_limit.as_secs_f64());
        if limits.focus == SearchFocus::Feasibility {
            model = match model.with_mip_gap(FEASIBILITY_MIP_GAP) {
                Ok(model) => model,
                Err(err) => {
                    return EngineSolution::without_values(EngineStatus::Other(err.to_string()))
                }
            };
        }
        for c in constraints {
            model.add_constraint(c);
        }

        let started = Instant::now();
        let result = model.solve();
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            limit_ms = limits.time_limit.as_millis() as u64,
            focus = ?limits.focus,
            "Engine returned"
        );

        match result {
            Ok(solution) => {
                let status = match solution.status() {
                    SolutionStatus::Optimal => EngineStatus::Optimal,
                    SolutionStatus::TimeLimit | SolutionStatus::GapLimit => {
                        EngineStatus::TimeLimitReached
                    }
                };
                EngineSolution {
                    status,
                    values: watch.iter().map(|&v| solution.value(v)).collect(),
                }
            }
            Err(ResolutionError::Infeasible) => {
                EngineSolution::without_values(EngineStatus::Infeasible)
            }
            Err(ResolutionError::Unbounded) => {
                EngineSolution::without_values(EngineStatus::Unbounded)
            }
            Err(other) => {
                warn!(error = %other, "Engine stopped without a solution");
                EngineSolution::without_values(EngineStatus::Other(other.to_string()))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use good_lp::{constraint, variable};

    fn tiny_problem(lower: f64, upper: f64) -> (MilpProblem, Variable) {
        let mut variables = ProblemVariables::new();
        let x = variables.add(variable().min(0.0).name("x"));
        let bound = Expression::from(x);
        let floor = Expression::from(x);
        let problem = MilpProblem {
            variables,
            objective: Expression::from(x),
            constraints: vec![constraint!(floor >= lower), constraint!(bound <= upper)],
        };
        (problem, x)
    }

    #[test]
    fn test_optimal_values_in_watch_order() {
        let (problem, x) = tiny_problem(3.0, 10.0);
        let solution = GoodLpEngine::new().optimize(problem, &SolverLimits::default(), &[x, x]);
        assert_eq!(solution.status, EngineStatus::Optimal);
        assert_eq!(solution.values.len(), 2);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let (problem, x) = tiny_problem(10.0, 3.0);
        let solution = GoodLpEngine::new().optimize(problem, &SolverLimits::default(), &[x]);
        assert_eq!(solution.status, EngineStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_feasibility_focus_still_solves() {
        let (problem, x) = tiny_problem(3.0, 10.0);
        let limits = SolverLimits {
            focus: SearchFocus::Feasibility,
            ..SolverLimits::default()
        };
        let solution = GoodLpEngine::new().optimize(problem, &limits, &[x]);
        assert!(solution.status.has_solution());
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_status_has_solution() {
        assert!(EngineStatus::Optimal.has_solution());
        assert!(EngineStatus::TimeLimitReached.has_solution());
        assert!(!EngineStatus::Unbounded.has_solution());
        assert!(!EngineStatus::Other("x".into()).has_solution());
    }
}
