//! Solver orchestration.
//!
//! [`MilpScheduler`] runs the full pipeline for one objective: validate,
//! build the model, compose the objective, hand the program to a
//! [`MilpEngine`], classify the termination and read the schedule back.
//! Every solve owns its model; nothing is shared between calls.

use std::time::Instant;

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::config::SolveOptions;
use crate::error::SchedulerError;
use crate::milp::{
    compose_objective, EngineStatus, GoodLpEngine, MilpEngine, ModelLayout, ScheduleModelBuilder,
};
use crate::models::{ObjectiveSpec, Schedule, ScheduleEntry, SchedulingProblem};
use crate::validation::{audit_schedule, validate_problem};

/// Slack added to the stage-one makespan in lexicographic solves.
pub const LEX_MAKESPAN_TOLERANCE: f64 = 1e-4;

/// Classified termination of a solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SolveStatus {
    /// Proven optimal.
    Optimal,
    /// Budget exhausted; the schedule is the best incumbent found.
    TimeLimitReached,
    /// No schedule satisfies the constraints.
    Infeasible,
    /// The objective has no finite minimum.
    Unbounded,
    /// Any other termination, with the engine's description.
    Failed(String),
}

impl SolveStatus {
    /// Whether a schedule was produced.
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Optimal | Self::TimeLimitReached)
    }

    /// Diagnostic for statuses that deserve one.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Optimal => None,
            Self::TimeLimitReached => {
                Some("time limit reached; best schedule found is not proven optimal".into())
            }
            Self::Infeasible => Some("no schedule satisfies all constraints".into()),
            Self::Unbounded => Some("objective is unbounded; the model is malformed".into()),
            Self::Failed(msg) => Some(format!("solver failed: {msg}")),
        }
    }
}

impl From<EngineStatus> for SolveStatus {
    fn from(status: EngineStatus) -> Self {
        match status {
            EngineStatus::Optimal => Self::Optimal,
            EngineStatus::TimeLimitReached => Self::TimeLimitReached,
            EngineStatus::Infeasible => Self::Infeasible,
            EngineStatus::Unbounded => Self::Unbounded,
            EngineStatus::Other(msg) => Self::Failed(msg),
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => f.write_str("optimal"),
            Self::TimeLimitReached => f.write_str("time_limit"),
            Self::Infeasible => f.write_str("infeasible"),
            Self::Unbounded => f.write_str("unbounded"),
            Self::Failed(_) => f.write_str("failed"),
        }
    }
}

/// Result of one solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    /// How the solve terminated.
    pub status: SolveStatus,
    /// Solved schedule. Empty unless [`SolveStatus::is_solved`].
    pub schedule: Schedule,
    /// Objective at the returned schedule.
    pub objective_value: Option<f64>,
    /// Diagnostic for non-optimal terminations.
    pub reason: Option<String>,
}

impl SolveOutcome {
    /// Outcome for an empty task set.
    pub fn empty() -> Self {
        Self {
            status: SolveStatus::Optimal,
            schedule: Schedule::new(),
            objective_value: None,
            reason: None,
        }
    }

    fn unsolved(status: SolveStatus) -> Self {
        Self {
            reason: status.reason(),
            status,
            schedule: Schedule::new(),
            objective_value: None,
        }
    }

    /// Whether a schedule was produced.
    pub fn is_solved(&self) -> bool {
        self.status.is_solved()
    }
}

/// MILP scheduler over a pluggable engine.
///
/// # Example
/// ```no_run
/// use u_schedule_milp::config::SolveOptions;
/// use u_schedule_milp::models::{ObjectiveSpec, SchedulingProblem, Task};
/// use u_schedule_milp::scheduler::MilpScheduler;
///
/// let problem = SchedulingProblem::new(vec![
///     Task::new("P1", 20.0, "IRM1").with_priority(5.0),
///     Task::new("P2", 30.0, "IRM1").with_setup_after("P1", 5.0),
/// ]);
/// let options = SolveOptions::new().with_objective(ObjectiveSpec::Makespan);
/// let outcome = MilpScheduler::new().solve(&problem, &options).unwrap();
/// assert!(outcome.is_solved());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MilpScheduler<E = GoodLpEngine> {
    engine: E,
}

impl MilpScheduler<GoodLpEngine> {
    /// Creates a scheduler on the bundled `good_lp` engine.
    pub fn new() -> Self {
        Self {
            engine: GoodLpEngine::new(),
        }
    }
}

impl<E: MilpEngine> MilpScheduler<E> {
    /// Creates a scheduler on a custom engine.
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Solves `problem` under `options`.
    ///
    /// An empty task set returns an empty schedule without invoking the
    /// engine. Structurally invalid input is rejected with
    /// [`SchedulerError::Validation`]; infeasibility and other engine
    /// terminations are reported through [`SolveOutcome::status`].
    pub fn solve(
        &self,
        problem: &SchedulingProblem,
        options: &SolveOptions,
    ) -> Result<SolveOutcome, SchedulerError> {
        if problem.is_empty() {
            info!("Empty task set, nothing to solve");
            return Ok(SolveOutcome::empty());
        }
        validate_problem(problem).map_err(SchedulerError::Validation)?;

        info!(
            tasks = problem.tasks.len(),
            objective = %options.objective,
            reassign = options.allow_reassign,
            engine = self.engine.name(),
            "Solving schedule"
        );
        let started = Instant::now();

        let outcome = match options.objective {
            ObjectiveSpec::LexMakespan => self.solve_lexicographic(problem, options),
            spec => self.solve_stage(problem, options, spec, None),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if outcome.is_solved() {
            info!(
                status = %outcome.status,
                objective = ?outcome.objective_value,
                makespan = outcome.schedule.makespan(),
                elapsed_ms,
                "Solve finished"
            );
        } else {
            warn!(
                status = %outcome.status,
                reason = outcome.reason.as_deref().unwrap_or_default(),
                elapsed_ms,
                "Solve produced no schedule"
            );
        }

        Ok(outcome)
    }

    /// Makespan first, then weighted completion under that makespan.
    fn solve_lexicographic(
        &self,
        problem: &SchedulingProblem,
        options: &SolveOptions,
    ) -> SolveOutcome {
        let first = self.solve_stage(problem, options, ObjectiveSpec::Makespan, None);
        if !first.is_solved() {
            return first;
        }

        let best = first.schedule.makespan();
        let second = self.solve_stage(
            problem,
            options,
            ObjectiveSpec::WeightedCompletion,
            Some(best + LEX_MAKESPAN_TOLERANCE),
        );
        if !second.is_solved() {
            warn!(status = %second.status, "Second lexicographic stage failed; keeping makespan stage");
            return first;
        }

        let status = if first.status == SolveStatus::TimeLimitReached {
            SolveStatus::TimeLimitReached
        } else {
            second.status.clone()
        };
        SolveOutcome {
            reason: status.reason(),
            status,
            ..second
        }
    }

    /// One model, one engine call.
    fn solve_stage(
        &self,
        problem: &SchedulingProblem,
        options: &SolveOptions,
        spec: ObjectiveSpec,
        makespan_cap: Option<f64>,
    ) -> SolveOutcome {
        let deadlines = options.deadline_mode();
        let mut model = ScheduleModelBuilder::from_options(problem, options).build();
        if let Some(cap) = makespan_cap {
            model.cap_makespan(cap);
        }
        let objective =
            compose_objective(&mut model, problem, spec, &options.multi_criteria, deadlines);

        let (milp, layout) = model.into_problem(objective.to_expression());
        let mut watch = layout.watch_list();
        watch.extend(objective.variables());

        let result = self.engine.optimize(milp, &options.limits(), &watch);
        let status = SolveStatus::from(result.status);
        if !status.is_solved() {
            return SolveOutcome::unsolved(status);
        }
        if result.values.len() != watch.len() {
            return SolveOutcome::unsolved(SolveStatus::Failed(format!(
                "engine returned {} values for {} variables",
                result.values.len(),
                watch.len()
            )));
        }

        let (layout_values, objective_values) = result.values.split_at(layout.watch_len());
        let mut schedule = extract_schedule(problem, &layout, layout_values);
        for violation in audit_schedule(problem, &schedule, deadlines, options.effective_slot_width()) {
            warn!(
                kind = ?violation.violation_type,
                entity = %violation.entity_id,
                "{}",
                violation.message
            );
            schedule.add_violation(violation);
        }

        SolveOutcome {
            reason: status.reason(),
            status,
            schedule,
            objective_value: Some(objective.evaluate(objective_values)),
        }
    }
}

/// Reads starts (and chosen machines) back into a schedule.
fn extract_schedule(problem: &SchedulingProblem, layout: &ModelLayout, values: &[f64]) -> Schedule {
    let (starts, mut assignment_values) = values.split_at(layout.starts.len());
    let mut schedule = Schedule::new();

    for (i, task) in problem.tasks.iter().enumerate() {
        let start = starts[i];
        let ys = &layout.assignments[i];

        let machine = if ys.is_empty() {
            task.machine.clone()
        } else {
            let (mine, rest) = assignment_values.split_at(ys.len());
            assignment_values = rest;
            ys.iter()
                .zip(mine)
                .max_by(|a, b| a.1.total_cmp(b.1))
                .and_then(|(&(m, _), _)| layout.index.machine_name(m))
                .unwrap_or(task.machine.as_str())
                .to_string()
        };

        let end = task.completion_at(start);
        schedule.add_entry(ScheduleEntry {
            id: task.id.clone(),
            machine,
            start,
            end,
            duration: task.duration,
            priority: task.priority,
            staff_group: task.staff_group.clone(),
            lateness: task.deadline.map(|d| (end - d).max(0.0)),
        });
    }

    schedule
}
