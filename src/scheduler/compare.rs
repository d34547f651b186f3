//! Objective comparison.
//!
//! Runs the same problem once per objective and collects the outcomes side
//! by side. Runs are sequential and each builds its own model, so one run
//! cannot leak variables or constraints into another.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use tracing::{error, info, warn};

use super::kpi::ScheduleKpi;
use super::solve::{MilpScheduler, SolveOutcome};
use crate::config::SolveOptions;
use crate::error::{panic_message, SchedulerError};
use crate::milp::MilpEngine;
use crate::models::{ObjectiveSpec, SchedulingProblem};

/// What to do when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep going.
    #[default]
    Continue,
    /// Stop; remaining runs are reported as aborted.
    Abort,
}

/// One requested run.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRun {
    /// Label the result is reported under.
    pub label: String,
    /// Objective to minimize.
    pub objective: ObjectiveSpec,
    /// Options replacing the batch options for this run.
    pub options: Option<SolveOptions>,
}

impl ComparisonRun {
    /// A run labelled with the objective's selector.
    pub fn new(objective: ObjectiveSpec) -> Self {
        Self {
            label: objective.label(),
            objective,
            options: None,
        }
    }

    /// Overrides the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Uses `options` instead of the batch options.
    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = Some(options);
        self
    }
}

impl From<ObjectiveSpec> for ComparisonRun {
    fn from(objective: ObjectiveSpec) -> Self {
        Self::new(objective)
    }
}

/// Result of one run.
#[derive(Debug)]
pub struct ComparisonEntry {
    /// Run label.
    pub label: String,
    /// Objective the run minimized.
    pub objective: ObjectiveSpec,
    /// Outcome, or why the run could not be attempted.
    pub result: Result<SolveOutcome, SchedulerError>,
    /// KPIs of the solved schedule.
    pub kpi: Option<ScheduleKpi>,
}

impl ComparisonEntry {
    /// Whether the run produced a schedule.
    pub fn is_solved(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.is_solved())
    }

    /// Objective value, if solved.
    pub fn objective_value(&self) -> Option<f64> {
        self.result.as_ref().ok().and_then(|o| o.objective_value)
    }
}

/// Serializable row of a comparison report.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow<'a> {
    /// Run label.
    pub label: &'a str,
    /// Status or error text.
    pub status: String,
    /// Objective value.
    pub objective_value: Option<f64>,
    /// Outcome, when the run was attempted.
    pub outcome: Option<&'a SolveOutcome>,
    /// KPIs of the solved schedule.
    pub kpi: Option<&'a ScheduleKpi>,
}

/// Results of a comparison batch, in request order.
#[derive(Debug, Default)]
pub struct Comparison {
    /// One entry per requested run.
    pub entries: Vec<ComparisonEntry>,
}

impl Comparison {
    /// First entry with `label`.
    pub fn get(&self, label: &str) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that produced a schedule.
    pub fn solved(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.entries.iter().filter(|e| e.is_solved())
    }

    /// Report rows, in request order.
    pub fn rows(&self) -> Vec<ComparisonRow<'_>> {
        self.entries
            .iter()
            .map(|e| {
                let (status, outcome) = match &e.result {
                    Ok(outcome) => (outcome.status.to_string(), Some(outcome)),
                    Err(err) => (format!("error: {err}"), None),
                };
                ComparisonRow {
                    label: &e.label,
                    status,
                    objective_value: e.objective_value(),
                    outcome,
                    kpi: e.kpi.as_ref(),
                }
            })
            .collect()
    }
}

impl<E: MilpEngine> MilpScheduler<E> {
    /// Solves `problem` once per run.
    ///
    /// Always returns exactly one entry per run. A run that panics is
    /// recorded as [`SchedulerError::Panicked`] like any other failure. Under
    /// [`FailurePolicy::Abort`] the first run that errors or produces no
    /// schedule stops the batch and every later run is reported as
    /// [`SchedulerError::BatchAborted`].
    pub fn compare(
        &self,
        problem: &SchedulingProblem,
        runs: &[ComparisonRun],
        options: &SolveOptions,
        policy: FailurePolicy,
    ) -> Comparison {
        info!(runs = runs.len(), tasks = problem.tasks.len(), "Comparing objectives");
        let mut comparison = Comparison::default();
        let mut aborted_by: Option<String> = None;

        for run in runs {
            if let Some(failed) = &aborted_by {
                comparison.entries.push(ComparisonEntry {
                    label: run.label.clone(),
                    objective: run.objective,
                    result: Err(SchedulerError::BatchAborted(failed.clone())),
                    kpi: None,
                });
                continue;
            }

            let run_options = run
                .options
                .clone()
                .unwrap_or_else(|| options.clone())
                .with_objective(run.objective);
            let result = catch_unwind(AssertUnwindSafe(|| self.solve(problem, &run_options)))
                .unwrap_or_else(|payload| {
                    let err = SchedulerError::Panicked(panic_message(payload.as_ref()));
                    error!(label = %run.label, error = %err, "Comparison run aborted");
                    Err(err)
                });

            let kpi = match &result {
                Ok(outcome) if outcome.is_solved() => {
                    Some(ScheduleKpi::calculate(&outcome.schedule, &problem.tasks))
                }
                _ => None,
            };

            if kpi.is_none() {
                warn!(label = %run.label, "Comparison run produced no schedule");
                if policy == FailurePolicy::Abort {
                    aborted_by = Some(run.label.clone());
                }
            }

            comparison.entries.push(ComparisonEntry {
                label: run.label.clone(),
                objective: run.objective,
                result,
                kpi,
            });
        }

        comparison
    }
}
