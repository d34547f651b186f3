//! Solve configuration.
//!
//! [`SolveOptions`] gathers every knob of one solve: which objective to
//! minimize, which model features to switch on, and the limits handed to the
//! MILP engine. Options deserialize from JSON with defaults for every field,
//! so a config file only needs to name what it changes.
//!
//! # Slot width
//! Staff capacity is enforced at discrete slot points spaced `slot_width`
//! apart. Narrow slots catch more overlaps but add binaries per task and
//! slot; concurrency between two slot points is not seen. Pick a width
//! no larger than the shortest task that shares a capacity-limited group.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::SchedulerError;
use crate::models::ObjectiveSpec;

/// Default engine time budget (seconds).
pub const DEFAULT_TIME_LIMIT_SECS: f64 = 30.0;

/// Default staff slot width (time units).
pub const DEFAULT_SLOT_WIDTH: f64 = 5.0;

/// How the engine should balance its search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFocus {
    /// Engine default.
    #[default]
    Balanced,
    /// Prefer finding feasible incumbents quickly.
    Feasibility,
    /// Prefer proving optimality.
    Optimality,
}

/// How deadlines enter the model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DeadlineMode {
    /// `end <= deadline` is a hard constraint.
    #[default]
    Hard,
    /// Lateness is allowed and penalized with the given weight.
    Soft {
        /// Penalty per unit of priority-weighted lateness.
        penalty: f64,
    },
}

/// Coefficients of the `multi_criteria` objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiCriteriaWeights {
    /// Makespan coefficient.
    pub makespan: f64,
    /// Weighted-completion coefficient.
    pub weighted_completion: f64,
    /// Coefficient of the per-staff-group finish times.
    pub staff_workload: f64,
}

impl Default for MultiCriteriaWeights {
    fn default() -> Self {
        Self {
            makespan: 1.0,
            weighted_completion: 0.5,
            staff_workload: 0.0,
        }
    }
}

/// Limits and hints handed to the MILP engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverLimits {
    /// Wall-clock budget.
    pub time_limit: Duration,
    /// Search strategy hint.
    pub focus: SearchFocus,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs_f64(DEFAULT_TIME_LIMIT_SECS),
            focus: SearchFocus::Balanced,
        }
    }
}

/// Options for one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Objective selector.
    pub objective: ObjectiveSpec,
    /// Engine time budget in seconds.
    pub time_limit_secs: f64,
    /// Engine search hint.
    pub search_focus: SearchFocus,
    /// Let tasks move to any of their eligible machines.
    pub allow_reassign: bool,
    /// Weight of priority-weighted lateness. Zero keeps deadlines hard.
    pub lateness_penalty: f64,
    /// Distance between staff capacity slot points.
    pub slot_width: f64,
    /// Weights of the `multi_criteria` objective.
    pub multi_criteria: MultiCriteriaWeights,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            objective: ObjectiveSpec::default(),
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            search_focus: SearchFocus::default(),
            allow_reassign: false,
            lateness_penalty: 0.0,
            slot_width: DEFAULT_SLOT_WIDTH,
            multi_criteria: MultiCriteriaWeights::default(),
        }
    }
}

impl SolveOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Sets the objective.
    pub fn with_objective(mut self, objective: ObjectiveSpec) -> Self {
        self.objective = objective;
        self
    }

    /// Sets the time budget in seconds.
    pub fn with_time_limit_secs(mut self, secs: f64) -> Self {
        self.time_limit_secs = secs;
        self
    }

    /// Sets the search hint.
    pub fn with_search_focus(mut self, focus: SearchFocus) -> Self {
        self.search_focus = focus;
        self
    }

    /// Enables or disables reassignment.
    pub fn with_reassignment(mut self, allow: bool) -> Self {
        self.allow_reassign = allow;
        self
    }

    /// Sets the lateness penalty (0 = hard deadlines).
    pub fn with_lateness_penalty(mut self, penalty: f64) -> Self {
        self.lateness_penalty = penalty;
        self
    }

    /// Sets the staff slot width.
    pub fn with_slot_width(mut self, width: f64) -> Self {
        self.slot_width = width;
        self
    }

    /// Sets the multi-criteria weights.
    pub fn with_multi_criteria(mut self, weights: MultiCriteriaWeights) -> Self {
        self.multi_criteria = weights;
        self
    }

    /// Deadline handling implied by the lateness penalty.
    pub fn deadline_mode(&self) -> DeadlineMode {
        if self.lateness_penalty > 0.0 {
            DeadlineMode::Soft {
                penalty: self.lateness_penalty,
            }
        } else {
            DeadlineMode::Hard
        }
    }

    /// Engine limits. Non-finite or negative budgets fall back to the default.
    pub fn limits(&self) -> SolverLimits {
        let secs = if self.time_limit_secs.is_finite() && self.time_limit_secs > 0.0 {
            self.time_limit_secs
        } else {
            DEFAULT_TIME_LIMIT_SECS
        };
        SolverLimits {
            time_limit: Duration::from_secs_f64(secs),
            focus: self.search_focus,
        }
    }

    /// Slot width. Non-positive widths fall back to the default.
    pub fn effective_slot_width(&self) -> f64 {
        if self.slot_width.is_finite() && self.slot_width > 0.0 {
            self.slot_width
        } else {
            DEFAULT_SLOT_WIDTH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SolveOptions::default();
        assert_eq!(opts.objective, ObjectiveSpec::WeightedCompletion);
        assert_eq!(opts.deadline_mode(), DeadlineMode::Hard);
        assert_eq!(opts.limits().time_limit, Duration::from_secs(30));
        assert_eq!(opts.effective_slot_width(), 5.0);
    }

    #[test]
    fn test_soft_deadlines_from_penalty() {
        let opts = SolveOptions::new().with_lateness_penalty(2.5);
        assert_eq!(opts.deadline_mode(), DeadlineMode::Soft { penalty: 2.5 });
    }

    #[test]
    fn test_partial_json() {
        let opts: SolveOptions = serde_json::from_str(
            r#"{"objective": "weighted_sum:2:1", "allow_reassign": true, "search_focus": "feasibility"}"#,
        )
        .unwrap();
        assert_eq!(opts.objective, ObjectiveSpec::WeightedSum { alpha: 2.0, beta: 1.0 });
        assert!(opts.allow_reassign);
        assert_eq!(opts.search_focus, SearchFocus::Feasibility);
        assert_eq!(opts.time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
        assert_eq!(opts.multi_criteria, MultiCriteriaWeights::default());
    }

    #[test]
    fn test_limits_sanitized() {
        let opts = SolveOptions::new().with_time_limit_secs(-1.0).with_slot_width(0.0);
        assert_eq!(opts.limits().time_limit, Duration::from_secs(30));
        assert_eq!(opts.effective_slot_width(), DEFAULT_SLOT_WIDTH);
    }
}
