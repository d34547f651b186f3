//! Task model.
//!
//! A task is a single, interruption-free unit of work that occupies one
//! machine (and optionally one staff group) for its whole duration.
//!
//! # Time Representation
//! All times are plain `f64` time units relative to a planning epoch (t=0).
//! The consumer defines the unit (minutes for appointment books, seconds for
//! production lines).
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A task to be scheduled.
///
/// `machine` is the machine the task runs on when assignments are fixed.
/// `eligible_machines` widens the candidate set when reassignment is enabled;
/// the primary `machine` is always a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Processing time (> 0).
    pub duration: f64,
    /// Primary machine.
    pub machine: String,
    /// Additional machines usable in reassignment mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eligible_machines: Vec<String>,
    /// Weight in completion-time objectives (>= 0).
    pub priority: f64,
    /// Earliest permissible start (>= 0).
    pub release: f64,
    /// Latest completion. `None` = unconstrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<f64>,
    /// Staff pool this task draws from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_group: Option<String>,
    /// Predecessor id → setup time required between the predecessor's
    /// completion and this task's start.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub setup_after: BTreeMap<String, f64>,
}

impl Task {
    /// Creates a task with default priority (1.0) and release (0.0).
    pub fn new(id: impl Into<String>, duration: f64, machine: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration,
            machine: machine.into(),
            eligible_machines: Vec::new(),
            priority: 1.0,
            release: 0.0,
            deadline: None,
            staff_group: None,
            setup_after: BTreeMap::new(),
        }
    }

    /// Sets the priority weight.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the release time.
    pub fn with_release(mut self, release: f64) -> Self {
        self.release = release;
        self
    }

    /// Sets the deadline (latest completion).
    pub fn with_deadline(mut self, deadline: f64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the staff group.
    pub fn with_staff_group(mut self, group: impl Into<String>) -> Self {
        self.staff_group = Some(group.into());
        self
    }

    /// Declares a setup time after `predecessor`.
    pub fn with_setup_after(mut self, predecessor: impl Into<String>, setup: f64) -> Self {
        self.setup_after.insert(predecessor.into(), setup);
        self
    }

    /// Sets the machines this task may be moved to in reassignment mode.
    pub fn with_eligible_machines<I, S>(mut self, machines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible_machines = machines.into_iter().map(Into::into).collect();
        self
    }

    /// Completion time when started at `start`.
    #[inline]
    pub fn completion_at(&self, start: f64) -> f64 {
        start + self.duration
    }

    /// Setup required when `predecessor_id` runs immediately before this task.
    ///
    /// Returns 0 when nothing is declared.
    pub fn setup_after_task(&self, predecessor_id: &str) -> f64 {
        self.setup_after.get(predecessor_id).copied().unwrap_or(0.0)
    }

    /// Machines this task may run on.
    ///
    /// With reassignment disabled this is just the primary machine. Otherwise
    /// it is the primary machine followed by the eligible set, deduplicated.
    pub fn candidate_machines(&self, allow_reassign: bool) -> Vec<&str> {
        let mut candidates = vec![self.machine.as_str()];
        if allow_reassign {
            for m in &self.eligible_machines {
                if !candidates.contains(&m.as_str()) {
                    candidates.push(m.as_str());
                }
            }
        }
        candidates
    }

    /// Whether this task draws from the given staff group.
    pub fn uses_staff_group(&self, group: &str) -> bool {
        self.staff_group.as_deref() == Some(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("P1", 20.0, "IRM1")
            .with_priority(5.0)
            .with_release(10.0)
            .with_deadline(120.0)
            .with_staff_group("TechA")
            .with_setup_after("P0", 5.0);

        assert_eq!(task.id, "P1");
        assert_eq!(task.machine, "IRM1");
        assert_eq!(task.priority, 5.0);
        assert_eq!(task.release, 10.0);
        assert_eq!(task.deadline, Some(120.0));
        assert!(task.uses_staff_group("TechA"));
        assert!(!task.uses_staff_group("TechB"));
        assert_eq!(task.setup_after_task("P0"), 5.0);
        assert_eq!(task.setup_after_task("P9"), 0.0);
        assert_eq!(task.completion_at(10.0), 30.0);
    }

    #[test]
    fn test_candidate_machines() {
        let task = Task::new("P1", 10.0, "IRM1").with_eligible_machines(["IRM2", "IRM1", "IRM3"]);

        assert_eq!(task.candidate_machines(false), vec!["IRM1"]);
        assert_eq!(task.candidate_machines(true), vec!["IRM1", "IRM2", "IRM3"]);
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::new("P1", 10.0, "M1");
        assert_eq!(task.priority, 1.0);
        assert_eq!(task.release, 0.0);
        assert!(task.deadline.is_none());
        assert!(task.staff_group.is_none());
        assert!(task.setup_after.is_empty());
    }

    #[test]
    fn test_task_serde_skips_empty_fields() {
        let json = serde_json::to_value(Task::new("P1", 10.0, "M1")).unwrap();
        assert!(json.get("deadline").is_none());
        assert!(json.get("setup_after").is_none());
        assert_eq!(json["machine"], "M1");
    }
}
