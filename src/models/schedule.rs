//! Schedule (solution) model.
//!
//! A schedule lists, per task, the realized machine and time interval.
//! Audits attach [`Violation`]s when a schedule breaks a constraint of the
//! problem it was produced for.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete schedule (solution to a scheduling problem).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// One entry per scheduled task.
    pub entries: Vec<ScheduleEntry>,
    /// Constraint violations detected by an audit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// The realized placement of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Task ID.
    pub id: String,
    /// Machine the task runs on.
    pub machine: String,
    /// Start time.
    pub start: f64,
    /// End time (`start + duration`).
    pub end: f64,
    /// Processing time.
    pub duration: f64,
    /// Priority weight.
    pub priority: f64,
    /// Staff group, if any.
    pub staff_group: Option<String>,
    /// `max(0, end - deadline)` for tasks with a deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lateness: Option<f64>,
}

/// A constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (task, machine or staff group).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Two tasks overlap on a machine (setup included).
    MachineOverlap,
    /// Two tasks of an exclusive staff group overlap.
    StaffOverlap,
    /// A staff group exceeds its capacity at a slot point.
    CapacityExceeded,
    /// Task starts before its release time.
    EarlyStart,
    /// Task completed after its deadline.
    DeadlineMiss,
    /// Task runs through a maintenance window.
    MaintenanceConflict,
    /// Task starts before a declared predecessor's completion plus setup.
    SetupViolation,
    /// Task missing from the schedule or placed on an unknown machine.
    Unscheduled,
}

impl ScheduleEntry {
    /// Whether this entry overlaps `other` in time.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Weighted completion contribution (`priority * end`).
    #[inline]
    pub fn weighted_completion(&self) -> f64 {
        self.priority * self.end
    }
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    pub fn add_entry(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    /// Adds a violation.
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the schedule has no recorded violations.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Latest end time across all entries (0 when empty).
    pub fn makespan(&self) -> f64 {
        self.entries.iter().map(|e| e.end).fold(0.0, f64::max)
    }

    /// `Σ priority × end`.
    pub fn weighted_completion(&self) -> f64 {
        self.entries.iter().map(ScheduleEntry::weighted_completion).sum()
    }

    /// `Σ lateness` over entries with a deadline.
    pub fn total_lateness(&self) -> f64 {
        self.entries.iter().filter_map(|e| e.lateness).sum()
    }

    /// Finds the entry for a task.
    pub fn entry(&self, task_id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.id == task_id)
    }

    /// Entries placed on a machine, ordered by start time.
    pub fn entries_for_machine(&self, machine: &str) -> Vec<&ScheduleEntry> {
        let mut on_machine: Vec<&ScheduleEntry> =
            self.entries.iter().filter(|e| e.machine == machine).collect();
        on_machine.sort_by(|a, b| a.start.total_cmp(&b.start));
        on_machine
    }

    /// Entries drawing from a staff group, ordered by start time.
    pub fn entries_for_staff_group(&self, group: &str) -> Vec<&ScheduleEntry> {
        let mut in_group: Vec<&ScheduleEntry> = self
            .entries
            .iter()
            .filter(|e| e.staff_group.as_deref() == Some(group))
            .collect();
        in_group.sort_by(|a, b| a.start.total_cmp(&b.start));
        in_group
    }

    /// Busy time / horizon for one machine.
    ///
    /// Returns `None` if `horizon` is not positive.
    pub fn machine_utilization(&self, machine: &str, horizon: f64) -> Option<f64> {
        if horizon <= 0.0 {
            return None;
        }
        let busy: f64 = self
            .entries
            .iter()
            .filter(|e| e.machine == machine)
            .map(|e| e.duration)
            .sum();
        Some(busy / horizon)
    }

    /// Utilization of every machine with entries, over the makespan.
    pub fn all_utilizations(&self) -> BTreeMap<String, f64> {
        let horizon = self.makespan();
        if horizon <= 0.0 {
            return BTreeMap::new();
        }

        let mut busy: BTreeMap<String, f64> = BTreeMap::new();
        for e in &self.entries {
            *busy.entry(e.machine.clone()).or_insert(0.0) += e.duration;
        }

        busy.into_iter()
            .map(|(machine, b)| (machine, b / horizon))
            .collect()
    }

    /// Total processing time per staff group.
    pub fn staff_workload(&self) -> BTreeMap<String, f64> {
        let mut workload: BTreeMap<String, f64> = BTreeMap::new();
        for e in &self.entries {
            if let Some(group) = &e.staff_group {
                *workload.entry(group.clone()).or_insert(0.0) += e.duration;
            }
        }
        workload
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no task is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, machine: &str, start: f64, duration: f64, priority: f64) -> ScheduleEntry {
        ScheduleEntry {
            id: id.to_string(),
            machine: machine.to_string(),
            start,
            end: start + duration,
            duration,
            priority,
            staff_group: Some("TechA".to_string()),
            lateness: None,
        }
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.add_entry(entry("P1", "IRM1", 0.0, 10.0, 2.0));
        s.add_entry(entry("P2", "IRM2", 0.0, 5.0, 1.0));
        s.add_entry(entry("P3", "IRM1", 10.0, 10.0, 1.0));
        s
    }

    #[test]
    fn test_schedule_makespan() {
        assert_eq!(sample_schedule().makespan(), 20.0);
        assert_eq!(Schedule::new().makespan(), 0.0);
    }

    #[test]
    fn test_weighted_completion() {
        // 2*10 + 1*5 + 1*20
        assert!((sample_schedule().weighted_completion() - 45.0).abs() < 1e-10);
    }

    #[test]
    fn test_entries_for_machine_sorted() {
        let s = sample_schedule();
        let irm1: Vec<&str> = s
            .entries_for_machine("IRM1")
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(irm1, vec!["P1", "P3"]);
        assert!(s.entries_for_machine("CT1").is_empty());
    }

    #[test]
    fn test_utilization() {
        let s = sample_schedule();
        let util = s.machine_utilization("IRM1", 20.0).unwrap();
        assert!((util - 1.0).abs() < 1e-10);
        assert!(s.machine_utilization("IRM1", 0.0).is_none());

        let all = s.all_utilizations();
        assert!((all["IRM2"] - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_staff_workload() {
        let workload = sample_schedule().staff_workload();
        assert!((workload["TechA"] - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_overlap() {
        let a = entry("A", "M1", 0.0, 10.0, 1.0);
        let b = entry("B", "M1", 10.0, 5.0, 1.0);
        let c = entry("C", "M1", 9.0, 5.0, 1.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_is_valid() {
        let mut s = sample_schedule();
        assert!(s.is_valid());
        s.add_violation(Violation::new(ViolationType::DeadlineMiss, "P1", "late"));
        assert!(!s.is_valid());
    }
}
