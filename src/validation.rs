//! Input validation and schedule audits.
//!
//! [`validate_problem`] checks structural integrity of canonical input
//! before a model is built. Detects:
//! - Duplicate task IDs
//! - Non-positive durations, negative releases or priorities
//! - Tasks without a machine
//! - Malformed maintenance windows
//! - Circular setup precedence (a cycle makes the model infeasible)
//!
//! [`audit_schedule`] re-checks a returned schedule against the problem,
//! independently of the solver, and reports every broken constraint.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::config::DeadlineMode;
use crate::models::{
    windows_for_machine, SchedulingProblem, Schedule, ScheduleEntry, Task, Violation,
    ViolationType,
};

/// Absolute tolerance for audit comparisons.
pub const AUDIT_TOLERANCE: f64 = 1e-4;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// A task's duration is zero, negative or not finite.
    NonPositiveDuration,
    /// A task has a negative (or non-finite) release or priority.
    NegativeParameter,
    /// A task names no machine.
    MissingMachine,
    /// A maintenance window ends before it starts.
    InvalidWindow,
    /// Setup precedence contains a cycle.
    CyclicDependency,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates canonical input.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_problem(problem: &SchedulingProblem) -> ValidationResult {
    let mut errors = Vec::new();
    let mut task_ids = HashSet::new();

    for task in &problem.tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }

        if !(task.duration.is_finite() && task.duration > 0.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveDuration,
                format!("Task '{}' has duration {}", task.id, task.duration),
            ));
        }

        if !(task.release.is_finite() && task.release >= 0.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeParameter,
                format!("Task '{}' has release {}", task.id, task.release),
            ));
        }

        if !(task.priority.is_finite() && task.priority >= 0.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeParameter,
                format!("Task '{}' has priority {}", task.id, task.priority),
            ));
        }

        if task.machine.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingMachine,
                format!("Task '{}' has no machine", task.id),
            ));
        }
    }

    for window in &problem.maintenance {
        if !window.is_valid() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWindow,
                format!(
                    "Maintenance window on '{}' has start {} after end {}",
                    window.machine, window.start, window.end
                ),
            ));
        }
    }

    if let Some(cycle_err) = detect_cycles(&problem.tasks) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the setup precedence graph using DFS.
///
/// An edge `B → A` exists when `A` declares a positive setup after `B`.
/// Entries naming unknown tasks are ignored.
fn detect_cycles(tasks: &[Task]) -> Option<ValidationError> {
    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in tasks {
        for (pred, &setup) in &task.setup_after {
            if setup > 0.0 && known.contains(pred.as_str()) {
                adj.entry(pred.as_str()).or_default().push(task.id.as_str());
            }
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for task in tasks {
        let node = task.id.as_str();
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular setup precedence involving task '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}

/// Audits a schedule against the problem it was solved for.
///
/// Checks machine and exclusive-staff overlap (setup included on machines),
/// release times, deadlines (hard mode only), maintenance windows, setup
/// precedence and staff capacity at slot points `0, w, 2w, ...`.
pub fn audit_schedule(
    problem: &SchedulingProblem,
    schedule: &Schedule,
    deadlines: DeadlineMode,
    slot_width: f64,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let tasks: HashMap<&str, &Task> = problem.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let entries: HashMap<&str, &ScheduleEntry> =
        schedule.entries.iter().map(|e| (e.id.as_str(), e)).collect();

    for task in &problem.tasks {
        let Some(entry) = entries.get(task.id.as_str()) else {
            violations.push(Violation::new(
                ViolationType::Unscheduled,
                &task.id,
                format!("Task '{}' is missing from the schedule", task.id),
            ));
            continue;
        };

        if entry.start + AUDIT_TOLERANCE < task.release {
            violations.push(Violation::new(
                ViolationType::EarlyStart,
                &task.id,
                format!("Starts at {} before release {}", entry.start, task.release),
            ));
        }

        if let (DeadlineMode::Hard, Some(deadline)) = (deadlines, task.deadline) {
            if entry.end > deadline + AUDIT_TOLERANCE {
                violations.push(Violation::new(
                    ViolationType::DeadlineMiss,
                    &task.id,
                    format!("Ends at {} after deadline {}", entry.end, deadline),
                ));
            }
        }

        for window in windows_for_machine(&problem.maintenance, &entry.machine) {
            if window.blocks(entry.start + AUDIT_TOLERANCE, entry.end - AUDIT_TOLERANCE) {
                violations.push(Violation::new(
                    ViolationType::MaintenanceConflict,
                    &task.id,
                    format!(
                        "Runs [{}, {}] through maintenance [{}, {}] on '{}'",
                        entry.start, entry.end, window.start, window.end, window.machine
                    ),
                ));
            }
        }

        for (pred_id, &setup) in &task.setup_after {
            if setup <= 0.0 {
                continue;
            }
            if let Some(pred) = entries.get(pred_id.as_str()) {
                if entry.start + AUDIT_TOLERANCE < pred.end + setup {
                    violations.push(Violation::new(
                        ViolationType::SetupViolation,
                        &task.id,
                        format!(
                            "Starts at {} before '{}' ends plus setup ({})",
                            entry.start,
                            pred_id,
                            pred.end + setup
                        ),
                    ));
                }
            }
        }
    }

    audit_pairs(problem, schedule, &tasks, &mut violations);
    audit_capacity(problem, schedule, slot_width, &mut violations);
    violations
}

fn audit_pairs(
    problem: &SchedulingProblem,
    schedule: &Schedule,
    tasks: &HashMap<&str, &Task>,
    violations: &mut Vec<Violation>,
) {
    let setup = |pred: &ScheduleEntry, succ: &ScheduleEntry| {
        tasks
            .get(succ.id.as_str())
            .map_or(0.0, |t| t.setup_after_task(&pred.id))
    };

    for (i, a) in schedule.entries.iter().enumerate() {
        for b in &schedule.entries[i + 1..] {
            if a.machine == b.machine {
                let a_first = a.end + setup(a, b) <= b.start + AUDIT_TOLERANCE;
                let b_first = b.end + setup(b, a) <= a.start + AUDIT_TOLERANCE;
                if !a_first && !b_first {
                    violations.push(Violation::new(
                        ViolationType::MachineOverlap,
                        &a.machine,
                        format!("'{}' and '{}' overlap on '{}'", a.id, b.id, a.machine),
                    ));
                }
            }

            if let (Some(ga), Some(gb)) = (&a.staff_group, &b.staff_group) {
                if ga == gb
                    && problem.staff_capacity.is_exclusive(ga)
                    && a.start + AUDIT_TOLERANCE < b.end
                    && b.start + AUDIT_TOLERANCE < a.end
                {
                    violations.push(Violation::new(
                        ViolationType::StaffOverlap,
                        ga,
                        format!("'{}' and '{}' overlap in staff group '{}'", a.id, b.id, ga),
                    ));
                }
            }
        }
    }
}

fn audit_capacity(
    problem: &SchedulingProblem,
    schedule: &Schedule,
    slot_width: f64,
    violations: &mut Vec<Violation>,
) {
    if slot_width <= 0.0 {
        return;
    }
    let horizon = schedule.makespan();
    for (group, capacity) in problem.staff_capacity.iter() {
        let members = schedule.entries_for_staff_group(group);
        let mut t = 0.0;
        while t < horizon {
            let active = members
                .iter()
                .filter(|e| e.start <= t + AUDIT_TOLERANCE && t + AUDIT_TOLERANCE < e.end)
                .count();
            if active > capacity as usize {
                violations.push(Violation::new(
                    ViolationType::CapacityExceeded,
                    group,
                    format!("{active} tasks active at {t}, capacity {capacity}"),
                ));
            }
            t += slot_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaintenanceWindow, StaffCapacity};

    fn entry(task: &Task, start: f64) -> ScheduleEntry {
        ScheduleEntry {
            id: task.id.clone(),
            machine: task.machine.clone(),
            start,
            end: start + task.duration,
            duration: task.duration,
            priority: task.priority,
            staff_group: task.staff_group.clone(),
            lateness: None,
        }
    }

    fn schedule_of(problem: &SchedulingProblem, starts: &[f64]) -> Schedule {
        let mut s = Schedule::new();
        for (task, &start) in problem.tasks.iter().zip(starts) {
            s.add_entry(entry(task, start));
        }
        s
    }

    fn kinds(violations: &[Violation]) -> Vec<ViolationType> {
        violations.iter().map(|v| v.violation_type.clone()).collect()
    }

    #[test]
    fn test_valid_input() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 20.0, "IRM1"),
            Task::new("P2", 30.0, "IRM1").with_setup_after("P1", 5.0),
        ]);
        assert!(validate_problem(&problem).is_ok());
    }

    #[test]
    fn test_duplicate_task_id() {
        let problem =
            SchedulingProblem::new(vec![Task::new("P1", 1.0, "M1"), Task::new("P1", 2.0, "M1")]);
        let errors = validate_problem(&problem).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_bad_parameters() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 0.0, "M1"),
            Task::new("P2", 5.0, "M1").with_release(-1.0),
            Task::new("P3", 5.0, " "),
        ])
        .with_maintenance(MaintenanceWindow::new("M1", 10.0, 5.0));

        let errors = validate_problem(&problem).unwrap_err();
        let kinds: Vec<&ValidationErrorKind> = errors.iter().map(|e| &e.kind).collect();
        assert!(kinds.contains(&&ValidationErrorKind::NonPositiveDuration));
        assert!(kinds.contains(&&ValidationErrorKind::NegativeParameter));
        assert!(kinds.contains(&&ValidationErrorKind::MissingMachine));
        assert!(kinds.contains(&&ValidationErrorKind::InvalidWindow));
    }

    #[test]
    fn test_cyclic_setup_precedence() {
        // P1 after P3, P2 after P1, P3 after P2
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 1.0, "M1").with_setup_after("P3", 1.0),
            Task::new("P2", 1.0, "M1").with_setup_after("P1", 1.0),
            Task::new("P3", 1.0, "M1").with_setup_after("P2", 1.0),
        ]);
        let errors = validate_problem(&problem).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicDependency));
    }

    #[test]
    fn test_zero_setup_and_unknown_ids_ignored() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 1.0, "M1").with_setup_after("P2", 0.0),
            Task::new("P2", 1.0, "M1")
                .with_setup_after("P1", 3.0)
                .with_setup_after("GHOST", 2.0),
        ]);
        assert!(validate_problem(&problem).is_ok());
    }

    #[test]
    fn test_audit_clean_schedule() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 10.0, "M1").with_staff_group("TechA"),
            Task::new("P2", 20.0, "M1")
                .with_staff_group("TechA")
                .with_setup_after("P1", 5.0),
        ]);
        let schedule = schedule_of(&problem, &[0.0, 15.0]);
        assert!(audit_schedule(&problem, &schedule, DeadlineMode::Hard, 5.0).is_empty());
    }

    #[test]
    fn test_audit_machine_overlap_with_setup() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 10.0, "M1"),
            Task::new("P2", 10.0, "M1").with_setup_after("P1", 0.0),
            Task::new("P3", 10.0, "M2"),
        ]);
        // No declared setup: back-to-back is fine.
        let ok = schedule_of(&problem, &[0.0, 10.0, 0.0]);
        assert!(audit_schedule(&problem, &ok, DeadlineMode::Hard, 5.0).is_empty());

        let bad = schedule_of(&problem, &[0.0, 5.0, 0.0]);
        let v = audit_schedule(&problem, &bad, DeadlineMode::Hard, 5.0);
        assert_eq!(kinds(&v), vec![ViolationType::MachineOverlap]);
    }

    #[test]
    fn test_audit_release_deadline_maintenance() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 10.0, "M1").with_release(5.0).with_deadline(12.0),
        ])
        .with_maintenance(MaintenanceWindow::new("M1", 8.0, 9.0));
        let schedule = schedule_of(&problem, &[0.0]);

        let v = audit_schedule(&problem, &schedule, DeadlineMode::Hard, 5.0);
        assert!(kinds(&v).contains(&ViolationType::EarlyStart));
        assert!(kinds(&v).contains(&ViolationType::MaintenanceConflict));
        assert!(!kinds(&v).contains(&ViolationType::DeadlineMiss));

        let late = schedule_of(&problem, &[9.0]);
        let v = audit_schedule(&problem, &late, DeadlineMode::Hard, 5.0);
        assert_eq!(kinds(&v), vec![ViolationType::DeadlineMiss]);
        // Soft deadlines are not violations.
        assert!(audit_schedule(&problem, &late, DeadlineMode::Soft { penalty: 1.0 }, 5.0).is_empty());
    }

    #[test]
    fn test_audit_staff_overlap_and_capacity() {
        let tasks = vec![
            Task::new("P1", 10.0, "M1").with_staff_group("TechA"),
            Task::new("P2", 10.0, "M2").with_staff_group("TechA"),
            Task::new("P3", 10.0, "M3").with_staff_group("TechA"),
        ];
        let exclusive = SchedulingProblem::new(tasks.clone());
        let together = schedule_of(&exclusive, &[0.0, 0.0, 20.0]);
        let v = audit_schedule(&exclusive, &together, DeadlineMode::Hard, 5.0);
        assert_eq!(kinds(&v), vec![ViolationType::StaffOverlap]);

        let pooled = SchedulingProblem::new(tasks)
            .with_staff_capacity(StaffCapacity::new().with_group("TechA", 2));
        assert!(audit_schedule(&pooled, &together, DeadlineMode::Hard, 5.0).is_empty());

        let crowded = schedule_of(&pooled, &[0.0, 0.0, 0.0]);
        let v = audit_schedule(&pooled, &crowded, DeadlineMode::Hard, 5.0);
        assert!(kinds(&v).contains(&ViolationType::CapacityExceeded));
    }

    #[test]
    fn test_audit_missing_entry() {
        let problem = SchedulingProblem::new(vec![Task::new("P1", 10.0, "M1")]);
        let v = audit_schedule(&problem, &Schedule::new(), DeadlineMode::Hard, 5.0);
        assert_eq!(kinds(&v), vec![ViolationType::Unscheduled]);
    }
}
