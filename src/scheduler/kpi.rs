//! Schedule quality metrics (KPIs).
//!
//! Computes standard scheduling performance indicators from a
//! solved schedule and its input tasks, so runs with different
//! objectives can be compared side by side.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest completion time |
//! | Weighted Completion | Sum of priority × completion |
//! | Total Lateness | Sum of max(0, completion - deadline) |
//! | Maximum Lateness | Largest single delay |
//! | On-Time Rate | Fraction meeting deadlines |
//! | Avg Utilization | Mean machine busyness over the makespan |
//! | Staff Workload | Processing time per staff group |
//! | Avg Flow Time | Mean time from release to completion |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Schedule, Task};

/// Schedule performance indicators, in the problem's time units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleKpi {
    /// Latest completion time.
    pub makespan: f64,
    /// `Σ priority × end`.
    pub weighted_completion: f64,
    /// Sum of lateness across all tasks.
    pub total_lateness: f64,
    /// Maximum lateness of any single task.
    pub max_lateness: f64,
    /// Fraction of tasks completing on time (0.0..1.0).
    pub on_time_rate: f64,
    /// Average machine utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-machine utilization.
    pub utilization_by_machine: BTreeMap<String, f64>,
    /// Processing time per staff group.
    pub staff_workload: BTreeMap<String, f64>,
    /// Mean `completion - release`.
    pub avg_flow_time: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its input tasks.
    ///
    /// # Arguments
    /// * `schedule` - The solved schedule.
    /// * `tasks` - The input tasks (for deadlines and release times).
    pub fn calculate(schedule: &Schedule, tasks: &[Task]) -> Self {
        let mut total_lateness = 0.0;
        let mut max_lateness: f64 = 0.0;
        let mut on_time_count: usize = 0;
        let mut total_flow_time = 0.0;
        let mut counted_tasks: usize = 0;

        for task in tasks {
            let Some(entry) = schedule.entry(&task.id) else {
                continue;
            };
            counted_tasks += 1;
            total_flow_time += entry.end - task.release;

            match task.deadline {
                Some(deadline) if entry.end > deadline => {
                    let lateness = entry.end - deadline;
                    total_lateness += lateness;
                    max_lateness = max_lateness.max(lateness);
                }
                // No deadline → considered on-time
                _ => on_time_count += 1,
            }
        }

        let utilization_by_machine = schedule.all_utilizations();
        let avg_utilization = if utilization_by_machine.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_machine.values().sum();
            sum / utilization_by_machine.len() as f64
        };

        let on_time_rate = if counted_tasks == 0 {
            1.0
        } else {
            on_time_count as f64 / counted_tasks as f64
        };

        let avg_flow_time = if counted_tasks == 0 {
            0.0
        } else {
            total_flow_time / counted_tasks as f64
        };

        Self {
            makespan: schedule.makespan(),
            weighted_completion: schedule.weighted_completion(),
            total_lateness,
            max_lateness,
            on_time_rate,
            avg_utilization,
            utilization_by_machine,
            staff_workload: schedule.staff_workload(),
            avg_flow_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleEntry;

    fn make_task(id: &str, duration: f64, deadline: Option<f64>, release: f64) -> Task {
        let mut task = Task::new(id, duration, "M1").with_release(release);
        task.deadline = deadline;
        task
    }

    fn place(schedule: &mut Schedule, id: &str, machine: &str, start: f64, end: f64) {
        schedule.add_entry(ScheduleEntry {
            id: id.into(),
            machine: machine.into(),
            start,
            end,
            duration: end - start,
            priority: 1.0,
            staff_group: Some("TechA".into()),
            lateness: None,
        });
    }

    #[test]
    fn test_kpi_basic() {
        let tasks = vec![
            make_task("J1", 10.0, Some(50.0), 0.0),
            make_task("J2", 20.0, Some(50.0), 0.0),
        ];
        let mut schedule = Schedule::new();
        place(&mut schedule, "J1", "M1", 0.0, 10.0);
        place(&mut schedule, "J2", "M1", 10.0, 30.0);

        let kpi = ScheduleKpi::calculate(&schedule, &tasks);
        assert!((kpi.makespan - 30.0).abs() < 1e-10);
        assert!((kpi.weighted_completion - 40.0).abs() < 1e-10);
        assert_eq!(kpi.total_lateness, 0.0);
        assert!((kpi.on_time_rate - 1.0).abs() < 1e-10);
        assert!((kpi.avg_flow_time - 20.0).abs() < 1e-10); // (10+30)/2
        assert!((kpi.staff_workload["TechA"] - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_lateness() {
        let tasks = vec![
            make_task("J1", 10.0, Some(5.0), 0.0), // Completes at 10 → late 5
            make_task("J2", 10.0, Some(50.0), 0.0), // On time
        ];
        let mut schedule = Schedule::new();
        place(&mut schedule, "J1", "M1", 0.0, 10.0);
        place(&mut schedule, "J2", "M1", 10.0, 20.0);

        let kpi = ScheduleKpi::calculate(&schedule, &tasks);
        assert!((kpi.total_lateness - 5.0).abs() < 1e-10);
        assert!((kpi.max_lateness - 5.0).abs() < 1e-10);
        assert!((kpi.on_time_rate - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_utilization() {
        let tasks = vec![make_task("J1", 20.0, None, 0.0), make_task("J2", 10.0, None, 0.0)];
        let mut schedule = Schedule::new();
        place(&mut schedule, "J1", "M1", 0.0, 20.0);
        place(&mut schedule, "J2", "M2", 0.0, 10.0);

        let kpi = ScheduleKpi::calculate(&schedule, &tasks);
        // M1: 20/20 = 1.0, M2: 10/20 = 0.5
        assert!((kpi.utilization_by_machine["M1"] - 1.0).abs() < 1e-10);
        assert!((kpi.utilization_by_machine["M2"] - 0.5).abs() < 1e-10);
        assert!((kpi.avg_utilization - 0.75).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_flow_time_uses_release() {
        let tasks = vec![make_task("J1", 10.0, None, 10.0), make_task("J2", 10.0, None, 0.0)];
        let mut schedule = Schedule::new();
        place(&mut schedule, "J1", "M1", 20.0, 30.0);
        place(&mut schedule, "J2", "M1", 0.0, 10.0);

        let kpi = ScheduleKpi::calculate(&schedule, &tasks);
        // (20 + 10) / 2
        assert!((kpi.avg_flow_time - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = ScheduleKpi::calculate(&Schedule::new(), &[]);
        assert_eq!(kpi.makespan, 0.0);
        assert!((kpi.on_time_rate - 1.0).abs() < 1e-10);
        assert_eq!(kpi.avg_utilization, 0.0);
        assert!(kpi.utilization_by_machine.is_empty());
    }
}
