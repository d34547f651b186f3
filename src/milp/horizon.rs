//! Planning horizon and big-M sizing.
//!
//! Any feasible schedule can be compressed so that every task finishes by
//! the latest release or maintenance end plus the total processing and setup
//! time. The horizon adds a margin on top of that bound; the big-M constant
//! adds the longest duration and setup so that a deactivated disjunct can
//! never bind.

use crate::models::SchedulingProblem;

/// Relative safety margin added to the horizon.
pub const HORIZON_MARGIN_RATIO: f64 = 0.1;

/// Planning horizon and the matching big-M constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizon {
    /// Upper bound on every task's completion time.
    pub length: f64,
    /// Constant used to relax inactive disjunctive constraints.
    pub big_m: f64,
}

impl Horizon {
    /// Computes a conservative horizon for `problem`.
    pub fn compute(problem: &SchedulingProblem) -> Self {
        let tasks = &problem.tasks;

        let latest_release = tasks.iter().map(|t| t.release).fold(0.0, f64::max);
        let latest_maintenance = problem
            .maintenance
            .iter()
            .map(|w| w.end)
            .fold(0.0, f64::max);
        let total_duration: f64 = tasks.iter().map(|t| t.duration).sum();
        // Each task pays at most its largest incoming setup once.
        let total_setup: f64 = tasks
            .iter()
            .map(|t| t.setup_after.values().copied().fold(0.0, f64::max))
            .sum();

        let span = latest_release.max(latest_maintenance) + total_duration + total_setup;
        let length = span + (span * HORIZON_MARGIN_RATIO).max(1.0);

        let max_duration = tasks.iter().map(|t| t.duration).fold(0.0, f64::max);
        let max_setup = tasks
            .iter()
            .flat_map(|t| t.setup_after.values().copied())
            .fold(0.0, f64::max);

        Self {
            length,
            big_m: length + max_duration + max_setup,
        }
    }

    /// Slot points `0, width, 2*width, ...` strictly below the horizon.
    pub fn slot_points(&self, width: f64) -> Vec<f64> {
        if !(width.is_finite() && width > 0.0) {
            return Vec::new();
        }
        let count = (self.length / width).ceil() as usize;
        (0..count)
            .map(|k| k as f64 * width)
            .filter(|&t| t < self.length)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaintenanceWindow, Task};

    #[test]
    fn test_horizon_covers_serial_schedule() {
        let problem = SchedulingProblem::new(vec![
            Task::new("P1", 20.0, "M1").with_release(40.0),
            Task::new("P2", 30.0, "M1").with_setup_after("P1", 5.0),
        ]);
        let h = Horizon::compute(&problem);
        // 40 + 50 + 5 = 95, plus 10%
        assert!((h.length - 104.5).abs() < 1e-9);
        assert!((h.big_m - (104.5 + 30.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_horizon_after_maintenance() {
        let problem = SchedulingProblem::new(vec![Task::new("P1", 5.0, "M1")])
            .with_maintenance(MaintenanceWindow::new("M1", 0.0, 15.0));
        let h = Horizon::compute(&problem);
        assert!(h.length >= 20.0);
    }

    #[test]
    fn test_minimum_margin() {
        let problem = SchedulingProblem::new(vec![Task::new("P1", 2.0, "M1")]);
        let h = Horizon::compute(&problem);
        assert!((h.length - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_slot_points() {
        let h = Horizon {
            length: 33.0,
            big_m: 50.0,
        };
        assert_eq!(h.slot_points(10.0), vec![0.0, 10.0, 20.0, 30.0]);
        assert!(h.slot_points(0.0).is_empty());
    }
}
