//! Demo data generators.
//!
//! Provides a fixed imaging-department sample and a seeded random
//! generator:
//! - Imaging sample: 6 exams on IRM1, IRM2 and Scanner1, staffed by two
//!   technologist pools, with one setup rule
//! - Random: configurable task count, machines, staff pools, deadlines,
//!   setups and maintenance windows; the same seed yields the same instance

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{MaintenanceWindow, SchedulingProblem, StaffCapacity, Task};

/// The imaging-department sample.
///
/// P2 needs 5 time units of setup after P1. Both technologist pools are
/// exclusive: each runs one exam at a time.
pub fn imaging_department() -> SchedulingProblem {
    SchedulingProblem::new(vec![
        Task::new("P1", 20.0, "IRM1")
            .with_priority(5.0)
            .with_staff_group("TechA")
            .with_eligible_machines(["IRM2"]),
        Task::new("P2", 30.0, "IRM1")
            .with_priority(2.0)
            .with_staff_group("TechA")
            .with_setup_after("P1", 5.0),
        Task::new("P3", 15.0, "Scanner1")
            .with_priority(3.0)
            .with_release(10.0)
            .with_staff_group("TechB"),
        Task::new("P4", 45.0, "IRM2")
            .with_priority(4.0)
            .with_staff_group("TechA")
            .with_eligible_machines(["IRM1"]),
        Task::new("P5", 25.0, "Scanner1")
            .with_priority(1.0)
            .with_staff_group("TechB"),
        Task::new("P6", 10.0, "IRM1")
            .with_priority(10.0)
            .with_release(5.0)
            .with_staff_group("TechA"),
    ])
}

/// Random instance parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Number of tasks.
    pub tasks: usize,
    /// Number of machines (`M1`, `M2`, ...).
    pub machines: usize,
    /// Number of staff groups (`S1`, `S2`, ...). Zero disables staff.
    pub staff_groups: usize,
    /// Capacity given to every staff group.
    pub staff_capacity: u32,
    /// Probability that a task gets a deadline.
    pub deadline_probability: f64,
    /// Probability that a task declares a setup after an earlier task on
    /// its machine.
    pub setup_probability: f64,
    /// Maintenance windows to place.
    pub maintenance_windows: usize,
    /// Random seed.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tasks: 8,
            machines: 3,
            staff_groups: 2,
            staff_capacity: 1,
            deadline_probability: 0.3,
            setup_probability: 0.2,
            maintenance_windows: 1,
            seed: 0,
        }
    }
}

/// Generates a random instance.
///
/// Durations are multiples of 5 in `[5, 45]`; releases lie in `[0, 30]`.
/// Setups only point from later tasks to earlier ones, so setup
/// precedence stays acyclic. Deadlines leave at least twice the duration
/// after release, so hard-deadline instances are usually feasible.
pub fn generate(config: &GeneratorConfig) -> SchedulingProblem {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let machine_count = config.machines.max(1);
    let machine_name = |m: usize| format!("M{}", m + 1);

    let mut tasks: Vec<Task> = Vec::with_capacity(config.tasks);
    for i in 0..config.tasks {
        let duration = 5.0 * rng.random_range(1..=9) as f64;
        let release = 5.0 * rng.random_range(0..=6) as f64;
        let primary = rng.random_range(0..machine_count);

        let mut task = Task::new(format!("T{}", i + 1), duration, machine_name(primary))
            .with_priority(rng.random_range(1..=10) as f64)
            .with_release(release);

        if machine_count > 1 && rng.random_bool(0.5) {
            let alternative = (primary + rng.random_range(1..machine_count)) % machine_count;
            task = task.with_eligible_machines([machine_name(alternative)]);
        }

        if config.staff_groups > 0 {
            let group = rng.random_range(0..config.staff_groups);
            task = task.with_staff_group(format!("S{}", group + 1));
        }

        if rng.random_bool(config.deadline_probability.clamp(0.0, 1.0)) {
            let slack = duration * rng.random_range(2..=6) as f64;
            task = task.with_deadline(release + slack);
        }

        if rng.random_bool(config.setup_probability.clamp(0.0, 1.0)) {
            let earlier: Vec<&Task> = tasks.iter().filter(|t| t.machine == task.machine).collect();
            if !earlier.is_empty() {
                let pred = earlier[rng.random_range(0..earlier.len())].id.clone();
                task = task.with_setup_after(pred, 5.0 * rng.random_range(1..=2) as f64);
            }
        }

        tasks.push(task);
    }

    let mut problem = SchedulingProblem::new(tasks);

    if config.staff_groups > 0 {
        let capacity: StaffCapacity = (0..config.staff_groups)
            .map(|g| (format!("S{}", g + 1), config.staff_capacity))
            .collect();
        problem = problem.with_staff_capacity(capacity);
    }

    for _ in 0..config.maintenance_windows {
        let machine = machine_name(rng.random_range(0..machine_count));
        let start = 10.0 * rng.random_range(0..=6) as f64;
        let length = 5.0 * rng.random_range(1..=3) as f64;
        problem = problem.with_maintenance(MaintenanceWindow::new(machine, start, start + length));
    }

    problem
}
