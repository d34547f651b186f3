//! Problem container.

use serde::{Deserialize, Serialize};

use super::{MaintenanceWindow, StaffCapacity, Task};

/// Everything a solve needs besides the options: tasks, machine blackouts
/// and staff capacities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingProblem {
    /// Tasks to schedule.
    pub tasks: Vec<Task>,
    /// Machine blackouts.
    #[serde(default)]
    pub maintenance: Vec<MaintenanceWindow>,
    /// Staff group capacities.
    #[serde(default)]
    pub staff_capacity: StaffCapacity,
}

impl SchedulingProblem {
    /// Creates a problem with only tasks.
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            maintenance: Vec::new(),
            staff_capacity: StaffCapacity::new(),
        }
    }

    /// Adds a maintenance window.
    pub fn with_maintenance(mut self, window: MaintenanceWindow) -> Self {
        self.maintenance.push(window);
        self
    }

    /// Sets the staff capacity table.
    pub fn with_staff_capacity(mut self, capacity: StaffCapacity) -> Self {
        self.staff_capacity = capacity;
        self
    }

    /// Finds a task by ID.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Whether there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
