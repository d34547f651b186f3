//! Resource index.
//!
//! Maps machine names and staff groups to stable dense indices and records,
//! per task, which machines it may occupy. Every constraint family reads
//! from the same index so variable layout never depends on map iteration
//! order.

use crate::models::Task;

/// Dense index over the machines and staff groups referenced by a task set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceIndex {
    machines: Vec<String>,
    staff_groups: Vec<String>,
    /// Candidate machine indices per task; primary machine first.
    candidates: Vec<Vec<usize>>,
    /// Staff group index per task.
    staff_of: Vec<Option<usize>>,
}

impl ResourceIndex {
    /// Builds the index.
    ///
    /// Machines are numbered in order of first appearance, walking each
    /// task's primary machine and then (when `allow_reassign` is set) its
    /// eligible machines. Staff groups are numbered the same way.
    pub fn build(tasks: &[Task], allow_reassign: bool) -> Self {
        let mut index = Self::default();

        for task in tasks {
            let candidates = task
                .candidate_machines(allow_reassign)
                .into_iter()
                .map(|m| intern(&mut index.machines, m))
                .collect();
            index.candidates.push(candidates);

            let group = task
                .staff_group
                .as_deref()
                .map(|g| intern(&mut index.staff_groups, g));
            index.staff_of.push(group);
        }

        index
    }

    /// Ordered machine names.
    pub fn machines(&self) -> &[String] {
        &self.machines
    }

    /// Ordered staff group names.
    pub fn staff_groups(&self) -> &[String] {
        &self.staff_groups
    }

    /// Index of a machine by name.
    pub fn machine_index(&self, name: &str) -> Option<usize> {
        self.machines.iter().position(|m| m == name)
    }

    /// Name of the machine at `index`.
    pub fn machine_name(&self, index: usize) -> Option<&str> {
        self.machines.get(index).map(String::as_str)
    }

    /// Index of a staff group by name.
    pub fn staff_group_index(&self, name: &str) -> Option<usize> {
        self.staff_groups.iter().position(|g| g == name)
    }

    /// Candidate machines of task `task`.
    pub fn candidates(&self, task: usize) -> &[usize] {
        self.candidates.get(task).map_or(&[], Vec::as_slice)
    }

    /// Staff group of task `task`.
    pub fn staff_group_of(&self, task: usize) -> Option<usize> {
        self.staff_of.get(task).copied().flatten()
    }

    /// Machines both tasks may occupy.
    pub fn shared_machines(&self, a: usize, b: usize) -> Vec<usize> {
        let theirs = self.candidates(b);
        self.candidates(a)
            .iter()
            .copied()
            .filter(|m| theirs.contains(m))
            .collect()
    }

    /// Whether both tasks draw from the same staff group.
    pub fn shares_staff(&self, a: usize, b: usize) -> bool {
        matches!(
            (self.staff_group_of(a), self.staff_group_of(b)),
            (Some(x), Some(y)) if x == y
        )
    }

    /// Tasks that may run on `machine`.
    pub fn tasks_on_machine(&self, machine: usize) -> Vec<usize> {
        (0..self.candidates.len())
            .filter(|&t| self.candidates[t].contains(&machine))
            .collect()
    }

    /// Tasks of staff group `group`.
    pub fn tasks_in_group(&self, group: usize) -> Vec<usize> {
        (0..self.staff_of.len())
            .filter(|&t| self.staff_of[t] == Some(group))
            .collect()
    }

    /// Number of indexed tasks.
    pub fn task_count(&self) -> usize {
        self.candidates.len()
    }
}

fn intern(names: &mut Vec<String>, name: &str) -> usize {
    match names.iter().position(|n| n == name) {
        Some(i) => i,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}
