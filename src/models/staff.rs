//! Staff capacity model.
//!
//! Staff groups are pools of interchangeable people (technologists, nurses,
//! operators). A group's capacity is the number of its tasks that may be in
//! progress at the same time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Staff group → maximum simultaneously active tasks.
///
/// Groups absent from the map have no declared capacity; the model treats
/// them as exclusive (one task at a time).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffCapacity {
    limits: BTreeMap<String, u32>,
}

impl StaffCapacity {
    /// Creates an empty capacity table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: declares the capacity of a group.
    pub fn with_group(mut self, group: impl Into<String>, capacity: u32) -> Self {
        self.set(group, capacity);
        self
    }

    /// Declares (or replaces) the capacity of a group.
    pub fn set(&mut self, group: impl Into<String>, capacity: u32) {
        self.limits.insert(group.into(), capacity);
    }

    /// Declared capacity of a group.
    pub fn get(&self, group: &str) -> Option<u32> {
        self.limits.get(group).copied()
    }

    /// Whether tasks of `group` must never overlap.
    ///
    /// True when no capacity is declared or the declared capacity is exactly
    /// one. A capacity of zero is not exclusive: it is enforced as a slot
    /// limit, so no task of the group may be active at a slot point.
    pub fn is_exclusive(&self, group: &str) -> bool {
        matches!(self.get(group), None | Some(1))
    }

    /// Iterates over declared groups in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.limits.iter().map(|(g, c)| (g.as_str(), *c))
    }

    /// Whether no capacity is declared.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Number of declared groups.
    pub fn len(&self) -> usize {
        self.limits.len()
    }
}

impl FromIterator<(String, u32)> for StaffCapacity {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self {
            limits: iter.into_iter().collect(),
        }
    }
}
