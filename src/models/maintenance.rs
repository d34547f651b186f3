//! Maintenance windows (machine blackouts).
//!
//! A maintenance window is a closed interval `[start, end]` during which a
//! machine cannot process work. A task may finish exactly at `start` or
//! begin exactly at `end`.

use serde::{Deserialize, Serialize};

/// A blackout interval on one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// Machine that is unavailable.
    pub machine: String,
    /// Blackout start.
    pub start: f64,
    /// Blackout end.
    pub end: f64,
}

impl MaintenanceWindow {
    /// Creates a new maintenance window.
    pub fn new(machine: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            machine: machine.into(),
            start,
            end,
        }
    }

    /// Length of the blackout.
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the window is well formed (`start <= end`, both finite).
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start <= self.end
    }

    /// Whether processing over `[from, to)` collides with this blackout.
    ///
    /// Touching the window boundary is allowed.
    pub fn blocks(&self, from: f64, to: f64) -> bool {
        from < self.end && to > self.start
    }
}

/// Windows that apply to `machine`.
pub fn windows_for_machine<'a>(
    windows: &'a [MaintenanceWindow],
    machine: &'a str,
) -> impl Iterator<Item = &'a MaintenanceWindow> + 'a {
    windows.iter().filter(move |w| w.machine == machine)
}
