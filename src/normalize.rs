//! Task normalization.
//!
//! Turns loosely typed task records (JSON objects, table rows exported as
//! strings) into canonical [`Task`]s.
//!
//! # Policy
//!
//! | Field | Missing | Unparsable |
//! |-------|---------|------------|
//! | `id` | `P<row>` (fallback) | `P<row>` (fallback) |
//! | `duration` | 1.0 (fallback) | 1.0 (fallback) |
//! | `priority` | 1.0 | 1.0 (fallback) |
//! | `release` | 0.0 | 0.0 (fallback) |
//! | `machine` | first eligible machine, else `M1` (fallback) | same |
//! | `deadline` | none | dropped |
//! | `setup_after` entry | none | dropped |
//!
//! A *fallback* is logged and recorded in lenient mode. In strict mode the
//! first fallback aborts the whole batch with no partial result. Dropped
//! deadlines and setup entries never abort: no deadline is safer than a
//! wrong one.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::models::{MaintenanceWindow, SchedulingProblem, StaffCapacity, Task};

/// Machine used when a record names none.
pub const DEFAULT_MACHINE: &str = "M1";

/// How field defects are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Apply fallbacks and keep going.
    #[default]
    Lenient,
    /// Reject the batch on the first defect.
    Strict,
}

/// A rejected record (strict mode).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {row}: field '{field}' {reason}")]
pub struct NormalizeError {
    /// Zero-based record index.
    pub row: usize,
    /// Offending field.
    pub field: &'static str,
    /// What was wrong.
    pub reason: String,
}

/// A fallback applied in lenient mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFallback {
    /// Zero-based record index.
    pub row: usize,
    /// Field that was replaced.
    pub field: &'static str,
    /// What was wrong.
    pub reason: String,
    /// Value used instead.
    pub fallback: String,
}

/// Result of a lenient or strict normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTasks {
    /// Canonical tasks, in input order.
    pub tasks: Vec<Task>,
    /// Fallbacks applied (always empty in strict mode).
    pub fallbacks: Vec<FieldFallback>,
}

struct Normalizer {
    mode: NormalizeMode,
    fallbacks: Vec<FieldFallback>,
}

impl Normalizer {
    fn fallback(
        &mut self,
        row: usize,
        field: &'static str,
        reason: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Result<(), NormalizeError> {
        let reason = reason.into();
        if self.mode == NormalizeMode::Strict {
            return Err(NormalizeError { row, field, reason });
        }
        let fallback = fallback.into();
        warn!(row, field, reason = %reason, fallback = %fallback, "Task field defaulted");
        self.fallbacks.push(FieldFallback {
            row,
            field,
            reason,
            fallback,
        });
        Ok(())
    }

    fn task(&mut self, row: usize, record: &Map<String, Value>) -> Result<Task, NormalizeError> {
        let id = match text_field(record.get("id")) {
            Some(id) => id,
            None => {
                let id = format!("P{}", row + 1);
                self.fallback(row, "id", "is missing", id.clone())?;
                id
            }
        };

        let duration = match number_field(record.get("duration")) {
            Field::Value(d) if d > 0.0 => d,
            Field::Value(d) => {
                self.fallback(row, "duration", format!("must be positive, got {d}"), "1")?;
                1.0
            }
            Field::Missing => {
                self.fallback(row, "duration", "is missing", "1")?;
                1.0
            }
            Field::Invalid(raw) => {
                self.fallback(row, "duration", format!("is not a number: {raw}"), "1")?;
                1.0
            }
        };

        let priority = match number_field(record.get("priority")) {
            Field::Value(p) if p >= 0.0 => p,
            Field::Value(p) => {
                self.fallback(row, "priority", format!("must not be negative, got {p}"), "1")?;
                1.0
            }
            Field::Missing => 1.0,
            Field::Invalid(raw) => {
                self.fallback(row, "priority", format!("is not a number: {raw}"), "1")?;
                1.0
            }
        };

        let release = match number_field(record.get("release")) {
            Field::Value(r) if r >= 0.0 => r,
            Field::Value(r) => {
                self.fallback(row, "release", format!("must not be negative, got {r}"), "0")?;
                0.0
            }
            Field::Missing => 0.0,
            Field::Invalid(raw) => {
                self.fallback(row, "release", format!("is not a number: {raw}"), "0")?;
                0.0
            }
        };

        let eligible_machines = eligible_field(record.get("eligible_machines"));
        let machine = match text_field(record.get("machine")) {
            Some(m) => m,
            None => match eligible_machines.first() {
                Some(first) => first.clone(),
                None => {
                    self.fallback(row, "machine", "is missing", DEFAULT_MACHINE)?;
                    DEFAULT_MACHINE.to_string()
                }
            },
        };

        let deadline = match number_field(record.get("deadline")) {
            Field::Value(d) => Some(d),
            Field::Missing => None,
            Field::Invalid(raw) => {
                debug!(row, task = %id, raw = %raw, "Dropping unparsable deadline");
                None
            }
        };

        Ok(Task {
            id: id.clone(),
            duration,
            machine,
            eligible_machines,
            priority,
            release,
            deadline,
            staff_group: text_field(record.get("staff_group")),
            setup_after: setup_field(row, &id, record.get("setup_after")),
        })
    }
}

/// Normalizes raw task records.
///
/// Non-object records are skipped in lenient mode and rejected in strict mode.
pub fn normalize_tasks(
    records: &[Value],
    mode: NormalizeMode,
) -> Result<NormalizedTasks, NormalizeError> {
    let mut normalizer = Normalizer {
        mode,
        fallbacks: Vec::new(),
    };
    let mut tasks = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        match record.as_object() {
            Some(obj) => tasks.push(normalizer.task(row, obj)?),
            None => {
                if mode == NormalizeMode::Strict {
                    return Err(NormalizeError {
                        row,
                        field: "record",
                        reason: "is not an object".to_string(),
                    });
                }
                warn!(row, "Skipping task record that is not an object");
            }
        }
    }

    Ok(NormalizedTasks {
        tasks,
        fallbacks: normalizer.fallbacks,
    })
}

/// Normalizes maintenance window records. Malformed windows are skipped.
pub fn normalize_maintenance(records: &[Value]) -> Vec<MaintenanceWindow> {
    let mut windows = Vec::new();
    for (row, record) in records.iter().enumerate() {
        let machine = text_field(record.get("machine"));
        let start = number_field(record.get("start")).value();
        let end = number_field(record.get("end")).value();
        match (machine, start, end) {
            (Some(machine), Some(start), Some(end)) if start <= end => {
                windows.push(MaintenanceWindow::new(machine, start, end));
            }
            _ => warn!(row, "Skipping malformed maintenance window"),
        }
    }
    windows
}

/// Normalizes a staff capacity map. Non-integer or negative capacities are skipped.
pub fn normalize_staff_capacity(value: &Value) -> StaffCapacity {
    let mut capacity = StaffCapacity::new();
    let Some(map) = value.as_object() else {
        if !value.is_null() {
            warn!("Ignoring staff capacity that is not a mapping");
        }
        return capacity;
    };
    for (group, raw) in map {
        match number_field(Some(raw)).value() {
            Some(c) if c >= 0.0 && c.fract() == 0.0 && c <= f64::from(u32::MAX) => {
                capacity.set(group.clone(), c as u32);
            }
            _ => warn!(group = %group, "Ignoring invalid staff capacity"),
        }
    }
    capacity
}

/// A problem document before normalization.
///
/// Accepts either `{"tasks": [...], "maintenance": [...], "staff_capacity": {...}}`
/// or a bare task array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawProblem {
    /// Raw task records.
    #[serde(default)]
    pub tasks: Vec<Value>,
    /// Raw maintenance windows.
    #[serde(default)]
    pub maintenance: Vec<Value>,
    /// Raw staff capacity mapping.
    #[serde(default)]
    pub staff_capacity: Value,
}

impl RawProblem {
    /// Parses a problem document.
    pub fn from_json_str(text: &str) -> Result<Self, SchedulerError> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Array(tasks) => Ok(Self {
                tasks,
                ..Self::default()
            }),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    /// Normalizes every part of the document.
    pub fn normalize(
        &self,
        mode: NormalizeMode,
    ) -> Result<(SchedulingProblem, Vec<FieldFallback>), SchedulerError> {
        let normalized = normalize_tasks(&self.tasks, mode)?;
        let problem = SchedulingProblem {
            tasks: normalized.tasks,
            maintenance: normalize_maintenance(&self.maintenance),
            staff_capacity: normalize_staff_capacity(&self.staff_capacity),
        };
        Ok((problem, normalized.fallbacks))
    }
}

enum Field {
    Value(f64),
    Missing,
    Invalid(String),
}

impl Field {
    fn value(self) -> Option<f64> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

fn number_field(value: Option<&Value>) -> Field {
    match value {
        None | Some(Value::Null) => Field::Missing,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Field::Value(v),
            _ => Field::Invalid(n.to_string()),
        },
        Some(Value::String(s)) if s.trim().is_empty() => Field::Missing,
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Field::Value(v),
            _ => Field::Invalid(s.clone()),
        },
        Some(other) => Field::Invalid(other.to_string()),
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn eligible_field(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut machines: Vec<String> = Vec::new();
    for item in items {
        if let Some(m) = text_field(Some(item)) {
            if !machines.contains(&m) {
                machines.push(m);
            }
        }
    }
    machines
}

/// Setup entries; table cells may carry the mapping as JSON text.
fn setup_field(row: usize, task_id: &str, value: Option<&Value>) -> BTreeMap<String, f64> {
    let parsed;
    let map = match value {
        None | Some(Value::Null) => return BTreeMap::new(),
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) if text.trim().is_empty() => return BTreeMap::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => {
                parsed = map;
                &parsed
            }
            _ => {
                debug!(row, task = task_id, "Dropping unparsable setup_after");
                return BTreeMap::new();
            }
        },
        Some(_) => {
            debug!(row, task = task_id, "Dropping setup_after that is not a mapping");
            return BTreeMap::new();
        }
    };

    let mut setups = BTreeMap::new();
    for (predecessor, raw) in map {
        match number_field(Some(raw)) {
            Field::Value(s) if s >= 0.0 => {
                setups.insert(predecessor.clone(), s);
            }
            _ => debug!(row, task = task_id, predecessor = %predecessor, "Dropping setup entry"),
        }
    }
    setups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_record() {
        let records = vec![json!({
            "id": "P2", "duration": 30, "machine": "IRM1", "priority": 2,
            "release": 5, "deadline": 90, "staff_group": "TechA",
            "setup_after": {"P1": 5}
        })];
        let out = normalize_tasks(&records, NormalizeMode::Strict).unwrap();
        let task = &out.tasks[0];

        assert_eq!(task.id, "P2");
        assert_eq!(task.duration, 30.0);
        assert_eq!(task.priority, 2.0);
        assert_eq!(task.release, 5.0);
        assert_eq!(task.deadline, Some(90.0));
        assert_eq!(task.staff_group.as_deref(), Some("TechA"));
        assert_eq!(task.setup_after_task("P1"), 5.0);
        assert!(out.fallbacks.is_empty());
    }

    #[test]
    fn test_lenient_fallbacks() {
        let records = vec![json!({
            "id": "P1", "duration": "abc", "machine": "M1",
            "priority": "high", "release": -3
        })];
        let out = normalize_tasks(&records, NormalizeMode::Lenient).unwrap();
        let task = &out.tasks[0];

        assert_eq!(task.duration, 1.0);
        assert_eq!(task.priority, 1.0);
        assert_eq!(task.release, 0.0);
        let fields: Vec<&str> = out.fallbacks.iter().map(|f| f.field).collect();
        assert_eq!(fields, vec!["duration", "priority", "release"]);
    }

    #[test]
    fn test_missing_optional_fields_are_not_fallbacks() {
        let records = vec![json!({"id": "P1", "duration": 10, "machine": "M1"})];
        let out = normalize_tasks(&records, NormalizeMode::Strict).unwrap();
        assert_eq!(out.tasks[0].priority, 1.0);
        assert_eq!(out.tasks[0].release, 0.0);
        assert!(out.tasks[0].deadline.is_none());
    }

    #[test]
    fn test_strict_aborts_whole_batch() {
        let records = vec![
            json!({"id": "P1", "duration": 10, "machine": "M1"}),
            json!({"id": "P2", "duration": "ten", "machine": "M1"}),
        ];
        let err = normalize_tasks(&records, NormalizeMode::Strict).unwrap_err();
        assert_eq!(err.row, 1);
        assert_eq!(err.field, "duration");
    }

    #[test]
    fn test_bad_deadline_dropped_even_in_strict() {
        let records = vec![json!({"id": "P1", "duration": 10, "machine": "M1", "deadline": "soon"})];
        let out = normalize_tasks(&records, NormalizeMode::Strict).unwrap();
        assert!(out.tasks[0].deadline.is_none());
    }

    #[test]
    fn test_setup_entries_filtered() {
        let records = vec![json!({
            "id": "P3", "duration": 10, "machine": "M1",
            "setup_after": {"P1": 5, "P2": "x", "P4": -1, "P5": "2.5"}
        })];
        let out = normalize_tasks(&records, NormalizeMode::Lenient).unwrap();
        let setups = &out.tasks[0].setup_after;
        assert_eq!(setups.len(), 2);
        assert_eq!(setups["P1"], 5.0);
        assert_eq!(setups["P5"], 2.5);
    }

    #[test]
    fn test_setup_as_json_text() {
        let records = vec![json!({
            "id": "P2", "duration": 10, "machine": "M1", "setup_after": "{\"P1\": 4}"
        })];
        let out = normalize_tasks(&records, NormalizeMode::Lenient).unwrap();
        assert_eq!(out.tasks[0].setup_after_task("P1"), 4.0);
    }

    #[test]
    fn test_string_numbers_and_blank_cells() {
        let records = vec![json!({
            "id": "P1", "duration": " 12.5 ", "machine": "M1",
            "release": "", "deadline": "", "staff_group": ""
        })];
        let out = normalize_tasks(&records, NormalizeMode::Strict).unwrap();
        let task = &out.tasks[0];
        assert_eq!(task.duration, 12.5);
        assert_eq!(task.release, 0.0);
        assert!(task.deadline.is_none());
        assert!(task.staff_group.is_none());
    }

    #[test]
    fn test_machine_from_eligible_list() {
        let records = vec![json!({
            "id": "P1", "duration": 10, "eligible_machines": ["IRM2", "IRM1", "IRM2"]
        })];
        let out = normalize_tasks(&records, NormalizeMode::Strict).unwrap();
        assert_eq!(out.tasks[0].machine, "IRM2");
        assert_eq!(out.tasks[0].eligible_machines, vec!["IRM2", "IRM1"]);
    }

    #[test]
    fn test_missing_id_and_machine() {
        let records = vec![json!({"duration": 10})];
        let out = normalize_tasks(&records, NormalizeMode::Lenient).unwrap();
        assert_eq!(out.tasks[0].id, "P1");
        assert_eq!(out.tasks[0].machine, DEFAULT_MACHINE);

        assert!(normalize_tasks(&records, NormalizeMode::Strict).is_err());
    }

    #[test]
    fn test_non_object_record() {
        let records = vec![json!(42), json!({"id": "P2", "duration": 5, "machine": "M1"})];
        let out = normalize_tasks(&records, NormalizeMode::Lenient).unwrap();
        assert_eq!(out.tasks.len(), 1);

        let err = normalize_tasks(&records, NormalizeMode::Strict).unwrap_err();
        assert_eq!(err.field, "record");
    }

    #[test]
    fn test_empty_batch() {
        let out = normalize_tasks(&[], NormalizeMode::Strict).unwrap();
        assert!(out.tasks.is_empty());
    }

    #[test]
    fn test_maintenance_and_capacity() {
        let windows = normalize_maintenance(&[
            json!({"machine": "IRM1", "start": 0, "end": 15}),
            json!({"machine": "IRM1", "start": 20, "end": 10}),
            json!({"start": 0, "end": 5}),
        ]);
        assert_eq!(windows, vec![MaintenanceWindow::new("IRM1", 0.0, 15.0)]);

        let caps = normalize_staff_capacity(&json!({"TechA": 2, "TechB": 1.5, "TechC": "3"}));
        assert_eq!(caps.get("TechA"), Some(2));
        assert_eq!(caps.get("TechB"), None);
        assert_eq!(caps.get("TechC"), Some(3));
    }

    #[test]
    fn test_raw_problem_document_shapes() {
        let bare = RawProblem::from_json_str(r#"[{"id": "P1", "duration": 10, "machine": "M1"}]"#)
            .unwrap();
        assert_eq!(bare.tasks.len(), 1);

        let full = RawProblem::from_json_str(
            r#"{"tasks": [{"id": "P1", "duration": 10, "machine": "M1"}],
                "maintenance": [{"machine": "M1", "start": 0, "end": 15}],
                "staff_capacity": {"TechA": 2}}"#,
        )
        .unwrap();
        let (problem, fallbacks) = full.normalize(NormalizeMode::Strict).unwrap();
        assert_eq!(problem.tasks.len(), 1);
        assert_eq!(problem.maintenance.len(), 1);
        assert_eq!(problem.staff_capacity.get("TechA"), Some(2));
        assert!(fallbacks.is_empty());
    }
}
