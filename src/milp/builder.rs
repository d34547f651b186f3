//! Constraint model builder.
//!
//! Translates a [`SchedulingProblem`] into a mixed-integer linear program.
//! One builder covers every model variant; features are switched with
//! flags instead of separate formulations.
//!
//! # Variables
//! - `S_i` start of task `i`, bounded by `[release_i, H - p_i]`
//! - `C_max` makespan
//! - `x_ik` ordering binary per conflicting pair (`1` = `i` before `k`)
//! - `y_im` assignment binary per candidate machine (reassignment only)
//! - `z_ikm` = `y_im AND y_km` (reassignment only)
//! - `w_ij` maintenance side binary per task and window
//! - `a_it`, `b_it`, `u_it` slot activity binaries (capacity-limited groups)
//! - `L_i` lateness (soft deadlines only)
//!
//! # Constraint families
//! | Family | Encoding |
//! |--------|----------|
//! | Machine disjunction | `S_i + p_i + s_ik <= S_k + M(1 - x_ik) [+ M(1 - z)]` and the mirror |
//! | Staff disjunction | `S_i + p_i <= S_k + M(1 - x_ik)` and the mirror |
//! | Setup precedence | `S_a >= S_b + p_b + s` when `a` declares setup `s` after `b` |
//! | Deadline (hard) | `S_i + p_i <= d_i` |
//! | Deadline (soft) | `L_i >= S_i + p_i - d_i`, `L_i >= 0` |
//! | Maintenance | `S + p <= a + M w`, `S >= b - M(1 - w)` |
//! | Staff capacity | `Σ u_it <= cap` per group and slot point |
//!
//! # Reference
//! - Manne (1960), "On the Job-Shop Scheduling Problem"
//! - Ku & Beck (2016), "Mixed Integer Programming models for job shop scheduling"

use std::collections::HashMap;

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use tracing::debug;

use super::engine::MilpProblem;
use super::horizon::Horizon;
use super::index::ResourceIndex;
use crate::config::{DeadlineMode, SolveOptions, DEFAULT_SLOT_WIDTH};
use crate::models::{SchedulingProblem, Task};

/// Gap separating "starts after slot point `t`" from "starts at or before `t`".
pub const SLOT_EPSILON: f64 = 1e-3;

/// Size of a built model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    /// Number of tasks.
    pub tasks: usize,
    /// Pairwise ordering binaries.
    pub ordering_binaries: usize,
    /// Task-to-machine assignment binaries.
    pub assignment_binaries: usize,
    /// Same-machine conjunction binaries.
    pub conjunction_binaries: usize,
    /// Maintenance side binaries.
    pub maintenance_binaries: usize,
    /// Staff slot binaries.
    pub slot_binaries: usize,
    /// Linear constraints.
    pub constraints: usize,
}

/// Handles to the variables a solution is read back from.
#[derive(Debug, Clone)]
pub struct ModelLayout {
    /// Start variable per task, in task order.
    pub starts: Vec<Variable>,
    /// Makespan variable.
    pub makespan: Variable,
    /// Lateness variable per task (soft deadlines only).
    pub lateness: Vec<Option<Variable>>,
    /// `(machine index, y)` per task. Empty when assignments are fixed.
    pub assignments: Vec<Vec<(usize, Variable)>>,
    /// Machine and staff index the model was built against.
    pub index: ResourceIndex,
    /// Horizon and big-M.
    pub horizon: Horizon,
    /// Model size.
    pub stats: ModelStats,
}

impl ModelLayout {
    /// Variables needed to rebuild a schedule: starts, then assignments.
    pub fn watch_list(&self) -> Vec<Variable> {
        let mut watch = self.starts.clone();
        watch.extend(self.assignments.iter().flatten().map(|&(_, y)| y));
        watch
    }

    /// Number of entries [`watch_list`](Self::watch_list) returns.
    pub fn watch_len(&self) -> usize {
        self.starts.len() + self.assignments.iter().map(Vec::len).sum::<usize>()
    }

    /// Whether the model chooses machines.
    pub fn reassigns(&self) -> bool {
        self.assignments.iter().any(|a| !a.is_empty())
    }
}

/// A built model: variables, constraints and the layout to read them back.
pub struct ScheduleModel {
    variables: ProblemVariables,
    constraints: Vec<Constraint>,
    layout: ModelLayout,
}

impl ScheduleModel {
    /// Variable handles.
    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// Adds a non-negative continuous variable.
    pub fn add_continuous(&mut self, name: impl Into<String>) -> Variable {
        self.variables.add(variable().min(0.0).name(name))
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
        self.layout.stats.constraints += 1;
    }

    /// Caps the makespan variable.
    pub fn cap_makespan(&mut self, cap: f64) {
        let makespan = Expression::from(self.layout.makespan);
        self.add_constraint(constraint!(makespan <= cap));
    }

    /// Number of constraints emitted so far.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Finalizes the model with `objective` (minimized).
    pub fn into_problem(self, objective: Expression) -> (MilpProblem, ModelLayout) {
        let problem = MilpProblem {
            variables: self.variables,
            objective,
            constraints: self.constraints,
        };
        (problem, self.layout)
    }
}

/// Accumulates variables and constraints while a model is built.
struct Emitter {
    vars: ProblemVariables,
    constraints: Vec<Constraint>,
    big_m: f64,
    stats: ModelStats,
}

impl Emitter {
    fn binary(&mut self, name: String) -> Variable {
        self.vars.add(variable().binary().name(name))
    }

    fn at_most(&mut self, lhs: Expression, rhs: Expression) {
        self.constraints.push(constraint!(lhs <= rhs));
    }

    fn at_least(&mut self, lhs: Expression, rhs: Expression) {
        self.constraints.push(constraint!(lhs >= rhs));
    }

    fn equal(&mut self, lhs: Expression, rhs: Expression) {
        self.constraints.push(constraint!(lhs == rhs));
    }

    /// `z = a AND b` for binaries `a`, `b`.
    fn conjunction(&mut self, a: Variable, b: Variable, name: String) -> Variable {
        let z = self.binary(name);
        self.at_most(Expression::from(z), Expression::from(a));
        self.at_most(Expression::from(z), Expression::from(b));
        self.at_least(Expression::from(z), Expression::from(a) + b - 1.0);
        self.stats.conjunction_binaries += 1;
        z
    }
}

/// Builds a [`ScheduleModel`] from a problem and feature flags.
///
/// # Example
/// ```no_run
/// use u_schedule_milp::milp::ScheduleModelBuilder;
/// use u_schedule_milp::models::{SchedulingProblem, Task};
///
/// let problem = SchedulingProblem::new(vec![
///     Task::new("P1", 10.0, "M1"),
///     Task::new("P2", 20.0, "M1"),
/// ]);
/// let model = ScheduleModelBuilder::new(&problem).build();
/// assert_eq!(model.layout().stats.ordering_binaries, 1);
/// ```
pub struct ScheduleModelBuilder<'a> {
    problem: &'a SchedulingProblem,
    allow_reassign: bool,
    deadlines: DeadlineMode,
    slot_width: f64,
}

impl<'a> ScheduleModelBuilder<'a> {
    /// Creates a builder with fixed assignments, hard deadlines and the
    /// default slot width.
    pub fn new(problem: &'a SchedulingProblem) -> Self {
        Self {
            problem,
            allow_reassign: false,
            deadlines: DeadlineMode::Hard,
            slot_width: DEFAULT_SLOT_WIDTH,
        }
    }

    /// Creates a builder configured from solve options.
    pub fn from_options(problem: &'a SchedulingProblem, options: &SolveOptions) -> Self {
        Self::new(problem)
            .with_reassignment(options.allow_reassign)
            .with_deadline_mode(options.deadline_mode())
            .with_slot_width(options.effective_slot_width())
    }

    /// Enables machine reassignment.
    pub fn with_reassignment(mut self, allow: bool) -> Self {
        self.allow_reassign = allow;
        self
    }

    /// Sets deadline handling.
    pub fn with_deadline_mode(mut self, mode: DeadlineMode) -> Self {
        self.deadlines = mode;
        self
    }

    /// Sets the staff slot width.
    pub fn with_slot_width(mut self, width: f64) -> Self {
        self.slot_width = width;
        self
    }

    /// Builds the model.
    pub fn build(&self) -> ScheduleModel {
        let tasks = &self.problem.tasks;
        let index = ResourceIndex::build(tasks, self.allow_reassign);
        let horizon = Horizon::compute(self.problem);

        let mut cx = Emitter {
            vars: ProblemVariables::new(),
            constraints: Vec::new(),
            big_m: horizon.big_m,
            stats: ModelStats {
                tasks: tasks.len(),
                ..ModelStats::default()
            },
        };

        let starts: Vec<Variable> = tasks
            .iter()
            .map(|t| {
                let latest = (horizon.length - t.duration).max(t.release);
                cx.vars.add(
                    variable()
                        .min(t.release)
                        .max(latest)
                        .name(format!("start_{}", t.id)),
                )
            })
            .collect();

        let makespan = cx.vars.add(variable().min(0.0).name("makespan"));
        for (t, &s) in tasks.iter().zip(&starts) {
            cx.at_least(Expression::from(makespan), Expression::from(s) + t.duration);
        }

        let assignments = self.assignment_variables(&mut cx, tasks, &index);
        self.add_disjunctions(&mut cx, tasks, &starts, &assignments, &index);
        self.add_setup_precedence(&mut cx, tasks, &starts);
        let lateness = self.add_deadlines(&mut cx, tasks, &starts);
        self.add_maintenance(&mut cx, tasks, &starts, &assignments, &index, &horizon);
        self.add_staff_capacity(&mut cx, tasks, &starts, &index, &horizon);

        cx.stats.constraints = cx.constraints.len();
        debug!(
            tasks = cx.stats.tasks,
            ordering = cx.stats.ordering_binaries,
            assignment = cx.stats.assignment_binaries,
            conjunction = cx.stats.conjunction_binaries,
            maintenance = cx.stats.maintenance_binaries,
            slots = cx.stats.slot_binaries,
            constraints = cx.stats.constraints,
            horizon = horizon.length,
            big_m = horizon.big_m,
            "Built scheduling model"
        );

        let layout = ModelLayout {
            starts,
            makespan,
            lateness,
            assignments,
            index,
            horizon,
            stats: cx.stats,
        };

        ScheduleModel {
            variables: cx.vars,
            constraints: cx.constraints,
            layout,
        }
    }

    /// One binary per (task, candidate machine) with `Σ_m y_im = 1`.
    fn assignment_variables(
        &self,
        cx: &mut Emitter,
        tasks: &[Task],
        index: &ResourceIndex,
    ) -> Vec<Vec<(usize, Variable)>> {
        if !self.allow_reassign {
            return vec![Vec::new(); tasks.len()];
        }

        tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let ys: Vec<(usize, Variable)> = index
                    .candidates(i)
                    .iter()
                    .map(|&m| {
                        let name = format!(
                            "assign_{}_{}",
                            task.id,
                            index.machine_name(m).unwrap_or_default()
                        );
                        (m, cx.binary(name))
                    })
                    .collect();
                cx.stats.assignment_binaries += ys.len();

                let chosen = ys
                    .iter()
                    .fold(Expression::from(0.0), |acc, &(_, y)| acc + y);
                cx.equal(chosen, Expression::from(1.0));
                ys
            })
            .collect()
    }

    /// Machine and staff disjunctions sharing one ordering binary per pair.
    fn add_disjunctions(
        &self,
        cx: &mut Emitter,
        tasks: &[Task],
        starts: &[Variable],
        assignments: &[Vec<(usize, Variable)>],
        index: &ResourceIndex,
    ) {
        let big_m = cx.big_m;

        for i in 0..tasks.len() {
            for k in (i + 1)..tasks.len() {
                let shared = index.shared_machines(i, k);
                let staff_conflict = index.shares_staff(i, k)
                    && tasks[i]
                        .staff_group
                        .as_deref()
                        .is_some_and(|g| self.problem.staff_capacity.is_exclusive(g));

                if shared.is_empty() && !staff_conflict {
                    continue;
                }

                let (ti, tk) = (&tasks[i], &tasks[k]);
                let (si, sk) = (starts[i], starts[k]);
                let x = cx.binary(format!("order_{}_{}", ti.id, tk.id));
                cx.stats.ordering_binaries += 1;

                // Setup applies to the successor's declaration.
                let setup_ik = tk.setup_after_task(&ti.id);
                let setup_ki = ti.setup_after_task(&tk.id);

                if self.allow_reassign {
                    for m in shared {
                        let (Some(yi), Some(yk)) =
                            (lookup(&assignments[i], m), lookup(&assignments[k], m))
                        else {
                            continue;
                        };
                        let z = cx.conjunction(yi, yk, format!("same_{}_{}_{m}", ti.id, tk.id));
                        // S_i + p_i + s <= S_k + M(1 - x) + M(1 - z)
                        cx.at_most(
                            Expression::from(si) + (ti.duration + setup_ik),
                            Expression::from(sk) + 2.0 * big_m - big_m * x - big_m * z,
                        );
                        // S_k + p_k + s <= S_i + M x + M(1 - z)
                        cx.at_most(
                            Expression::from(sk) + (tk.duration + setup_ki),
                            Expression::from(si) + big_m + big_m * x - big_m * z,
                        );
                    }
                } else if !shared.is_empty() {
                    cx.at_most(
                        Expression::from(si) + (ti.duration + setup_ik),
                        Expression::from(sk) + big_m - big_m * x,
                    );
                    cx.at_most(
                        Expression::from(sk) + (tk.duration + setup_ki),
                        Expression::from(si) + big_m * x,
                    );
                }

                if staff_conflict {
                    cx.at_most(
                        Expression::from(si) + ti.duration,
                        Expression::from(sk) + big_m - big_m * x,
                    );
                    cx.at_most(
                        Expression::from(sk) + tk.duration,
                        Expression::from(si) + big_m * x,
                    );
                }
            }
        }
    }

    /// `S_a >= S_b + p_b + s` for every positive setup `a` declares after `b`.
    fn add_setup_precedence(&self, cx: &mut Emitter, tasks: &[Task], starts: &[Variable]) {
        let positions: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        for (a, task) in tasks.iter().enumerate() {
            for (pred, &setup) in &task.setup_after {
                if setup <= 0.0 {
                    continue;
                }
                match positions.get(pred.as_str()) {
                    Some(&b) if b != a => {
                        cx.at_least(
                            Expression::from(starts[a]),
                            Expression::from(starts[b]) + (tasks[b].duration + setup),
                        );
                    }
                    _ => debug!(task = %task.id, pred = %pred, "Ignoring setup on unknown task"),
                }
            }
        }
    }

    fn add_deadlines(
        &self,
        cx: &mut Emitter,
        tasks: &[Task],
        starts: &[Variable],
    ) -> Vec<Option<Variable>> {
        tasks
            .iter()
            .zip(starts)
            .map(|(task, &s)| {
                let deadline = task.deadline?;
                let completion = Expression::from(s) + task.duration;
                match self.deadlines {
                    DeadlineMode::Hard => {
                        cx.at_most(completion, Expression::from(deadline));
                        None
                    }
                    DeadlineMode::Soft { .. } => {
                        let late = cx.vars.add(variable().min(0.0).name(format!("late_{}", task.id)));
                        cx.at_least(Expression::from(late), completion - deadline);
                        Some(late)
                    }
                }
            })
            .collect()
    }

    /// Either `S + p <= start` or `S >= end` per task and blocking window.
    fn add_maintenance(
        &self,
        cx: &mut Emitter,
        tasks: &[Task],
        starts: &[Variable],
        assignments: &[Vec<(usize, Variable)>],
        index: &ResourceIndex,
        horizon: &Horizon,
    ) {
        let big_m = cx.big_m;

        for window in &self.problem.maintenance {
            if !window.is_valid() || window.start >= horizon.length {
                continue;
            }
            let Some(m) = index.machine_index(&window.machine) else {
                continue;
            };

            for i in index.tasks_on_machine(m) {
                let task = &tasks[i];
                if window.end <= task.release {
                    continue;
                }
                let s = starts[i];
                let w = cx.binary(format!(
                    "maint_{}_{}_{}_{}",
                    task.id, window.machine, window.start, window.end
                ));
                cx.stats.maintenance_binaries += 1;

                // Relaxed entirely when the task is placed elsewhere.
                let (relax_before, relax_after) = match lookup(&assignments[i], m) {
                    Some(y) => (
                        Expression::from(big_m) - big_m * y,
                        Expression::from(big_m) - big_m * y,
                    ),
                    None => (Expression::from(0.0), Expression::from(0.0)),
                };

                // S + p <= a + M w
                cx.at_most(
                    Expression::from(s) + task.duration,
                    Expression::from(window.start) + big_m * w + relax_before,
                );
                // S >= b - M(1 - w)
                cx.at_least(
                    Expression::from(s) + relax_after,
                    Expression::from(window.end - big_m) + big_m * w,
                );
            }
        }
    }

    /// Slot-discretized capacity for every declared group that is not exclusive.
    fn add_staff_capacity(
        &self,
        cx: &mut Emitter,
        tasks: &[Task],
        starts: &[Variable],
        index: &ResourceIndex,
        horizon: &Horizon,
    ) {
        let big_m = cx.big_m;
        let points = horizon.slot_points(self.slot_width);

        for (group, capacity) in self.problem.staff_capacity.iter() {
            if self.problem.staff_capacity.is_exclusive(group) {
                continue;
            }
            let Some(g) = index.staff_group_index(group) else {
                continue;
            };
            let members = index.tasks_in_group(g);
            if members.len() <= capacity as usize {
                continue;
            }

            for (slot, &t) in points.iter().enumerate() {
                let mut active = Expression::from(0.0);
                let mut counted = 0usize;

                for &i in &members {
                    let task = &tasks[i];
                    if t < task.release {
                        continue;
                    }
                    let s = starts[i];
                    let a = cx.binary(format!("started_{}_{slot}", task.id));
                    let b = cx.binary(format!("running_{}_{slot}", task.id));
                    let u = cx.binary(format!("active_{}_{slot}", task.id));
                    cx.stats.slot_binaries += 3;

                    // a = 1 <=> S <= t
                    cx.at_most(Expression::from(s), Expression::from(t + big_m) - big_m * a);
                    cx.at_least(Expression::from(s) + big_m * a, Expression::from(t + SLOT_EPSILON));
                    // b = 1 <=> S + p > t
                    cx.at_least(
                        Expression::from(s) + task.duration,
                        Expression::from(t + SLOT_EPSILON - big_m) + big_m * b,
                    );
                    cx.at_most(Expression::from(s) + task.duration, Expression::from(t) + big_m * b);
                    // u = a AND b
                    cx.at_least(Expression::from(u), Expression::from(a) + b - 1.0);
                    cx.at_most(Expression::from(u), Expression::from(a));
                    cx.at_most(Expression::from(u), Expression::from(b));

                    active = active + u;
                    counted += 1;
                }

                if counted > capacity as usize {
                    cx.at_most(active, Expression::from(f64::from(capacity)));
                }
            }
        }
    }
}

fn lookup(assignments: &[(usize, Variable)], machine: usize) -> Option<Variable> {
    assignments
        .iter()
        .find(|&&(m, _)| m == machine)
        .map(|&(_, y)| y)
}
