//! Objective composer.
//!
//! Assembles the linear objective selected by an [`ObjectiveSpec`] from the
//! variables of a built model. Objectives are kept as explicit
//! `(variable, coefficient)` terms plus a constant so the orchestrator can
//! evaluate them from the values an engine reports.

use good_lp::{constraint, Expression, Variable};

use super::builder::ScheduleModel;
use crate::config::{DeadlineMode, MultiCriteriaWeights};
use crate::models::{ObjectiveSpec, SchedulingProblem};

/// A linear objective `Σ c_j v_j + constant`.
#[derive(Debug, Clone, Default)]
pub struct LinearObjective {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl LinearObjective {
    /// Creates an empty (zero) objective.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `coefficient · var`. Zero coefficients are dropped.
    pub fn add_term(&mut self, var: Variable, coefficient: f64) {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
    }

    /// Adds a constant.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Adds `scale · other`.
    pub fn add_scaled(&mut self, other: &LinearObjective, scale: f64) {
        if scale == 0.0 {
            return;
        }
        for &(var, c) in &other.terms {
            self.add_term(var, scale * c);
        }
        self.constant += scale * other.constant;
    }

    /// Variables in term order.
    pub fn variables(&self) -> Vec<Variable> {
        self.terms.iter().map(|&(v, _)| v).collect()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether there are no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Constant part.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// The objective as a `good_lp` expression.
    pub fn to_expression(&self) -> Expression {
        self.terms
            .iter()
            .fold(Expression::from(self.constant), |acc, &(v, c)| acc + c * v)
    }

    /// Evaluates the objective given values aligned with [`variables`](Self::variables).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .zip(values)
            .map(|(&(_, c), &x)| c * x)
            .sum::<f64>()
            + self.constant
    }
}

/// `C_max`.
fn makespan_term(model: &ScheduleModel) -> LinearObjective {
    let mut obj = LinearObjective::new();
    obj.add_term(model.layout().makespan, 1.0);
    obj
}

/// `Σ w_i (S_i + p_i)`.
fn weighted_completion_term(model: &ScheduleModel, problem: &SchedulingProblem) -> LinearObjective {
    let mut obj = LinearObjective::new();
    for (task, &s) in problem.tasks.iter().zip(&model.layout().starts) {
        obj.add_term(s, task.priority);
        obj.add_constant(task.priority * task.duration);
    }
    obj
}

/// `Σ_g F_g` where `F_g` bounds the completion of every task in group `g`.
fn staff_workload_term(model: &mut ScheduleModel, problem: &SchedulingProblem) -> LinearObjective {
    let mut obj = LinearObjective::new();
    let groups: Vec<(String, Vec<usize>)> = {
        let index = &model.layout().index;
        index
            .staff_groups()
            .iter()
            .enumerate()
            .map(|(g, name)| (name.clone(), index.tasks_in_group(g)))
            .collect()
    };

    for (name, members) in groups {
        let finish = model.add_continuous(format!("staff_finish_{name}"));
        for i in members {
            let start = model.layout().starts[i];
            let completion = Expression::from(start) + problem.tasks[i].duration;
            let bound = Expression::from(finish);
            model.add_constraint(constraint!(bound >= completion));
        }
        obj.add_term(finish, 1.0);
    }
    obj
}

/// `penalty · Σ w_i L_i`.
fn lateness_term(model: &ScheduleModel, problem: &SchedulingProblem, penalty: f64) -> LinearObjective {
    let mut obj = LinearObjective::new();
    for (task, late) in problem.tasks.iter().zip(&model.layout().lateness) {
        if let Some(l) = *late {
            obj.add_term(l, penalty * task.priority);
        }
    }
    obj
}

/// Composes the objective for `spec`, adding auxiliary variables to `model`
/// when the objective needs them.
///
/// `lex_makespan` composes its first stage (makespan); the orchestrator
/// runs the second stage. A lateness term is added whenever deadlines are
/// soft.
pub fn compose_objective(
    model: &mut ScheduleModel,
    problem: &SchedulingProblem,
    spec: ObjectiveSpec,
    weights: &MultiCriteriaWeights,
    deadlines: DeadlineMode,
) -> LinearObjective {
    let mut objective = match spec {
        ObjectiveSpec::Makespan | ObjectiveSpec::LexMakespan => makespan_term(model),
        ObjectiveSpec::WeightedCompletion => weighted_completion_term(model, problem),
        ObjectiveSpec::MultiCriteria => {
            let mut obj = LinearObjective::new();
            obj.add_scaled(&makespan_term(model), weights.makespan);
            obj.add_scaled(&weighted_completion_term(model, problem), weights.weighted_completion);
            if weights.staff_workload != 0.0 {
                let staff = staff_workload_term(model, problem);
                obj.add_scaled(&staff, weights.staff_workload);
            }
            obj
        }
        ObjectiveSpec::WeightedSum { alpha, beta } => {
            let mut obj = LinearObjective::new();
            obj.add_scaled(&makespan_term(model), alpha);
            obj.add_scaled(&weighted_completion_term(model, problem), beta);
            obj
        }
    };

    if let DeadlineMode::Soft { penalty } = deadlines {
        objective.add_scaled(&lateness_term(model, problem, penalty), 1.0);
    }

    objective
}
