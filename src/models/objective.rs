//! Objective selectors.
//!
//! Objectives are named by short strings so they can travel through JSON
//! documents and command lines unchanged:
//!
//! | Selector | Minimizes |
//! |----------|-----------|
//! | `makespan` | `C_max` |
//! | `weighted_completion` | `Σ w_j C_j` (default) |
//! | `multi_criteria` | fixed-weight mix of both, plus optional staff workload |
//! | `weighted_sum:<alpha>:<beta>` | `alpha · C_max + beta · Σ w_j C_j` |
//! | `lex_makespan` | `C_max`, then `Σ w_j C_j` at that `C_max` |
//!
//! Unknown selectors fall back to `weighted_completion`.
//!
//! # Reference
//! T'kindt & Billaut (2006), "Multicriteria Scheduling", Ch. 3

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default `alpha` when a weighted-sum selector omits its coefficients.
pub const DEFAULT_MAKESPAN_WEIGHT: f64 = 1.0;
/// Default `beta` when a weighted-sum selector omits its coefficients.
pub const DEFAULT_COMPLETION_WEIGHT: f64 = 0.5;

/// A parsed objective selector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectiveSpec {
    /// Minimize the latest completion time.
    Makespan,
    /// Minimize the priority-weighted sum of completion times.
    #[default]
    WeightedCompletion,
    /// Fixed-weight combination configured through
    /// [`MultiCriteriaWeights`](crate::config::MultiCriteriaWeights).
    MultiCriteria,
    /// `alpha · makespan + beta · weighted completion`.
    WeightedSum {
        /// Makespan coefficient.
        alpha: f64,
        /// Weighted-completion coefficient.
        beta: f64,
    },
    /// Makespan first, weighted completion as tie-breaker.
    LexMakespan,
}

impl ObjectiveSpec {
    /// Parses a selector, falling back to `weighted_completion` when unknown.
    pub fn parse(selector: &str) -> Self {
        let trimmed = selector.trim();
        match trimmed {
            "makespan" => Self::Makespan,
            "weighted_completion" => Self::WeightedCompletion,
            "multi_criteria" => Self::MultiCriteria,
            s if s.starts_with("lex_makespan") => Self::LexMakespan,
            s if s.starts_with("weighted_sum") => parse_weighted_sum(s),
            other => {
                warn!(selector = other, "Unknown objective, using weighted_completion");
                Self::WeightedCompletion
            }
        }
    }

    /// Canonical selector string.
    pub fn label(&self) -> String {
        match self {
            Self::Makespan => "makespan".to_string(),
            Self::WeightedCompletion => "weighted_completion".to_string(),
            Self::MultiCriteria => "multi_criteria".to_string(),
            Self::WeightedSum { alpha, beta } => format!("weighted_sum:{alpha}:{beta}"),
            Self::LexMakespan => "lex_makespan".to_string(),
        }
    }
}

fn parse_weighted_sum(selector: &str) -> ObjectiveSpec {
    let parts: Vec<&str> = selector.split(':').collect();
    let coefficients = match parts.as_slice() {
        [_, a, b] => a.trim().parse::<f64>().ok().zip(b.trim().parse::<f64>().ok()),
        _ => None,
    };
    match coefficients {
        Some((alpha, beta)) if alpha.is_finite() && beta.is_finite() => {
            ObjectiveSpec::WeightedSum { alpha, beta }
        }
        _ => {
            if parts.len() > 1 {
                warn!(
                    selector,
                    "Malformed weighted_sum coefficients, using defaults"
                );
            }
            ObjectiveSpec::WeightedSum {
                alpha: DEFAULT_MAKESPAN_WEIGHT,
                beta: DEFAULT_COMPLETION_WEIGHT,
            }
        }
    }
}

impl FromStr for ObjectiveSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ObjectiveSpec {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ObjectiveSpec> for String {
    fn from(spec: ObjectiveSpec) -> Self {
        spec.label()
    }
}

impl fmt::Display for ObjectiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_objectives() {
        assert_eq!(ObjectiveSpec::parse("makespan"), ObjectiveSpec::Makespan);
        assert_eq!(
            ObjectiveSpec::parse("weighted_completion"),
            ObjectiveSpec::WeightedCompletion
        );
        assert_eq!(
            ObjectiveSpec::parse(" multi_criteria "),
            ObjectiveSpec::MultiCriteria
        );
        assert_eq!(ObjectiveSpec::parse("lex_makespan"), ObjectiveSpec::LexMakespan);
    }

    #[test]
    fn test_parse_weighted_sum() {
        assert_eq!(
            ObjectiveSpec::parse("weighted_sum:2:0.25"),
            ObjectiveSpec::WeightedSum {
                alpha: 2.0,
                beta: 0.25
            }
        );
        // Missing or malformed coefficients fall back to the defaults.
        let defaults = ObjectiveSpec::WeightedSum {
            alpha: DEFAULT_MAKESPAN_WEIGHT,
            beta: DEFAULT_COMPLETION_WEIGHT,
        };
        assert_eq!(ObjectiveSpec::parse("weighted_sum"), defaults);
        assert_eq!(ObjectiveSpec::parse("weighted_sum:x:1"), defaults);
        assert_eq!(ObjectiveSpec::parse("weighted_sum:1:2:3"), defaults);
    }

    #[test]
    fn test_unknown_falls_back() {
        assert_eq!(
            ObjectiveSpec::parse("minimize_everything"),
            ObjectiveSpec::WeightedCompletion
        );
        assert_eq!(ObjectiveSpec::default(), ObjectiveSpec::WeightedCompletion);
    }

    #[test]
    fn test_label_round_trip() {
        for selector in ["makespan", "weighted_sum:1.5:0.5", "lex_makespan"] {
            let spec = ObjectiveSpec::parse(selector);
            assert_eq!(spec.label(), selector);
            assert_eq!(spec.to_string(), selector);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let spec: ObjectiveSpec = serde_json::from_str("\"weighted_sum:3:1\"").unwrap();
        assert_eq!(spec, ObjectiveSpec::WeightedSum { alpha: 3.0, beta: 1.0 });
        assert_eq!(
            serde_json::to_string(&ObjectiveSpec::Makespan).unwrap(),
            "\"makespan\""
        );
    }
}
