//! Staff records. Read-mostly: ownership lives with an external directory,
//! the engine only consumes them inside a sweep snapshot.

use serde::{Deserialize, Serialize};

/// Floor applied to the performance divisor so weighted workload never
/// blows up on a near-zero history.
pub const PERFORMANCE_FLOOR: f64 = 0.05;

/// Rolling performance summary supplied by an external analytics source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Fraction of assigned tasks completed, in [0, 1].
    pub completion_rate: f64,
    /// Fraction of completions that landed before their due date, in [0, 1].
    pub on_time_completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    pub department: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub specialty_tags: Vec<String>,
    pub performance: Option<PerformanceSummary>,
}

impl StaffMember {
    pub fn new(id: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            department: department.into(),
            roles: Vec::new(),
            specialty_tags: Vec::new(),
            performance: None,
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_specialty_tags(mut self, tags: Vec<String>) -> Self {
        self.specialty_tags = tags;
        self
    }

    pub fn with_performance(mut self, completion_rate: f64, on_time_completion_rate: f64) -> Self {
        self.performance = Some(PerformanceSummary {
            completion_rate,
            on_time_completion_rate,
        });
        self
    }

    /// Average of the two rates, defaulting to 1.0 when no history exists
    /// (new staff are never penalized), clamped to [PERFORMANCE_FLOOR, 1].
    pub fn performance_score(&self) -> f64 {
        let score = match self.performance {
            Some(p) => {
                let c = p.completion_rate.clamp(0.0, 1.0);
                let o = p.on_time_completion_rate.clamp(0.0, 1.0);
                (c + o) / 2.0
            }
            None => 1.0,
        };
        score.clamp(PERFORMANCE_FLOOR, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_scores_neutral() {
        let s = StaffMember::new("n1", "icu");
        assert_eq!(s.performance_score(), 1.0);
    }

    #[test]
    fn score_averages_rates() {
        let s = StaffMember::new("n1", "icu").with_performance(0.8, 1.0);
        assert_eq!(s.performance_score(), 0.9);
    }

    #[test]
    fn score_is_floored() {
        let s = StaffMember::new("n1", "icu").with_performance(0.0, 0.0);
        assert_eq!(s.performance_score(), PERFORMANCE_FLOOR);
    }
}
