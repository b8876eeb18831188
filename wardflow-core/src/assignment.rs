//! Assignment selector: deterministic best-assignee scoring.
//!
//! No LLM in the loop. An advisory signal may annotate the outcome upstream,
//! but the ranking here is the ground truth.

use std::collections::HashSet;

use crate::staff::StaffMember;
use crate::task::Task;

const WORKLOAD_WEIGHT: f64 = 0.4;
const ROLE_WEIGHT: f64 = 0.3;
const SPECIALTY_WEIGHT: f64 = 0.3;

/// Suitability for (role, category) pairs not in the table.
pub const DEFAULT_ROLE_SUITABILITY: f64 = 0.5;

/// A candidate paired with their current weighted workload. The workload is
/// passed in (not recomputed here) so a rebalancing pass can feed running
/// in-memory scores.
#[derive(Debug, Clone, Copy)]
pub struct CandidateWorkload<'a> {
    pub staff: &'a StaffMember,
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub staff_id: String,
    pub score: f64,
    pub weighted: f64,
    pub role_suitability: f64,
    pub specialty_match: f64,
}

/// Static (role, category) suitability table.
fn role_category_score(role: &str, category: &str) -> f64 {
    match (role, category) {
        ("nurse", "medication") => 0.9,
        ("nurse", "assessment") => 0.85,
        ("nurse", "wound_care") => 0.9,
        ("physician", "assessment") => 0.95,
        ("physician", "orders") => 0.9,
        ("pharmacist", "medication") => 0.95,
        ("technician", "lab") => 0.9,
        ("technician", "equipment") => 0.85,
        ("aide", "transport") => 0.8,
        ("aide", "hygiene") => 0.8,
        ("clerk", "documentation") => 0.85,
        ("clerk", "scheduling") => 0.8,
        _ => DEFAULT_ROLE_SUITABILITY,
    }
}

/// Best suitability across a candidate's roles; 0.5 when they have none.
pub fn role_suitability(roles: &[String], category: &str) -> f64 {
    roles
        .iter()
        .map(|r| role_category_score(r, category))
        .fold(None::<f64>, |best, s| Some(best.map_or(s, |b| b.max(s))))
        .unwrap_or(DEFAULT_ROLE_SUITABILITY)
}

/// Fraction of the task's specialty tags the candidate covers, mapped into
/// [0.7, 1.0]. A task without tags is neutral (0.5); a tagged task against
/// an untagged candidate scores the 0.7 floor.
pub fn specialty_match(task_tags: &[String], staff_tags: &[String]) -> f64 {
    if task_tags.is_empty() {
        return 0.5;
    }
    if staff_tags.is_empty() {
        return 0.7;
    }
    let staff: HashSet<&str> = staff_tags.iter().map(String::as_str).collect();
    let covered = task_tags.iter().filter(|t| staff.contains(t.as_str())).count();
    0.7 + 0.3 * (covered as f64 / task_tags.len() as f64)
}

fn assignment_score(task: &Task, candidate: &CandidateWorkload<'_>) -> RankedCandidate {
    let workload_factor = 1.0 / (candidate.weighted + 1.0);
    let role = role_suitability(&candidate.staff.roles, &task.category);
    let specialty = specialty_match(&task.specialty_tags, &candidate.staff.specialty_tags);
    RankedCandidate {
        staff_id: candidate.staff.id.clone(),
        score: WORKLOAD_WEIGHT * workload_factor + ROLE_WEIGHT * role + SPECIALTY_WEIGHT * specialty,
        weighted: candidate.weighted,
        role_suitability: role,
        specialty_match: specialty,
    }
}

/// Rank all non-excluded candidates, best first.
///
/// Total order: score desc, then weighted workload asc, then staff id asc,
/// so results are reproducible across runs.
pub fn rank_candidates(
    task: &Task,
    candidates: &[CandidateWorkload<'_>],
    exclude: &HashSet<String>,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .filter(|c| !exclude.contains(&c.staff.id))
        .map(|c| assignment_score(task, c))
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.weighted.total_cmp(&b.weighted))
            .then_with(|| a.staff_id.cmp(&b.staff_id))
    });
    ranked
}

/// Best assignee for a task, or None when the pool is empty after exclusion.
/// Callers treat None as "no safe reassignment", not an error.
pub fn select_best(
    task: &Task,
    candidates: &[CandidateWorkload<'_>],
    exclude: &HashSet<String>,
) -> Option<RankedCandidate> {
    rank_candidates(task, candidates, exclude).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(id: &str, roles: &[&str], tags: &[&str]) -> StaffMember {
        StaffMember::new(id, "icu")
            .with_roles(roles.iter().map(|s| s.to_string()).collect())
            .with_specialty_tags(tags.iter().map(|s| s.to_string()).collect())
    }

    fn tags(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn role_suitability_takes_max_over_roles() {
        let r = role_suitability(&tags(&["aide", "pharmacist"]), "medication");
        assert_eq!(r, 0.95);
        assert_eq!(role_suitability(&tags(&["janitor"]), "medication"), DEFAULT_ROLE_SUITABILITY);
        assert_eq!(role_suitability(&[], "medication"), DEFAULT_ROLE_SUITABILITY);
    }

    #[test]
    fn specialty_match_bands() {
        assert_eq!(specialty_match(&[], &tags(&["cardio"])), 0.5);
        assert_eq!(specialty_match(&tags(&["cardio"]), &[]), 0.7);
        assert_eq!(specialty_match(&tags(&["cardio", "renal"]), &tags(&["cardio"])), 0.85);
        assert_eq!(specialty_match(&tags(&["cardio"]), &tags(&["cardio", "renal"])), 1.0);
    }

    #[test]
    fn lighter_workload_wins_all_else_equal() {
        let a = staff("a", &["nurse"], &[]);
        let b = staff("b", &["nurse"], &[]);
        let task = Task::new("t1", "x", "icu", "medication");
        let pool = [
            CandidateWorkload { staff: &a, weighted: 20.0 },
            CandidateWorkload { staff: &b, weighted: 5.0 },
        ];
        let best = select_best(&task, &pool, &HashSet::new()).unwrap();
        assert_eq!(best.staff_id, "b");
    }

    #[test]
    fn excluded_staff_never_selected() {
        let a = staff("a", &["nurse"], &[]);
        let b = staff("b", &["nurse"], &[]);
        let task = Task::new("t1", "x", "icu", "medication");
        let pool = [
            CandidateWorkload { staff: &a, weighted: 5.0 },
            CandidateWorkload { staff: &b, weighted: 50.0 },
        ];
        let exclude: HashSet<String> = ["a".to_string()].into();
        let ranked = rank_candidates(&task, &pool, &exclude);
        assert!(ranked.iter().all(|c| c.staff_id != "a"));
        assert_eq!(select_best(&task, &pool, &exclude).unwrap().staff_id, "b");
    }

    #[test]
    fn empty_pool_after_exclusion_is_none() {
        let a = staff("a", &["nurse"], &[]);
        let task = Task::new("t1", "x", "icu", "medication");
        let pool = [CandidateWorkload { staff: &a, weighted: 5.0 }];
        let exclude: HashSet<String> = ["a".to_string()].into();
        assert!(select_best(&task, &pool, &exclude).is_none());
    }

    #[test]
    fn exact_tie_breaks_on_smaller_id() {
        let a = staff("zeta", &["nurse"], &[]);
        let b = staff("alpha", &["nurse"], &[]);
        let task = Task::new("t1", "x", "icu", "medication");
        let pool = [
            CandidateWorkload { staff: &a, weighted: 10.0 },
            CandidateWorkload { staff: &b, weighted: 10.0 },
        ];
        let best = select_best(&task, &pool, &HashSet::new()).unwrap();
        assert_eq!(best.staff_id, "alpha");
    }

    #[test]
    fn specialty_coverage_outranks_untagged_candidate() {
        let tagged = staff("tagged", &["nurse"], &["cardio"]);
        let untagged = staff("untagged", &["nurse"], &[]);
        let task = Task::new("t1", "x", "icu", "medication")
            .with_specialty_tags(tags(&["cardio"]));
        let pool = [
            CandidateWorkload { staff: &tagged, weighted: 10.0 },
            CandidateWorkload { staff: &untagged, weighted: 10.0 },
        ];
        let best = select_best(&task, &pool, &HashSet::new()).unwrap();
        assert_eq!(best.staff_id, "tagged");
    }
}
