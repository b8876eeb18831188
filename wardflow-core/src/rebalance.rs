//! Rebalancing engine: greedy reassignment of work away from overloaded
//! staff.
//!
//! Operates on a single in-memory department snapshot. Lowest-impact tasks
//! move first to minimize disruption, and running weighted scores are
//! updated inside the pass so later decisions see earlier moves. Persistence
//! of accepted moves belongs to the orchestrator.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assignment::{CandidateWorkload, select_best};
use crate::error::InputError;
use crate::staff::StaffMember;
use crate::task::Task;
use crate::workload::{self, WorkloadScore};

pub const REASON_WORKLOAD_BALANCING: &str = "workload_balancing";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebalanceConfig {
    /// Weighted workload above which a staff member is overloaded.
    pub overload_threshold: f64,
    /// Minimum required gap between the holder's pre-move score and the
    /// candidate's post-move score; guards against thrashing.
    pub improvement_margin: f64,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            overload_threshold: 40.0,
            improvement_margin: 10.0,
        }
    }
}

/// A proposed move. Nothing is persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reassignment {
    pub task_id: String,
    pub from_staff: String,
    pub to_staff: String,
    pub reason: String,
    /// Weighted workload removed from the holder by this move.
    pub workload_delta: f64,
}

/// Department-scoped state fetched at sweep start and passed explicitly
/// through the call chain. No ambient caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSnapshot {
    pub department: String,
    pub staff: Vec<StaffMember>,
    pub tasks: Vec<Task>,
}

impl DepartmentSnapshot {
    /// Active tasks currently held by the given staff member.
    pub fn active_tasks_for(&self, staff_id: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_active() && t.assigned_to.as_deref() == Some(staff_id))
            .collect()
    }

    /// Workload score per staff member, keyed by id.
    pub fn scores(&self, now: DateTime<Utc>) -> Result<BTreeMap<String, WorkloadScore>, InputError> {
        for task in &self.tasks {
            if task.department != self.department {
                return Err(InputError::WrongDepartment {
                    id: task.id.clone(),
                    actual: task.department.clone(),
                    expected: self.department.clone(),
                });
            }
        }
        let mut out = BTreeMap::new();
        for member in &self.staff {
            let held: Vec<Task> = self
                .active_tasks_for(&member.id)
                .into_iter()
                .cloned()
                .collect();
            out.insert(member.id.clone(), workload::score(member, &held, now)?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOutcome {
    pub moves: Vec<Reassignment>,
    /// In-pass weighted scores after all accepted moves, keyed by staff id.
    pub weighted_after: BTreeMap<String, f64>,
}

impl RebalanceOutcome {
    /// Staff still above the threshold once the pass is done. Rebalancing is
    /// best-effort, so this can be non-empty.
    pub fn still_overloaded(&self, threshold: f64) -> Vec<String> {
        self.weighted_after
            .iter()
            .filter(|(_, w)| **w > threshold)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// One greedy rebalancing pass over the snapshot.
///
/// "No candidate found" is a normal outcome (the holder simply keeps their
/// tasks); only malformed input is an error.
pub fn rebalance(
    snapshot: &DepartmentSnapshot,
    now: DateTime<Utc>,
    config: RebalanceConfig,
) -> Result<RebalanceOutcome, InputError> {
    let scores = snapshot.scores(now)?;
    let mut weighted: BTreeMap<String, f64> =
        scores.iter().map(|(id, s)| (id.clone(), s.weighted)).collect();

    let staff_by_id: HashMap<&str, &StaffMember> =
        snapshot.staff.iter().map(|s| (s.id.as_str(), s)).collect();

    // Overload is judged against the snapshot, not against in-pass updates:
    // a candidate pushed upward mid-pass is the next sweep's problem.
    let mut holders: Vec<(String, f64)> = weighted
        .iter()
        .filter(|(_, w)| **w > config.overload_threshold)
        .map(|(id, w)| (id.clone(), *w))
        .collect();
    holders.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut moves = Vec::new();

    for (holder_id, _) in holders {
        let Some(holder) = staff_by_id.get(holder_id.as_str()) else {
            continue;
        };
        let holder_perf = holder.performance_score();

        let mut held = snapshot.active_tasks_for(&holder_id);
        for task in &held {
            task.validate()?;
        }
        held.sort_by(|a, b| {
            a.weight_contribution()
                .total_cmp(&b.weight_contribution())
                .then_with(|| a.id.cmp(&b.id))
        });

        let exclude: HashSet<String> = [holder_id.clone()].into();

        for task in held {
            if weighted[&holder_id] <= config.overload_threshold {
                break;
            }

            let pool: Vec<CandidateWorkload<'_>> = snapshot
                .staff
                .iter()
                .map(|s| CandidateWorkload {
                    staff: s,
                    weighted: weighted[&s.id],
                })
                .collect();

            let Some(best) = select_best(task, &pool, &exclude) else {
                break;
            };

            let raw = task.weight_contribution();
            let candidate_perf = staff_by_id[best.staff_id.as_str()].performance_score();
            let candidate_delta = raw / candidate_perf;
            let holder_delta = raw / holder_perf;
            let holder_before = weighted[&holder_id];

            if best.weighted + candidate_delta >= holder_before - config.improvement_margin {
                continue;
            }

            if let Some(w) = weighted.get_mut(&holder_id) {
                *w -= holder_delta;
            }
            if let Some(w) = weighted.get_mut(&best.staff_id) {
                *w += candidate_delta;
            }

            moves.push(Reassignment {
                task_id: task.id.clone(),
                from_staff: holder_id.clone(),
                to_staff: best.staff_id,
                reason: REASON_WORKLOAD_BALANCING.to_string(),
                workload_delta: holder_delta,
            });
        }
    }

    Ok(RebalanceOutcome {
        moves,
        weighted_after: weighted,
    })
}
