//! Workload model: turns a staff member's active tasks plus historical
//! performance into a workload score.
//!
//! Pure computation; scores are derived on demand from a snapshot and never
//! cached across sweeps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::staff::StaffMember;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadMetrics {
    pub active_task_count: usize,
    pub total_estimated_hours: f64,
    /// In (0, 1]; 1.0 for staff with no history.
    pub performance_score: f64,
    pub overdue_task_count: usize,
}

/// Derived workload for one staff member. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadScore {
    /// Sum of priority x urgency x hours over active tasks.
    pub raw: f64,
    /// raw divided by the performance score; the overload metric.
    pub weighted: f64,
    pub metrics: WorkloadMetrics,
}

/// Score a staff member against their current active task set.
///
/// `weighted >= raw` always holds: the performance divisor is capped at 1.
pub fn score(
    staff: &StaffMember,
    active_tasks: &[Task],
    now: DateTime<Utc>,
) -> Result<WorkloadScore, InputError> {
    let mut raw = 0.0;
    let mut hours = 0.0;
    let mut active = 0usize;
    let mut overdue = 0usize;

    for task in active_tasks {
        task.validate()?;
        if !task.is_active() {
            continue;
        }
        raw += task.weight_contribution();
        hours += task.estimated_duration_minutes as f64 / 60.0;
        active += 1;
        if task.is_overdue(now) {
            overdue += 1;
        }
    }

    let performance_score = staff.performance_score();
    let weighted = raw / performance_score;

    Ok(WorkloadScore {
        raw,
        weighted,
        metrics: WorkloadMetrics {
            active_task_count: active,
            total_estimated_hours: hours,
            performance_score,
            overdue_task_count: overdue,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, TaskStatus, Urgency};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn task(id: &str, minutes: i64) -> Task {
        Task::new(id, "work", "icu", "assessment").with_duration(minutes)
    }

    /// Scenario: high/emergency 60min task at performance 0.9.
    #[test]
    fn high_emergency_hour_at_point_nine_performance() {
        let staff = StaffMember::new("n1", "icu").with_performance(0.9, 0.9);
        let tasks = vec![
            task("t1", 60)
                .with_priority(Priority::High)
                .with_urgency(Urgency::Emergency),
        ];
        let s = score(&staff, &tasks, now()).unwrap();
        assert_eq!(s.raw, 9.0);
        assert_eq!(s.weighted, 10.0);
        assert_eq!(s.metrics.active_task_count, 1);
    }

    #[test]
    fn raw_strictly_increases_with_identical_tasks() {
        let staff = StaffMember::new("n1", "icu");
        let mut tasks = Vec::new();
        let mut prev = 0.0;
        for i in 0..5 {
            tasks.push(task(&format!("t{i}"), 30));
            let s = score(&staff, &tasks, now()).unwrap();
            assert!(s.raw > prev);
            prev = s.raw;
        }
    }

    #[test]
    fn weighted_never_below_raw() {
        for rate in [0.0, 0.3, 0.7, 1.0] {
            let staff = StaffMember::new("n1", "icu").with_performance(rate, rate);
            let tasks = vec![task("t1", 45), task("t2", 90)];
            let s = score(&staff, &tasks, now()).unwrap();
            assert!(s.weighted >= s.raw);
        }
    }

    #[test]
    fn terminal_tasks_do_not_count() {
        let staff = StaffMember::new("n1", "icu");
        let mut done = task("t1", 60);
        done.status = TaskStatus::Completed;
        let s = score(&staff, &[done, task("t2", 30)], now()).unwrap();
        assert_eq!(s.metrics.active_task_count, 1);
        assert_eq!(s.raw, 1.0);
    }

    #[test]
    fn overdue_active_tasks_are_counted() {
        let staff = StaffMember::new("n1", "icu");
        let tasks = vec![
            task("t1", 30).with_due_date(now() - chrono::Duration::hours(1)),
            task("t2", 30).with_due_date(now() + chrono::Duration::hours(1)),
        ];
        let s = score(&staff, &tasks, now()).unwrap();
        assert_eq!(s.metrics.overdue_task_count, 1);
    }

    #[test]
    fn malformed_duration_surfaces_input_error() {
        let staff = StaffMember::new("n1", "icu");
        let tasks = vec![task("t1", 2)];
        assert!(score(&staff, &tasks, now()).is_err());
    }
}
