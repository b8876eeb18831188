//! Notification event contracts emitted by the orchestrator.
//!
//! Fire-and-forget from the core's perspective: delivery, formatting and
//! cross-sweep deduplication all live behind the sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A task is due within the reminder window.
    DeadlineReminder {
        task_id: String,
        title: String,
        department: String,
        assigned_to: Option<String>,
        due_date: DateTime<Utc>,
    },
    /// Summary of a bottleneck sweep for one department.
    BottleneckAlert {
        department: String,
        reassignment_count: usize,
        still_overloaded: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// One applied reassignment.
    ReassignmentNotice {
        task_id: String,
        department: String,
        from_staff: String,
        to_staff: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Minimal invariants for safe downstream delivery.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::DeadlineReminder { task_id, department, .. } => {
                if task_id.trim().is_empty() {
                    return Err("task_id must be non-empty".to_string());
                }
                if department.trim().is_empty() {
                    return Err("department must be non-empty".to_string());
                }
            }
            Self::BottleneckAlert { department, .. } => {
                if department.trim().is_empty() {
                    return Err("department must be non-empty".to_string());
                }
            }
            Self::ReassignmentNotice { task_id, from_staff, to_staff, .. } => {
                if task_id.trim().is_empty() {
                    return Err("task_id must be non-empty".to_string());
                }
                if from_staff == to_staff {
                    return Err("from_staff and to_staff must differ".to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reminder_json_tag_is_stable() {
        let ev = NotificationEvent::DeadlineReminder {
            task_id: "t1".to_string(),
            title: "evening meds".to_string(),
            department: "icu".to_string(),
            assigned_to: Some("n1".to_string()),
            due_date: Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap(),
        };
        ev.validate().unwrap();
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"deadline_reminder\""));
        let back: NotificationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn self_move_fails_validation() {
        let ev = NotificationEvent::ReassignmentNotice {
            task_id: "t1".to_string(),
            department: "icu".to_string(),
            from_staff: "a".to_string(),
            to_staff: "a".to_string(),
            reason: "workload_balancing".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap(),
        };
        assert!(ev.validate().is_err());
    }
}
