//! Task model: the unit of work the engine assigns and rebalances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Minimum believable task duration; anything shorter is malformed input.
pub const MIN_DURATION_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn weight(self) -> f64 {
        match self {
            Self::High => 3.0,
            Self::Medium => 2.0,
            Self::Low => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Routine,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn weight(self) -> f64 {
        match self {
            Self::Routine => 1.0,
            Self::Urgent => 2.0,
            Self::Emergency => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position in the forward-only todo -> in_progress -> completed chain.
    fn rank(self) -> u8 {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::Cancelled => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// One entry in a task's append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub performed_by: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl HistoryEntry {
    pub fn new(
        action: impl Into<String>,
        performed_by: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            performed_by: performed_by.into(),
            timestamp,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Core task type.
///
/// Tasks are never deleted; they end up completed or cancelled, and every
/// mutation appends exactly one history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,

    pub priority: Priority,
    pub urgency: Urgency,
    pub status: TaskStatus,

    pub department: String,
    pub category: String,

    /// Minutes; >= 5.
    pub estimated_duration_minutes: i64,

    pub due_date: Option<DateTime<Utc>>,

    /// Staff id currently holding the task, if any.
    pub assigned_to: Option<String>,

    /// Specialty tags a well-matched assignee should cover.
    #[serde(default)]
    pub specialty_tags: Vec<String>,

    /// Ids of tasks this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Append-only audit log.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Opaque annotations (advisory confidence/reasoning, host metadata).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        department: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority: Priority::Medium,
            urgency: Urgency::Routine,
            status: TaskStatus::Todo,
            department: department.into(),
            category: category.into(),
            estimated_duration_minutes: 30,
            due_date: None,
            assigned_to: None,
            specialty_tags: Vec::new(),
            dependencies: Vec::new(),
            history: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.estimated_duration_minutes = minutes;
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_assignee(mut self, staff_id: impl Into<String>) -> Self {
        self.assigned_to = Some(staff_id.into());
        self
    }

    pub fn with_specialty_tags(mut self, tags: Vec<String>) -> Self {
        self.specialty_tags = tags;
        self
    }

    pub fn with_dependencies(mut self, ids: Vec<String>) -> Self {
        self.dependencies = ids;
        self
    }

    /// Minimal invariants for safe downstream scoring.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.estimated_duration_minutes < MIN_DURATION_MINUTES {
            return Err(InputError::DurationTooShort {
                id: self.id.clone(),
                minutes: self.estimated_duration_minutes,
                floor: MIN_DURATION_MINUTES,
            });
        }
        Ok(())
    }

    /// Raw workload weight this task contributes to whoever holds it.
    pub fn weight_contribution(&self) -> f64 {
        self.priority.weight() * self.urgency.weight() * (self.estimated_duration_minutes as f64 / 60.0)
    }

    /// Counts toward a holder's active workload.
    pub fn is_active(&self) -> bool {
        matches!(self.status, TaskStatus::Todo | TaskStatus::InProgress)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date.is_some_and(|d| d < now)
    }

    /// Append an audit entry without changing any other field.
    pub fn record(
        &mut self,
        action: impl Into<String>,
        performed_by: impl Into<String>,
        details: Option<String>,
        now: DateTime<Utc>,
    ) {
        let mut entry = HistoryEntry::new(action, performed_by, now);
        entry.details = details;
        self.history.push(entry);
    }

    /// Forward-only status change. Cancel is allowed from any non-terminal
    /// state; everything else must move down the todo -> in_progress ->
    /// completed chain.
    pub fn transition(
        &mut self,
        to: TaskStatus,
        performed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), InputError> {
        let from = self.status;
        let allowed = match to {
            TaskStatus::Cancelled => !from.is_terminal(),
            _ => !from.is_terminal() && to.rank() > from.rank(),
        };
        if !allowed {
            return Err(InputError::InvalidTransition {
                id: self.id.clone(),
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        self.record(format!("status_{}", to.as_str()), performed_by, None, now);
        Ok(())
    }

    /// Move the task to a new holder. Does not change status; appends one
    /// history entry. Completed tasks keep their assignee forever.
    pub fn reassign(
        &mut self,
        to_staff: &str,
        performed_by: &str,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InputError> {
        if self.status == TaskStatus::Completed {
            return Err(InputError::ReassignCompleted { id: self.id.clone() });
        }
        self.assigned_to = Some(to_staff.to_string());
        self.record("assigned", performed_by, details, now);
        Ok(())
    }
}

/// Blueprint a recurring schedule instantiates tasks from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub title: String,
    pub priority: Priority,
    pub urgency: Urgency,
    pub category: String,
    pub estimated_duration_minutes: i64,
    /// Due date offset from the firing instant, if the task carries one.
    pub due_in_hours: Option<i64>,
    #[serde(default)]
    pub specialty_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    #[test]
    fn weight_contribution_multiplies_priority_urgency_hours() {
        let t = Task::new("t1", "triage", "icu", "assessment")
            .with_priority(Priority::High)
            .with_urgency(Urgency::Emergency)
            .with_duration(60);
        assert_eq!(t.weight_contribution(), 9.0);
    }

    #[test]
    fn duration_below_floor_is_rejected() {
        let t = Task::new("t1", "blip", "icu", "assessment").with_duration(3);
        assert!(t.validate().is_err());
    }

    #[test]
    fn transitions_are_forward_only() {
        let mut t = Task::new("t1", "x", "icu", "assessment");
        t.transition(TaskStatus::InProgress, "n1", now()).unwrap();
        t.transition(TaskStatus::Completed, "n1", now()).unwrap();
        assert!(t.transition(TaskStatus::InProgress, "n1", now()).is_err());
        assert_eq!(t.history.len(), 2);
    }

    #[test]
    fn cancel_allowed_from_any_open_state_only() {
        let mut t = Task::new("t1", "x", "icu", "assessment");
        t.transition(TaskStatus::Cancelled, "n1", now()).unwrap();
        assert!(t.transition(TaskStatus::Cancelled, "n1", now()).is_err());
    }

    #[test]
    fn reassign_keeps_status_and_appends_history() {
        let mut t = Task::new("t1", "x", "icu", "assessment").with_assignee("a");
        t.reassign("b", "system", None, now()).unwrap();
        assert_eq!(t.status, TaskStatus::Todo);
        assert_eq!(t.assigned_to.as_deref(), Some("b"));
        assert_eq!(t.history.len(), 1);
        assert_eq!(t.history[0].action, "assigned");
    }

    #[test]
    fn completed_task_never_loses_assignee() {
        let mut t = Task::new("t1", "x", "icu", "assessment").with_assignee("a");
        t.transition(TaskStatus::InProgress, "a", now()).unwrap();
        t.transition(TaskStatus::Completed, "a", now()).unwrap();
        assert!(t.reassign("b", "system", None, now()).is_err());
        assert_eq!(t.assigned_to.as_deref(), Some("a"));
    }
}
