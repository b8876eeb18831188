//! Boundary contracts the orchestrator runs against.
//!
//! Implementations are out of scope for the engine: a host process wires in
//! its own persistence, directory and notification transports. The crate
//! ships in-memory reference implementations in `memory` for tests and the
//! demo CLI.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wardflow_core::{
    HistoryEntry, NotificationEvent, RecurringScheduleDefinition, StaffMember, Task,
};

/// Outcome of a conditional assignment write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentUpdate {
    Applied,
    /// The task changed between snapshot and write; the caller drops the
    /// move for this sweep and re-evaluates from fresh data next time.
    Conflict,
}

/// Caller-supplied fields when instantiating a task from a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateOverrides {
    pub department: String,
    pub assign_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Id of the schedule definition that fired, recorded in metadata.
    pub schedule_id: Option<String>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks with status todo/in_progress for one department.
    async fn get_active_tasks(&self, department: &str) -> Result<Vec<Task>>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>>;

    /// Conditional write: apply only when the task's current assignee still
    /// matches `expected_assignee` and the task is still open.
    ///
    /// An applied update must also append exactly one `assigned` history
    /// entry (performed by `system`) to the task, keeping the audit log in
    /// step with the assignee change.
    async fn update_task_assignment(
        &self,
        id: &str,
        new_staff: &str,
        expected_assignee: Option<&str>,
    ) -> Result<AssignmentUpdate>;

    async fn append_history(&self, id: &str, entry: HistoryEntry) -> Result<()>;

    async fn create_task_from_template(
        &self,
        template_ref: &str,
        overrides: TemplateOverrides,
    ) -> Result<Task>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Staff eligible for work in a department, optionally narrowed to a
    /// task category, with current performance summaries attached.
    async fn get_eligible_staff(
        &self,
        department: &str,
        category: Option<&str>,
    ) -> Result<Vec<StaffMember>>;

    /// Departments the orchestrator sweeps over.
    async fn departments(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_active_schedules(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<RecurringScheduleDefinition>>;

    async fn save_schedule(&self, definition: &RecurringScheduleDefinition) -> Result<()>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Fire-and-forget: a delivery failure must never roll back the state
    /// change that produced the event.
    async fn emit(&self, event: NotificationEvent) -> Result<()>;
}

/// Non-authoritative assignment suggestion from an external advisor.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryHint {
    pub staff_id: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Optional advisory signal (e.g. an LLM-backed suggestion service). The
/// deterministic selector result is always computed and wins; a hint can
/// only break exact ties and annotate the audit trail.
#[async_trait]
pub trait AdvisorySignal: Send + Sync {
    async fn suggest_assignment(
        &self,
        task: &Task,
        candidates: &[StaffMember],
    ) -> Result<Option<AdvisoryHint>>;
}
