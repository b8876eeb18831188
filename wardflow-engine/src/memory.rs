//! In-memory reference implementations of the boundary contracts.
//!
//! Backing for the demo CLI and the engine's tests. State lives behind
//! tokio `RwLock`s so sweep tasks can share one store across loops; no
//! persistence, everything is gone on drop.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};

use wardflow_core::{
    HistoryEntry, NotificationEvent, RecurringScheduleDefinition, StaffMember, Task, TaskTemplate,
};

use crate::stores::{
    AssignmentUpdate, NotificationSink, ScheduleStore, StaffDirectory, TaskStore,
    TemplateOverrides,
};

#[derive(Default)]
struct TaskState {
    tasks: BTreeMap<String, Task>,
    templates: HashMap<String, TaskTemplate>,
    created: u64,
}

/// Task store over a tokio `RwLock`. Ids for instantiated tasks are
/// `task-{template_ref}-{n}` with a store-wide counter.
#[derive(Default)]
pub struct MemoryTaskStore {
    state: RwLock<TaskState>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_task(&self, task: Task) {
        let mut state = self.state.write().await;
        state.tasks.insert(task.id.clone(), task);
    }

    pub async fn register_template(&self, key: impl Into<String>, template: TaskTemplate) {
        let mut state = self.state.write().await;
        state.templates.insert(key.into(), template);
    }

    /// Every task in the store, id order. Demo/report helper, not part of
    /// the `TaskStore` contract.
    pub async fn all_tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.values().cloned().collect()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn get_active_tasks(&self, department: &str) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.department == department && t.is_active())
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.state.read().await.tasks.get(id).cloned())
    }

    async fn update_task_assignment(
        &self,
        id: &str,
        new_staff: &str,
        expected_assignee: Option<&str>,
    ) -> Result<AssignmentUpdate> {
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.get_mut(id) else {
            bail!("unknown task {id}");
        };
        if task.assigned_to.as_deref() != expected_assignee || !task.is_active() {
            return Ok(AssignmentUpdate::Conflict);
        }
        task.reassign(new_staff, "system", None, Utc::now())?;
        Ok(AssignmentUpdate::Applied)
    }

    async fn append_history(&self, id: &str, entry: HistoryEntry) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.get_mut(id) else {
            bail!("unknown task {id}");
        };
        task.history.push(entry);
        Ok(())
    }

    async fn create_task_from_template(
        &self,
        template_ref: &str,
        overrides: TemplateOverrides,
    ) -> Result<Task> {
        let mut state = self.state.write().await;
        let Some(template) = state.templates.get(template_ref).cloned() else {
            bail!("unknown task template {template_ref}");
        };

        state.created += 1;
        let id = format!("task-{template_ref}-{}", state.created);
        let now = Utc::now();

        let due_date = overrides.due_date.or_else(|| {
            template
                .due_in_hours
                .map(|h| now + Duration::hours(h))
        });

        let mut task = Task::new(&id, &template.title, &overrides.department, &template.category)
            .with_priority(template.priority)
            .with_urgency(template.urgency)
            .with_duration(template.estimated_duration_minutes)
            .with_specialty_tags(template.specialty_tags.clone());
        task.due_date = due_date;
        if let Some(schedule_id) = &overrides.schedule_id {
            task.metadata.insert(
                "schedule_id".to_string(),
                serde_json::Value::String(schedule_id.clone()),
            );
        }
        task.record("created", "scheduler", Some(format!("template {template_ref}")), now);
        if let Some(staff) = &overrides.assign_to {
            task.reassign(staff, "scheduler", None, now)?;
        }

        state.tasks.insert(id, task.clone());
        Ok(task)
    }
}

/// Static staff directory; the department list is derived from the members.
#[derive(Default)]
pub struct MemoryStaffDirectory {
    staff: RwLock<Vec<StaffMember>>,
}

impl MemoryStaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_staff(&self, member: StaffMember) {
        self.staff.write().await.push(member);
    }
}

#[async_trait]
impl StaffDirectory for MemoryStaffDirectory {
    async fn get_eligible_staff(
        &self,
        department: &str,
        _category: Option<&str>,
    ) -> Result<Vec<StaffMember>> {
        let staff = self.staff.read().await;
        Ok(staff
            .iter()
            .filter(|s| s.department == department)
            .cloned()
            .collect())
    }

    async fn departments(&self) -> Result<Vec<String>> {
        let staff = self.staff.read().await;
        let mut out: Vec<String> = staff.iter().map(|s| s.department.clone()).collect();
        out.sort();
        out.dedup();
        Ok(out)
    }
}

#[derive(Default)]
pub struct MemoryScheduleStore {
    schedules: RwLock<BTreeMap<String, RecurringScheduleDefinition>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_schedule(&self, def: RecurringScheduleDefinition) {
        let mut schedules = self.schedules.write().await;
        schedules.insert(def.id.clone(), def);
    }

    pub async fn get(&self, id: &str) -> Option<RecurringScheduleDefinition> {
        self.schedules.read().await.get(id).cloned()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn get_active_schedules(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<RecurringScheduleDefinition>> {
        let schedules = self.schedules.read().await;
        Ok(schedules
            .values()
            .filter(|d| d.is_active && department.is_none_or(|dep| d.department == dep))
            .cloned()
            .collect())
    }

    async fn save_schedule(&self, definition: &RecurringScheduleDefinition) -> Result<()> {
        let mut schedules = self.schedules.write().await;
        schedules.insert(definition.id.clone(), definition.clone());
        Ok(())
    }
}

/// Sink that keeps every emitted event, in order. Tests assert against it;
/// the demo CLI drains it into log lines.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<NotificationEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }

    pub async fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, event: NotificationEvent) -> Result<()> {
        if let Err(reason) = event.validate() {
            bail!("refusing malformed notification: {reason}");
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardflow_core::{Priority, TaskStatus, Urgency};

    fn template() -> TaskTemplate {
        TaskTemplate {
            title: "evening medication round".to_string(),
            priority: Priority::High,
            urgency: Urgency::Urgent,
            category: "medication".to_string(),
            estimated_duration_minutes: 45,
            due_in_hours: Some(2),
            specialty_tags: vec!["cardio".to_string()],
        }
    }

    #[tokio::test]
    async fn template_instantiation_generates_sequential_ids() {
        let store = MemoryTaskStore::new();
        store.register_template("meds", template()).await;

        let overrides = TemplateOverrides {
            department: "icu".to_string(),
            ..Default::default()
        };
        let first = store
            .create_task_from_template("meds", overrides.clone())
            .await
            .unwrap();
        let second = store
            .create_task_from_template("meds", overrides)
            .await
            .unwrap();

        assert_eq!(first.id, "task-meds-1");
        assert_eq!(second.id, "task-meds-2");
        assert_eq!(first.priority, Priority::High);
        assert!(first.due_date.is_some());
        assert_eq!(first.history.last().unwrap().action, "created");
    }

    #[tokio::test]
    async fn unknown_template_is_an_error() {
        let store = MemoryTaskStore::new();
        let overrides = TemplateOverrides {
            department: "icu".to_string(),
            ..Default::default()
        };
        assert!(store.create_task_from_template("nope", overrides).await.is_err());
    }

    #[tokio::test]
    async fn conditional_update_detects_stale_assignee() {
        let store = MemoryTaskStore::new();
        store
            .insert_task(Task::new("t1", "x", "icu", "assessment").with_assignee("a"))
            .await;

        let stale = store
            .update_task_assignment("t1", "c", Some("b"))
            .await
            .unwrap();
        assert_eq!(stale, AssignmentUpdate::Conflict);

        let applied = store
            .update_task_assignment("t1", "b", Some("a"))
            .await
            .unwrap();
        assert_eq!(applied, AssignmentUpdate::Applied);
        let task = store.get_task("t1").await.unwrap().unwrap();
        assert_eq!(task.assigned_to.as_deref(), Some("b"));

        // An applied write appends exactly one audit entry; the rejected
        // one appends none.
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].action, "assigned");
        assert_eq!(task.history[0].performed_by, "system");
    }

    #[tokio::test]
    async fn terminal_task_update_conflicts() {
        let store = MemoryTaskStore::new();
        let mut task = Task::new("t1", "x", "icu", "assessment").with_assignee("a");
        task.transition(TaskStatus::InProgress, "a", Utc::now()).unwrap();
        task.transition(TaskStatus::Completed, "a", Utc::now()).unwrap();
        store.insert_task(task).await;

        let out = store
            .update_task_assignment("t1", "b", Some("a"))
            .await
            .unwrap();
        assert_eq!(out, AssignmentUpdate::Conflict);
    }

    #[tokio::test]
    async fn directory_lists_departments_sorted_and_deduped() {
        let dir = MemoryStaffDirectory::new();
        dir.insert_staff(StaffMember::new("n1", "icu")).await;
        dir.insert_staff(StaffMember::new("n2", "er")).await;
        dir.insert_staff(StaffMember::new("n3", "icu")).await;
        assert_eq!(dir.departments().await.unwrap(), vec!["er", "icu"]);
    }

    #[tokio::test]
    async fn sink_rejects_malformed_events() {
        let sink = RecordingSink::new();
        let bad = NotificationEvent::ReassignmentNotice {
            task_id: "t1".to_string(),
            department: "icu".to_string(),
            from_staff: "a".to_string(),
            to_staff: "a".to_string(),
            reason: "workload_balancing".to_string(),
            timestamp: Utc::now(),
        };
        assert!(sink.emit(bad).await.is_err());
        assert!(sink.events().await.is_empty());
    }
}
