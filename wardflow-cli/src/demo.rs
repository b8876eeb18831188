//! Seeded demo department backing the CLI.
//!
//! One ICU roster with an obviously overloaded nurse, a couple of dated
//! tasks and a daily recurring round, so every subcommand has something to
//! show without external services.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use wardflow_core::{
    Frequency, Priority, RecurringScheduleDefinition, Schedule, StaffMember, Task, TaskTemplate,
    Urgency,
};
use wardflow_engine::memory::{
    MemoryScheduleStore, MemoryStaffDirectory, MemoryTaskStore, RecordingSink,
};

pub struct DemoDepartment {
    pub tasks: Arc<MemoryTaskStore>,
    pub directory: Arc<MemoryStaffDirectory>,
    pub schedules: Arc<MemoryScheduleStore>,
    pub sink: Arc<RecordingSink>,
}

pub async fn seed() -> DemoDepartment {
    let tasks = Arc::new(MemoryTaskStore::new());
    let directory = Arc::new(MemoryStaffDirectory::new());
    let schedules = Arc::new(MemoryScheduleStore::new());
    let sink = Arc::new(RecordingSink::new());
    let now = Utc::now();

    for member in [
        StaffMember::new("nurse-chen", "icu")
            .with_roles(vec!["nurse".to_string()])
            .with_specialty_tags(vec!["cardio".to_string()])
            .with_performance(0.95, 0.9),
        StaffMember::new("nurse-okafor", "icu")
            .with_roles(vec!["nurse".to_string()])
            .with_specialty_tags(vec!["renal".to_string()]),
        StaffMember::new("dr-ivanov", "icu")
            .with_roles(vec!["physician".to_string()])
            .with_performance(0.9, 0.85),
        StaffMember::new("aide-santos", "icu").with_roles(vec!["aide".to_string()]),
    ] {
        directory.insert_staff(member).await;
    }

    // nurse-chen starts well over the default overload threshold.
    for task in [
        Task::new("t-monitor", "telemetry review", "icu", "assessment")
            .with_priority(Priority::High)
            .with_urgency(Urgency::Urgent)
            .with_duration(240)
            .with_assignee("nurse-chen"),
        Task::new("t-meds-a", "medication pass, wing A", "icu", "medication")
            .with_priority(Priority::High)
            .with_urgency(Urgency::Urgent)
            .with_duration(180)
            .with_assignee("nurse-chen")
            .with_due_date(now + Duration::hours(3)),
        Task::new("t-wound", "dressing change, bed 4", "icu", "wound_care")
            .with_priority(Priority::Medium)
            .with_urgency(Urgency::Urgent)
            .with_duration(90)
            .with_assignee("nurse-chen"),
        Task::new("t-charts", "chart backlog", "icu", "documentation")
            .with_priority(Priority::Low)
            .with_urgency(Urgency::Routine)
            .with_duration(120)
            .with_assignee("nurse-chen"),
        Task::new("t-transport", "transfer to radiology", "icu", "transport")
            .with_priority(Priority::Medium)
            .with_urgency(Urgency::Routine)
            .with_duration(45)
            .with_assignee("aide-santos")
            .with_due_date(now + Duration::hours(6)),
    ] {
        tasks.insert_task(task).await;
    }

    tasks
        .register_template(
            "morning-rounds",
            TaskTemplate {
                title: "morning rounds".to_string(),
                priority: Priority::High,
                urgency: Urgency::Routine,
                category: "assessment".to_string(),
                estimated_duration_minutes: 60,
                due_in_hours: Some(4),
                specialty_tags: Vec::new(),
            },
        )
        .await;

    let start = now.date_naive() - Duration::days(1);
    let mut rounds = RecurringScheduleDefinition::new(
        "sched-rounds",
        "morning-rounds",
        "icu",
        Schedule::new(
            Frequency::Daily,
            start,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
        ),
    );
    // Due immediately so the first recurrence sweep has work.
    rounds.next_run = Some(now - Duration::minutes(1));
    schedules.insert_schedule(rounds).await;

    let mut weekly = RecurringScheduleDefinition::new(
        "sched-audit",
        "morning-rounds",
        "icu",
        Schedule::new(
            Frequency::Weekly { days_of_week: vec![1, 3, 5] },
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap_or(start),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default(),
        )
        .with_timezone("America/Chicago"),
    );
    weekly.next_run = Some(now + Duration::days(1));
    schedules.insert_schedule(weekly).await;

    DemoDepartment {
        tasks,
        directory,
        schedules,
        sink,
    }
}
