//! The three periodic sweeps: deadline reminders, bottleneck detection and
//! recurring-schedule firing.
//!
//! Every sweep is a plain async function over the boundary traits so it can
//! run on a timer, from the CLI, or inside a test without any scaffolding.
//! Failures on one task/schedule/department are logged and skipped; a sweep
//! only errors when it cannot make progress at all.

use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use wardflow_core::{
    CandidateWorkload, DepartmentSnapshot, ExecutionRecord, ExecutionStatus, HistoryEntry,
    NotificationEvent, RankedCandidate, RebalanceConfig, RecurringScheduleDefinition, Task,
    advance, rank_candidates, workload,
};

use crate::stores::{
    AdvisoryHint, AdvisorySignal, AssignmentUpdate, NotificationSink, ScheduleStore,
    StaffDirectory, TaskStore, TemplateOverrides,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlineSweepOutcome {
    pub departments_checked: usize,
    pub reminders_sent: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BottleneckSweepOutcome {
    pub applied: Vec<wardflow_core::Reassignment>,
    pub conflicts: usize,
    pub still_overloaded: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecurrenceSweepOutcome {
    pub fired: usize,
    pub failed: usize,
    pub deactivated: usize,
}

/// Remind assignees about open tasks coming due inside the window.
///
/// One reminder per qualifying task per sweep; cross-sweep deduplication
/// belongs to the notification layer. Tasks already past due don't qualify,
/// they show up in the workload metrics instead.
pub async fn run_deadline_sweep(
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    sink: &dyn NotificationSink,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<DeadlineSweepOutcome> {
    let departments = directory
        .departments()
        .await
        .context("listing departments")?;

    let mut outcome = DeadlineSweepOutcome::default();
    for department in departments {
        outcome.departments_checked += 1;
        let active = match tasks.get_active_tasks(&department).await {
            Ok(active) => active,
            Err(err) => {
                warn!(%department, error = %err, "deadline sweep: task fetch failed");
                continue;
            }
        };

        for task in active {
            let Some(due) = task.due_date else { continue };
            if due <= now || due > now + window {
                continue;
            }

            let event = NotificationEvent::DeadlineReminder {
                task_id: task.id.clone(),
                title: task.title.clone(),
                department: department.clone(),
                assigned_to: task.assigned_to.clone(),
                due_date: due,
            };
            if let Err(err) = sink.emit(event).await {
                warn!(task_id = %task.id, error = %err, "deadline reminder emit failed");
                continue;
            }
            outcome.reminders_sent += 1;
        }
    }

    info!(
        departments = outcome.departments_checked,
        reminders = outcome.reminders_sent,
        "deadline sweep done"
    );
    Ok(outcome)
}

/// Detect overloaded staff per department and apply the rebalancer's moves.
///
/// Every move goes through the store's conditional write keyed on the
/// snapshot assignee; a conflict means the task changed underneath us and
/// the move is dropped, never retried blindly.
pub async fn run_bottleneck_sweep(
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    sink: &dyn NotificationSink,
    config: RebalanceConfig,
    now: DateTime<Utc>,
) -> Result<BottleneckSweepOutcome> {
    let departments = directory
        .departments()
        .await
        .context("listing departments")?;

    let mut outcome = BottleneckSweepOutcome::default();
    for department in departments {
        let (staff, active) = match fetch_department(tasks, directory, &department).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%department, error = %err, "bottleneck sweep: fetch failed");
                continue;
            }
        };

        let snapshot = DepartmentSnapshot {
            department: department.clone(),
            staff,
            tasks: active,
        };
        let result = match wardflow_core::rebalance(&snapshot, now, config) {
            Ok(result) => result,
            Err(err) => {
                warn!(%department, error = %err, "bottleneck sweep: rebalance failed");
                continue;
            }
        };
        let still = result.still_overloaded(config.overload_threshold);
        if result.moves.is_empty() && still.is_empty() {
            continue;
        }

        let mut applied_here = 0usize;
        for proposed in result.moves {
            let update = match tasks
                .update_task_assignment(
                    &proposed.task_id,
                    &proposed.to_staff,
                    Some(&proposed.from_staff),
                )
                .await
            {
                Ok(update) => update,
                Err(err) => {
                    warn!(task_id = %proposed.task_id, error = %err, "reassignment write failed");
                    continue;
                }
            };
            if update == AssignmentUpdate::Conflict {
                debug!(task_id = %proposed.task_id, "reassignment skipped: task changed mid-sweep");
                outcome.conflicts += 1;
                continue;
            }

            let notice = NotificationEvent::ReassignmentNotice {
                task_id: proposed.task_id.clone(),
                department: department.clone(),
                from_staff: proposed.from_staff.clone(),
                to_staff: proposed.to_staff.clone(),
                reason: proposed.reason.clone(),
                timestamp: now,
            };
            if let Err(err) = sink.emit(notice).await {
                warn!(task_id = %proposed.task_id, error = %err, "reassignment notice emit failed");
            }

            applied_here += 1;
            outcome.applied.push(proposed);
        }

        let alert = NotificationEvent::BottleneckAlert {
            department: department.clone(),
            reassignment_count: applied_here,
            still_overloaded: still.clone(),
            timestamp: now,
        };
        if let Err(err) = sink.emit(alert).await {
            warn!(%department, error = %err, "bottleneck alert emit failed");
        }
        outcome.still_overloaded.extend(still);
    }

    info!(
        applied = outcome.applied.len(),
        conflicts = outcome.conflicts,
        overloaded = outcome.still_overloaded.len(),
        "bottleneck sweep done"
    );
    Ok(outcome)
}

/// Fire every due recurring schedule: instantiate its template, pick an
/// assignee when none is pinned, record the execution and advance the
/// schedule past `now`.
///
/// A definition whose pending occurrence has slipped past its end date is
/// deactivated without firing.
pub async fn run_recurrence_sweep(
    schedules: &dyn ScheduleStore,
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    advisory: Option<&dyn AdvisorySignal>,
    advisory_timeout: StdDuration,
    now: DateTime<Utc>,
) -> Result<RecurrenceSweepOutcome> {
    let due: Vec<RecurringScheduleDefinition> = schedules
        .get_active_schedules(None)
        .await
        .context("listing schedules")?
        .into_iter()
        .filter(|d| d.is_due(now))
        .collect();

    let mut outcome = RecurrenceSweepOutcome::default();
    for mut def in due {
        let scheduled = match def.next_run {
            Some(scheduled) => scheduled,
            None => continue,
        };

        if past_end_date(&def, scheduled) {
            def.deactivate();
            outcome.deactivated += 1;
            info!(schedule = %def.id, "schedule ran past its end date, deactivated");
            if let Err(err) = schedules.save_schedule(&def).await {
                warn!(schedule = %def.id, error = %err, "schedule save failed");
            }
            continue;
        }

        match fire_schedule(&def, tasks, directory, advisory, advisory_timeout, now).await {
            Ok(task) => {
                info!(schedule = %def.id, task_id = %task.id, "recurring task created");
                def.record_execution(ExecutionRecord {
                    scheduled_time: scheduled,
                    actual_execution_time: now,
                    status: ExecutionStatus::Success,
                    task_id: Some(task.id),
                    error: None,
                });
                outcome.fired += 1;
            }
            Err(err) => {
                warn!(schedule = %def.id, error = %err, "recurring task creation failed");
                def.record_execution(ExecutionRecord {
                    scheduled_time: scheduled,
                    actual_execution_time: now,
                    status: ExecutionStatus::Failed,
                    task_id: None,
                    error: Some(err.to_string()),
                });
                outcome.failed += 1;
            }
        }

        def.last_run = Some(now);
        if let Err(err) = advance(&mut def, now) {
            warn!(schedule = %def.id, error = %err, "schedule advance failed, deactivating");
            def.deactivate();
            outcome.deactivated += 1;
        } else if !def.is_active {
            outcome.deactivated += 1;
        }
        if let Err(err) = schedules.save_schedule(&def).await {
            warn!(schedule = %def.id, error = %err, "schedule save failed");
        }
    }

    info!(
        fired = outcome.fired,
        failed = outcome.failed,
        deactivated = outcome.deactivated,
        "recurrence sweep done"
    );
    Ok(outcome)
}

fn past_end_date(def: &RecurringScheduleDefinition, scheduled: DateTime<Utc>) -> bool {
    def.schedule
        .end_date
        .is_some_and(|end| scheduled.date_naive() > end)
}

async fn fetch_department(
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    department: &str,
) -> Result<(Vec<wardflow_core::StaffMember>, Vec<Task>)> {
    let staff = directory
        .get_eligible_staff(department, None)
        .await
        .with_context(|| format!("fetching staff for {department}"))?;
    let active = tasks
        .get_active_tasks(department)
        .await
        .with_context(|| format!("fetching tasks for {department}"))?;
    Ok((staff, active))
}

async fn fire_schedule(
    def: &RecurringScheduleDefinition,
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    advisory: Option<&dyn AdvisorySignal>,
    advisory_timeout: StdDuration,
    now: DateTime<Utc>,
) -> Result<Task> {
    let overrides = TemplateOverrides {
        department: def.department.clone(),
        assign_to: def.assign_to.clone(),
        due_date: None,
        schedule_id: Some(def.id.clone()),
    };
    let task = tasks
        .create_task_from_template(&def.template_ref, overrides)
        .await
        .with_context(|| format!("instantiating template {}", def.template_ref))?;

    if def.assign_to.is_some() {
        return Ok(task);
    }

    // The task exists from here on; a failure in the assignment path must
    // not report the firing itself as failed. The task just stays
    // unassigned until the next bottleneck pass or an external caller.
    match assign_created_task(&task, tasks, directory, advisory, advisory_timeout, now).await {
        Ok(Some(updated)) => Ok(updated),
        Ok(None) => Ok(task),
        Err(err) => {
            warn!(task_id = %task.id, error = %err, "assignment failed, task left unassigned");
            Ok(task)
        }
    }
}

/// Run the deterministic selector over the department and persist the
/// winner, with the advisory signal as tie-break only. `None` means the
/// task stays unassigned (empty pool, or it was claimed mid-selection).
async fn assign_created_task(
    task: &Task,
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    advisory: Option<&dyn AdvisorySignal>,
    advisory_timeout: StdDuration,
    now: DateTime<Utc>,
) -> Result<Option<Task>> {
    let Some((chosen, details)) =
        choose_assignee(task, tasks, directory, advisory, advisory_timeout, now).await?
    else {
        debug!(task_id = %task.id, "no eligible staff, task left unassigned");
        return Ok(None);
    };

    let update = tasks.update_task_assignment(&task.id, &chosen, None).await?;
    if update == AssignmentUpdate::Conflict {
        debug!(task_id = %task.id, "new task assigned elsewhere before selection landed");
        return Ok(None);
    }
    if let Some(details) = details {
        let entry =
            HistoryEntry::new("advisory_consulted", "scheduler", now).with_details(details);
        tasks.append_history(&task.id, entry).await?;
    }
    tasks
        .get_task(&task.id)
        .await?
        .map(Some)
        .with_context(|| format!("task {} vanished after assignment", task.id))
}

/// Pick the best assignee for a fresh task. Returns the chosen staff id and
/// an optional advisory annotation for the audit trail.
async fn choose_assignee(
    task: &Task,
    tasks: &dyn TaskStore,
    directory: &dyn StaffDirectory,
    advisory: Option<&dyn AdvisorySignal>,
    advisory_timeout: StdDuration,
    now: DateTime<Utc>,
) -> Result<Option<(String, Option<String>)>> {
    let staff = directory
        .get_eligible_staff(&task.department, Some(&task.category))
        .await?;
    if staff.is_empty() {
        return Ok(None);
    }
    let active = tasks.get_active_tasks(&task.department).await?;

    let mut weights = Vec::with_capacity(staff.len());
    for member in &staff {
        let held: Vec<Task> = active
            .iter()
            .filter(|t| t.assigned_to.as_deref() == Some(member.id.as_str()))
            .cloned()
            .collect();
        let score = workload::score(member, &held, now)?;
        weights.push(score.weighted);
    }
    let pool: Vec<CandidateWorkload<'_>> = staff
        .iter()
        .zip(&weights)
        .map(|(member, weighted)| CandidateWorkload { staff: member, weighted: *weighted })
        .collect();

    let ranked = rank_candidates(task, &pool, &Default::default());
    let Some(best) = ranked.first() else {
        return Ok(None);
    };

    let hint = consult_advisory(task, &staff, advisory, advisory_timeout).await;
    let (chosen, details) = resolve_with_hint(&ranked, best, hint);
    Ok(Some((chosen, details)))
}

/// The deterministic ranking wins; a hint may only pick among candidates
/// whose score exactly ties the best, and otherwise just annotates.
fn resolve_with_hint(
    ranked: &[RankedCandidate],
    best: &RankedCandidate,
    hint: Option<AdvisoryHint>,
) -> (String, Option<String>) {
    let Some(hint) = hint else {
        return (best.staff_id.clone(), None);
    };

    let tied = ranked
        .iter()
        .take_while(|c| c.score == best.score)
        .any(|c| c.staff_id == hint.staff_id);
    let chosen = if tied { hint.staff_id.clone() } else { best.staff_id.clone() };
    let details = format!(
        "advisory suggested {} (confidence {:.2}): {}",
        hint.staff_id, hint.confidence, hint.reasoning
    );
    (chosen, Some(details))
}

async fn consult_advisory(
    task: &Task,
    staff: &[wardflow_core::StaffMember],
    advisory: Option<&dyn AdvisorySignal>,
    timeout: StdDuration,
) -> Option<AdvisoryHint> {
    let advisory = advisory?;
    match tokio::time::timeout(timeout, advisory.suggest_assignment(task, staff)).await {
        Ok(Ok(hint)) => hint,
        Ok(Err(err)) => {
            warn!(task_id = %task.id, error = %err, "advisory signal failed, ignoring");
            None
        }
        Err(_) => {
            warn!(task_id = %task.id, "advisory signal timed out, ignoring");
            None
        }
    }
}
