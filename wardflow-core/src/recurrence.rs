//! Recurrence calculator: next-run computation for recurring schedule
//! definitions.
//!
//! Each frequency kind gets its own advance policy, dispatched from a tagged
//! variant so the policies stay independently testable. All stepping happens
//! in the definition's local wall-clock; only the final instant is converted
//! to UTC.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::time::{local_to_utc, resolve_zone};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    /// `days_of_week` uses 0 = Sunday .. 6 = Saturday. An empty set behaves
    /// like a plain every-`interval`-weeks schedule.
    Weekly {
        #[serde(default)]
        days_of_week: Vec<u8>,
    },
    Monthly,
    /// Pattern grammar is owned by an external interpreter; the calculator's
    /// fallback is to advance one day at a time.
    Custom { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(flatten)]
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Local wall-clock firing time.
    pub time: NaiveTime,
    /// Every N days/weeks/months; >= 1.
    pub interval: u32,
    /// IANA zone name; UTC when absent.
    pub timezone: Option<String>,
}

impl Schedule {
    pub fn new(frequency: Frequency, start_date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            frequency,
            start_date,
            end_date: None,
            time,
            interval: 1,
            timezone: None,
        }
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timezone(mut self, zone: impl Into<String>) -> Self {
        self.timezone = Some(zone.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

/// One firing attempt in a definition's append-only execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub scheduled_time: DateTime<Utc>,
    pub actual_execution_time: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub task_id: Option<String>,
    pub error: Option<String>,
}

/// A persisted rule that periodically instantiates tasks from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringScheduleDefinition {
    pub id: String,
    pub template_ref: String,
    pub department: String,
    /// Fixed assignee; when absent each instance goes through the selector.
    pub assign_to: Option<String>,
    pub schedule: Schedule,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_history: Vec<ExecutionRecord>,
}

impl RecurringScheduleDefinition {
    pub fn new(
        id: impl Into<String>,
        template_ref: impl Into<String>,
        department: impl Into<String>,
        schedule: Schedule,
    ) -> Self {
        Self {
            id: id.into(),
            template_ref: template_ref.into(),
            department: department.into(),
            assign_to: None,
            schedule,
            is_active: true,
            last_run: None,
            next_run: None,
            execution_history: Vec::new(),
        }
    }

    pub fn with_assignee(mut self, staff_id: impl Into<String>) -> Self {
        self.assign_to = Some(staff_id.into());
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run.is_some_and(|n| n <= now)
    }

    /// Terminal: a deactivated schedule never refires without an explicit
    /// external edit.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.next_run = None;
    }

    pub fn record_execution(&mut self, record: ExecutionRecord) {
        self.execution_history.push(record);
    }
}

fn validate(schedule: &Schedule, id: &str) -> Result<(), InputError> {
    if schedule.interval < 1 {
        return Err(InputError::ZeroInterval { id: id.to_string() });
    }
    if let Frequency::Custom { pattern } = &schedule.frequency {
        if pattern.trim().is_empty() {
            return Err(InputError::MissingCustomPattern { id: id.to_string() });
        }
    }
    Ok(())
}

fn step_days(candidate: NaiveDateTime, target: NaiveDateTime, step: u64, strict: bool) -> NaiveDateTime {
    let reached = |c: NaiveDateTime| if strict { c > target } else { c >= target };
    let mut candidate = candidate;
    // Jump most of the gap in one hop, then settle with single steps.
    let gap = (target.date() - candidate.date()).num_days();
    if gap > 0 {
        let hops = (gap as u64) / step;
        candidate = candidate
            .checked_add_days(Days::new(hops * step))
            .unwrap_or(candidate);
    }
    while !reached(candidate) {
        candidate = candidate
            .checked_add_days(Days::new(step))
            .unwrap_or(candidate);
    }
    candidate
}

fn step_weekdays(
    candidate: NaiveDateTime,
    target: NaiveDateTime,
    days_of_week: &[u8],
    strict: bool,
) -> NaiveDateTime {
    let reached = |c: NaiveDateTime| if strict { c > target } else { c >= target };
    let day_ok = |c: NaiveDateTime| {
        days_of_week.contains(&(c.weekday().num_days_from_sunday() as u8))
    };
    let mut candidate = candidate;
    if candidate.date() < target.date() {
        candidate = target.date().and_time(candidate.time());
    }
    while !(reached(candidate) && day_ok(candidate)) {
        candidate = candidate
            .checked_add_days(Days::new(1))
            .unwrap_or(candidate);
    }
    candidate
}

fn step_months(candidate: NaiveDateTime, target: NaiveDateTime, interval: u32, strict: bool) -> NaiveDateTime {
    let reached = |c: NaiveDateTime| if strict { c > target } else { c >= target };
    let mut candidate = candidate;
    let gap = (target.year() - candidate.year()) * 12 + target.month() as i32
        - candidate.month() as i32;
    if gap > 0 {
        let hops = (gap as u32 / interval) * interval;
        candidate = candidate
            .checked_add_months(Months::new(hops))
            .unwrap_or(candidate);
    }
    while !reached(candidate) {
        candidate = candidate
            .checked_add_months(Months::new(interval))
            .unwrap_or(candidate);
    }
    candidate
}

/// First occurrence at-or-after (`strict = false`) or strictly after
/// (`strict = true`) the local target, in local wall-clock time.
fn next_occurrence(
    schedule: &Schedule,
    target: NaiveDateTime,
    strict: bool,
) -> NaiveDateTime {
    let candidate = schedule.start_date.and_time(schedule.time);
    let reached = if strict { candidate > target } else { candidate >= target };
    if reached {
        // First invocation or future-dated anchor: fire at the anchor.
        return candidate;
    }

    let interval = schedule.interval.max(1);
    match &schedule.frequency {
        Frequency::Daily => step_days(candidate, target, interval as u64, strict),
        Frequency::Weekly { days_of_week } if !days_of_week.is_empty() => {
            step_weekdays(candidate, target, days_of_week, strict)
        }
        Frequency::Weekly { .. } => step_days(candidate, target, 7 * interval as u64, strict),
        Frequency::Monthly => step_months(candidate, target, interval, strict),
        // Documented minimum behavior: custom patterns advance one day.
        Frequency::Custom { .. } => step_days(candidate, target, 1, strict),
    }
}

/// Next firing instant at or after `now`, or None when the schedule has run
/// past its end date. Pure; does not mutate the definition.
pub fn next_run(
    def: &RecurringScheduleDefinition,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, InputError> {
    validate(&def.schedule, &def.id)?;
    let tz = resolve_zone(&def.id, def.schedule.timezone.as_deref())?;
    let now_local = now.with_timezone(&tz).naive_local();
    let candidate = next_occurrence(&def.schedule, now_local, false);
    if def.schedule.end_date.is_some_and(|end| candidate.date() > end) {
        return Ok(None);
    }
    local_to_utc(&def.id, tz, candidate).map(Some)
}

/// Recompute `next_run` to the first occurrence strictly after `now`,
/// deactivating the definition once that occurrence would pass the end
/// date. Idempotent for a fixed `now`: the result depends only on the
/// schedule and `now`, never on the stored `next_run`.
pub fn advance(
    def: &mut RecurringScheduleDefinition,
    now: DateTime<Utc>,
) -> Result<(), InputError> {
    if !def.is_active {
        return Ok(());
    }
    validate(&def.schedule, &def.id)?;
    let tz = resolve_zone(&def.id, def.schedule.timezone.as_deref())?;
    let now_local = now.with_timezone(&tz).naive_local();
    let candidate = next_occurrence(&def.schedule, now_local, true);
    if def.schedule.end_date.is_some_and(|end| candidate.date() > end) {
        def.deactivate();
        return Ok(());
    }
    def.next_run = Some(local_to_utc(&def.id, tz, candidate)?);
    Ok(())
}
