//! Scheduler orchestrator: owns the periodic sweep loops.
//!
//! Three independently timed loops (deadline, bottleneck, recurrence) run
//! over shared store handles. Each sweep is awaited inside its own loop, so
//! two sweeps of the same kind never overlap; sweeps of different kinds may
//! interleave freely because every pass re-reads store state and all
//! assignment writes are conditional.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{Duration, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use wardflow_core::RebalanceConfig;

use crate::stores::{AdvisorySignal, NotificationSink, ScheduleStore, StaffDirectory, TaskStore};
use crate::sweeps::{
    BottleneckSweepOutcome, DeadlineSweepOutcome, RecurrenceSweepOutcome, run_bottleneck_sweep,
    run_deadline_sweep, run_recurrence_sweep,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    pub deadline_interval: StdDuration,
    pub bottleneck_interval: StdDuration,
    pub recurrence_interval: StdDuration,
    /// Tasks due within this many hours get a reminder.
    pub reminder_window_hours: i64,
    pub rebalance: RebalanceConfig,
    /// Hard cap on one advisory consultation.
    pub advisory_timeout: StdDuration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            deadline_interval: StdDuration::from_secs(15 * 60),
            bottleneck_interval: StdDuration::from_secs(60 * 60),
            recurrence_interval: StdDuration::from_secs(60),
            reminder_window_hours: 24,
            rebalance: RebalanceConfig::default(),
            advisory_timeout: StdDuration::from_secs(2),
        }
    }
}

/// Combined result of one full pass, mostly for the CLI's one-shot mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassOutcome {
    pub deadline: DeadlineSweepOutcome,
    pub bottleneck: BottleneckSweepOutcome,
    pub recurrence: RecurrenceSweepOutcome,
}

pub struct SchedulerOrchestrator {
    tasks: Arc<dyn TaskStore>,
    directory: Arc<dyn StaffDirectory>,
    schedules: Arc<dyn ScheduleStore>,
    sink: Arc<dyn NotificationSink>,
    advisory: Option<Arc<dyn AdvisorySignal>>,
    config: OrchestratorConfig,
}

impl SchedulerOrchestrator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        directory: Arc<dyn StaffDirectory>,
        schedules: Arc<dyn ScheduleStore>,
        sink: Arc<dyn NotificationSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            tasks,
            directory,
            schedules,
            sink,
            advisory: None,
            config,
        }
    }

    pub fn with_advisory(mut self, advisory: Arc<dyn AdvisorySignal>) -> Self {
        self.advisory = Some(advisory);
        self
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.config
    }

    /// Run every sweep once against the current clock. Recurrence goes
    /// first so freshly created tasks are visible to the other two.
    pub async fn run_once(&self) -> Result<PassOutcome> {
        let now = Utc::now();
        let recurrence = run_recurrence_sweep(
            self.schedules.as_ref(),
            self.tasks.as_ref(),
            self.directory.as_ref(),
            self.advisory.as_deref(),
            self.config.advisory_timeout,
            now,
        )
        .await?;
        let bottleneck = run_bottleneck_sweep(
            self.tasks.as_ref(),
            self.directory.as_ref(),
            self.sink.as_ref(),
            self.config.rebalance,
            now,
        )
        .await?;
        let deadline = run_deadline_sweep(
            self.tasks.as_ref(),
            self.directory.as_ref(),
            self.sink.as_ref(),
            Duration::hours(self.config.reminder_window_hours),
            now,
        )
        .await?;
        Ok(PassOutcome {
            deadline,
            bottleneck,
            recurrence,
        })
    }

    /// Run the three loops until `shutdown` flips to true. Consumes the
    /// orchestrator; per-sweep failures are logged, not fatal.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            deadline_secs = self.config.deadline_interval.as_secs(),
            bottleneck_secs = self.config.bottleneck_interval.as_secs(),
            recurrence_secs = self.config.recurrence_interval.as_secs(),
            "orchestrator starting"
        );

        let deadline = {
            let tasks = Arc::clone(&self.tasks);
            let directory = Arc::clone(&self.directory);
            let sink = Arc::clone(&self.sink);
            let window = Duration::hours(self.config.reminder_window_hours);
            let period = self.config.deadline_interval;
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let result = run_deadline_sweep(
                                tasks.as_ref(),
                                directory.as_ref(),
                                sink.as_ref(),
                                window,
                                Utc::now(),
                            )
                            .await;
                            if let Err(err) = result {
                                warn!(error = %err, "deadline sweep failed");
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        let bottleneck = {
            let tasks = Arc::clone(&self.tasks);
            let directory = Arc::clone(&self.directory);
            let sink = Arc::clone(&self.sink);
            let rebalance = self.config.rebalance;
            let period = self.config.bottleneck_interval;
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let result = run_bottleneck_sweep(
                                tasks.as_ref(),
                                directory.as_ref(),
                                sink.as_ref(),
                                rebalance,
                                Utc::now(),
                            )
                            .await;
                            if let Err(err) = result {
                                warn!(error = %err, "bottleneck sweep failed");
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        let recurrence = {
            let schedules = Arc::clone(&self.schedules);
            let tasks = Arc::clone(&self.tasks);
            let directory = Arc::clone(&self.directory);
            let advisory = self.advisory.clone();
            let timeout = self.config.advisory_timeout;
            let period = self.config.recurrence_interval;
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let result = run_recurrence_sweep(
                                schedules.as_ref(),
                                tasks.as_ref(),
                                directory.as_ref(),
                                advisory.as_deref(),
                                timeout,
                                Utc::now(),
                            )
                            .await;
                            if let Err(err) = result {
                                warn!(error = %err, "recurrence sweep failed");
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            })
        };

        let (a, b, c) = tokio::join!(deadline, bottleneck, recurrence);
        a?;
        b?;
        c?;
        info!("orchestrator stopped");
        Ok(())
    }
}

/// Interval that fires immediately and drops missed ticks instead of
/// bursting to catch up after a long sweep.
fn interval(period: StdDuration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryScheduleStore, MemoryStaffDirectory, MemoryTaskStore, RecordingSink};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use wardflow_core::{
        Frequency, Priority, RecurringScheduleDefinition, Schedule, StaffMember, TaskTemplate,
        Urgency,
    };

    struct Fixture {
        tasks: Arc<MemoryTaskStore>,
        directory: Arc<MemoryStaffDirectory>,
        schedules: Arc<MemoryScheduleStore>,
        sink: Arc<RecordingSink>,
    }

    impl Fixture {
        fn orchestrator(&self, config: OrchestratorConfig) -> SchedulerOrchestrator {
            SchedulerOrchestrator::new(
                Arc::clone(&self.tasks) as Arc<dyn crate::stores::TaskStore>,
                Arc::clone(&self.directory) as Arc<dyn crate::stores::StaffDirectory>,
                Arc::clone(&self.schedules) as Arc<dyn crate::stores::ScheduleStore>,
                Arc::clone(&self.sink) as Arc<dyn crate::stores::NotificationSink>,
                config,
            )
        }
    }

    async fn fixture() -> Fixture {
        let fixture = Fixture {
            tasks: Arc::new(MemoryTaskStore::new()),
            directory: Arc::new(MemoryStaffDirectory::new()),
            schedules: Arc::new(MemoryScheduleStore::new()),
            sink: Arc::new(RecordingSink::new()),
        };
        fixture
            .directory
            .insert_staff(StaffMember::new("a", "icu").with_roles(vec!["nurse".to_string()]))
            .await;
        fixture
            .directory
            .insert_staff(StaffMember::new("b", "icu").with_roles(vec!["nurse".to_string()]))
            .await;
        fixture
            .tasks
            .register_template(
                "rounds",
                TaskTemplate {
                    title: "morning rounds".to_string(),
                    priority: Priority::Medium,
                    urgency: Urgency::Routine,
                    category: "assessment".to_string(),
                    estimated_duration_minutes: 30,
                    due_in_hours: Some(1),
                    specialty_tags: Vec::new(),
                },
            )
            .await;
        fixture
    }

    fn due_schedule(id: &str) -> RecurringScheduleDefinition {
        let schedule = Schedule::new(
            Frequency::Daily,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        );
        let mut def = RecurringScheduleDefinition::new(id, "rounds", "icu", schedule);
        def.next_run = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        def
    }

    #[tokio::test]
    async fn run_once_chains_recurrence_into_the_other_sweeps() {
        let fixture = fixture().await;
        fixture.schedules.insert_schedule(due_schedule("s1")).await;

        let outcome = fixture
            .orchestrator(OrchestratorConfig::default())
            .run_once()
            .await
            .unwrap();

        assert_eq!(outcome.recurrence.fired, 1);
        // The task created this pass is due within the window, so the
        // deadline sweep in the same pass already reminds about it.
        assert_eq!(outcome.deadline.reminders_sent, 1);
        assert!(outcome.bottleneck.applied.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loops_tick_and_stop_on_shutdown() {
        let fixture = fixture().await;
        fixture.schedules.insert_schedule(due_schedule("s1")).await;

        let config = OrchestratorConfig {
            deadline_interval: StdDuration::from_secs(1),
            bottleneck_interval: StdDuration::from_secs(1),
            recurrence_interval: StdDuration::from_secs(1),
            ..OrchestratorConfig::default()
        };
        let orchestrator = fixture.orchestrator(config);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(orchestrator.run(rx));

        // First ticks fire immediately; give the loops a few rounds.
        tokio::time::sleep(StdDuration::from_secs(3)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(StdDuration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // One task from the first recurrence tick, then daily cadence keeps
        // the later ticks quiet.
        assert_eq!(fixture.tasks.all_tasks().await.len(), 1);
        assert!(!fixture.sink.events().await.is_empty());
    }
}
