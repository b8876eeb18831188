use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wardflow_core::{NotificationEvent, Task, workload};
use wardflow_engine::{
    HttpAdvisory, SchedulerOrchestrator, StaffDirectory, run_bottleneck_sweep,
    run_deadline_sweep, run_recurrence_sweep,
};

mod config;
mod demo;

#[derive(Parser, Debug)]
#[command(name = "wardflow", version, about = "Workload-aware task scheduler")]
struct Cli {
    /// Path to wardflow.toml (defaults used when the file is absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the orchestrator loops against the seeded demo department until
    /// Ctrl-C
    Run,

    /// Run one sweep (or all of them) once and print what happened
    Sweep {
        #[arg(long, value_enum, default_value_t = SweepKind::All)]
        kind: SweepKind,
    },

    /// Print per-staff workload scores for the demo department
    Report,

    /// Write a default wardflow.toml
    InitConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SweepKind {
    All,
    Deadline,
    Bottleneck,
    Recurrence,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    match cli.command {
        Command::InitConfig => {
            config::init_config(&config_path)?;
        }

        Command::Run => {
            let cfg = config::load_config(&config_path)?;
            let department = demo::seed().await;
            let mut orchestrator = SchedulerOrchestrator::new(
                department.tasks.clone(),
                department.directory.clone(),
                department.schedules.clone(),
                department.sink.clone(),
                cfg.orchestrator_config(),
            );
            if let Some(advisory) = cfg.advisory_config() {
                orchestrator = orchestrator.with_advisory(Arc::new(HttpAdvisory::new(advisory)));
            }

            let (tx, rx) = watch::channel(false);
            let handle = tokio::spawn(orchestrator.run(rx));
            tokio::signal::ctrl_c().await?;
            info!("shutting down");
            let _ = tx.send(true);
            handle.await??;
        }

        Command::Sweep { kind } => {
            let cfg = config::load_config(&config_path)?;
            let department = demo::seed().await;
            let orchestrator_cfg = cfg.orchestrator_config();
            let now = Utc::now();

            match kind {
                SweepKind::All => {
                    let mut orchestrator = SchedulerOrchestrator::new(
                        department.tasks.clone(),
                        department.directory.clone(),
                        department.schedules.clone(),
                        department.sink.clone(),
                        orchestrator_cfg,
                    );
                    if let Some(advisory) = cfg.advisory_config() {
                        orchestrator =
                            orchestrator.with_advisory(Arc::new(HttpAdvisory::new(advisory)));
                    }
                    let outcome = orchestrator.run_once().await?;
                    println!(
                        "recurrence: fired={} failed={} deactivated={}",
                        outcome.recurrence.fired,
                        outcome.recurrence.failed,
                        outcome.recurrence.deactivated
                    );
                    println!(
                        "bottleneck: applied={} conflicts={} still_overloaded={}",
                        outcome.bottleneck.applied.len(),
                        outcome.bottleneck.conflicts,
                        outcome.bottleneck.still_overloaded.len()
                    );
                    println!("deadline: reminders={}", outcome.deadline.reminders_sent);
                }
                SweepKind::Deadline => {
                    let outcome = run_deadline_sweep(
                        department.tasks.as_ref(),
                        department.directory.as_ref(),
                        department.sink.as_ref(),
                        chrono::Duration::hours(orchestrator_cfg.reminder_window_hours),
                        now,
                    )
                    .await?;
                    println!("reminders sent: {}", outcome.reminders_sent);
                }
                SweepKind::Bottleneck => {
                    let outcome = run_bottleneck_sweep(
                        department.tasks.as_ref(),
                        department.directory.as_ref(),
                        department.sink.as_ref(),
                        orchestrator_cfg.rebalance,
                        now,
                    )
                    .await?;
                    for applied in &outcome.applied {
                        println!(
                            "moved {} from {} to {} (delta {:.1})",
                            applied.task_id,
                            applied.from_staff,
                            applied.to_staff,
                            applied.workload_delta
                        );
                    }
                    println!(
                        "applied={} conflicts={} still_overloaded={:?}",
                        outcome.applied.len(),
                        outcome.conflicts,
                        outcome.still_overloaded
                    );
                }
                SweepKind::Recurrence => {
                    let outcome = run_recurrence_sweep(
                        department.schedules.as_ref(),
                        department.tasks.as_ref(),
                        department.directory.as_ref(),
                        None,
                        orchestrator_cfg.advisory_timeout,
                        now,
                    )
                    .await?;
                    println!(
                        "fired={} failed={} deactivated={}",
                        outcome.fired, outcome.failed, outcome.deactivated
                    );
                }
            }

            for event in department.sink.drain().await {
                print_event(&event);
            }
        }

        Command::Report => {
            let department = demo::seed().await;
            let now = Utc::now();
            for dept in department.directory.departments().await? {
                println!("department: {dept}");
                let staff = department.directory.get_eligible_staff(&dept, None).await?;
                let all: Vec<Task> = department.tasks.all_tasks().await;
                for member in staff {
                    let held: Vec<Task> = all
                        .iter()
                        .filter(|t| {
                            t.department == dept
                                && t.assigned_to.as_deref() == Some(member.id.as_str())
                        })
                        .cloned()
                        .collect();
                    let score = workload::score(&member, &held, now)?;
                    println!(
                        "  {:<14} raw={:>6.1} weighted={:>6.1} active={} overdue={} perf={:.2}",
                        member.id,
                        score.raw,
                        score.weighted,
                        score.metrics.active_task_count,
                        score.metrics.overdue_task_count,
                        member.performance_score()
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_event(event: &NotificationEvent) {
    match event {
        NotificationEvent::DeadlineReminder { task_id, title, assigned_to, due_date, .. } => {
            println!(
                "[reminder] {task_id} \"{title}\" due {due_date} (assignee: {})",
                assigned_to.as_deref().unwrap_or("unassigned")
            );
        }
        NotificationEvent::BottleneckAlert {
            department,
            reassignment_count,
            still_overloaded,
            ..
        } => {
            println!(
                "[bottleneck] {department}: {reassignment_count} reassignment(s), still overloaded: {still_overloaded:?}"
            );
        }
        NotificationEvent::ReassignmentNotice { task_id, from_staff, to_staff, reason, .. } => {
            println!("[reassigned] {task_id}: {from_staff} -> {to_staff} ({reason})");
        }
    }
}
