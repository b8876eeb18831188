//! wardflow-engine: async orchestration around the wardflow-core
//! primitives.
//!
//! The boundary contracts in `stores` are the integration surface; the
//! sweeps and the orchestrator only ever talk to those traits. In-memory
//! implementations back the tests and the demo CLI.

pub mod advisory;
pub mod memory;
pub mod orchestrator;
pub mod stores;
pub mod sweeps;

pub use advisory::{AdvisoryConfig, HttpAdvisory};
pub use orchestrator::{OrchestratorConfig, PassOutcome, SchedulerOrchestrator};
pub use stores::{
    AdvisoryHint, AdvisorySignal, AssignmentUpdate, NotificationSink, ScheduleStore,
    StaffDirectory, TaskStore, TemplateOverrides,
};
pub use sweeps::{
    BottleneckSweepOutcome, DeadlineSweepOutcome, RecurrenceSweepOutcome, run_bottleneck_sweep,
    run_deadline_sweep, run_recurrence_sweep,
};
