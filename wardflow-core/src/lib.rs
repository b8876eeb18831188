//! wardflow-core: pure scoring, selection, rebalancing and recurrence
//! primitives for the Wardflow task assignment engine.
//!
//! Everything here is deterministic and I/O-free; the async orchestration
//! layer lives in `wardflow-engine`.

pub mod assignment;
pub mod error;
pub mod events;
pub mod rebalance;
pub mod recurrence;
pub mod staff;
pub mod task;
pub mod time;
pub mod workload;

pub use assignment::{CandidateWorkload, RankedCandidate, rank_candidates, select_best};
pub use error::InputError;
pub use events::NotificationEvent;
pub use rebalance::{
    DepartmentSnapshot, Reassignment, RebalanceConfig, RebalanceOutcome, rebalance,
};
pub use recurrence::{
    ExecutionRecord, ExecutionStatus, Frequency, RecurringScheduleDefinition, Schedule, advance,
    next_run,
};
pub use staff::{PerformanceSummary, StaffMember};
pub use task::{HistoryEntry, Priority, Task, TaskStatus, TaskTemplate, Urgency};
pub use workload::{WorkloadMetrics, WorkloadScore};
