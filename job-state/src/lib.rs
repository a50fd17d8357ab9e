//! Durable job status and cluster-wide sync coordination, both on Redis.
//!
//! - [`registry::JobRegistry`] — per-job status records under
//!   `ml-analyze:job:{uuid}` with a 7-day TTL and monotonic progress.
//! - [`sync::SyncCoordinator`] — the single cross-worker lock (`sync:lock`,
//!   SET-NX with TTL, owner-guarded release) plus the `sync:status` state
//!   machine polled by the UI.
//!
//! Everything else in the system coordinates through idempotent database
//! upserts; these keys are the only mutable shared state.

pub mod connection;
pub mod errors;
pub mod job;
pub mod registry;
pub mod sync;

pub use connection::connect_from_env;
pub use errors::StateError;
pub use job::{Job, JobKind, JobPhase, JobStatus, ParsingMetrics};
pub use registry::JobRegistry;
pub use sync::{SyncCoordinator, SyncState, SyncStatus};
