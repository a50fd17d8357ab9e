//! The courier never parses.
//!
//! It moves price-list files into the shared uploads directory, talks to
//! the ETL service over HTTP (health check, trigger, status), assesses
//! poll results against a deadline, and cleans up stale shared files.
//! Parsing, matching, and persistence all live on the other side of the
//! HTTP boundary.

pub mod errors;
pub mod etl_client;
pub mod files;
pub mod poll;

pub use errors::CourierError;
pub use etl_client::{EtlClient, EtlJobStatus, TriggerResponse};
pub use files::UploadsDir;
pub use poll::{PollOutcome, PollPlan, assess};
