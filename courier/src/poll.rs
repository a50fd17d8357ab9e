//! Polling as an explicit state machine.
//!
//! Each tick assesses one freshly fetched status against the deadline
//! and returns what to do next; the scheduling (re-enqueue with delay)
//! belongs to the queue layer, not a recursive await loop.

use std::time::Duration;

use crate::etl_client::EtlJobStatus;

/// Poll cadence and give-up deadline.
#[derive(Debug, Clone, Copy)]
pub struct PollPlan {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for PollPlan {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            deadline: Duration::from_secs(30 * 60),
        }
    }
}

impl PollPlan {
    /// Reads `ML_POLL_INTERVAL_SECONDS` (default 10); the deadline stays
    /// at 30 minutes.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let interval = std::env::var("ML_POLL_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);
        Self {
            interval,
            ..defaults
        }
    }
}

/// What one poll tick decided.
#[derive(Debug)]
pub enum PollOutcome {
    /// Still running; poll again after the plan's interval.
    Continue(EtlJobStatus),
    /// Terminal state reached (success or downstream failure).
    Done(EtlJobStatus),
    /// The deadline elapsed without a terminal state.
    DeadlineExceeded,
}

/// Pure assessment of one status snapshot.
pub fn assess(status: EtlJobStatus, elapsed: Duration, plan: &PollPlan) -> PollOutcome {
    if status.is_terminal() {
        return PollOutcome::Done(status);
    }
    if elapsed >= plan.deadline {
        return PollOutcome::DeadlineExceeded;
    }
    PollOutcome::Continue(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status(code: &str) -> EtlJobStatus {
        EtlJobStatus {
            job_id: Uuid::new_v4(),
            status: code.into(),
            phase: None,
            progress_percentage: 50,
            items_processed: 5,
            items_total: 10,
            errors: vec![],
            created_at: None,
            started_at: None,
            completed_at: None,
            metrics: None,
        }
    }

    #[test]
    fn running_status_continues() {
        let outcome = assess(status("processing"), Duration::from_secs(60), &PollPlan::default());
        assert!(matches!(outcome, PollOutcome::Continue(_)));
    }

    #[test]
    fn terminal_statuses_finish() {
        for code in ["completed", "failed", "completed_with_errors"] {
            let outcome = assess(status(code), Duration::from_secs(60), &PollPlan::default());
            assert!(matches!(outcome, PollOutcome::Done(_)), "status {code}");
        }
    }

    #[test]
    fn deadline_wins_over_continue() {
        let plan = PollPlan::default();
        let outcome = assess(status("processing"), plan.deadline, &plan);
        assert!(matches!(outcome, PollOutcome::DeadlineExceeded));
    }

    #[test]
    fn terminal_wins_even_past_the_deadline() {
        let plan = PollPlan::default();
        let outcome = assess(status("completed"), plan.deadline * 2, &plan);
        assert!(matches!(outcome, PollOutcome::Done(_)));
    }
}
