//! Verification session state machine.
//!
//! # States
//! - Idle: created, nothing scheduled yet
//! - Polling: the only state that issues queries and schedules work
//! - Resolved: the explorer gave a definitive answer (terminal)
//! - TimedOut: the query budget ran out (terminal)
//! - Cancelled: the host gave up on the session (halted, no callback)
//!
//! # State Transitions
//! ```text
//! Idle → Polling: Start (first query after the settle delay)
//! Idle → Resolved(Failed): Rejected (unsupported network)
//! Polling → Polling: transient error or unresolved record, budget left
//! Polling → Resolved(*): succeeded or failed record
//! Polling → TimedOut: attempts or time budget exhausted while unresolved
//! Idle | Polling → Cancelled: cancel()
//! ```
//!
//! The next action is derived from the current state alone; the driver never
//! consults anything captured before the transition.

use serde::Serialize;
use std::time::Duration;

use crate::blockchain::types::{
    ExplorerResult, Outcome, TransactionQuery, TransactionStatusRecord, VerificationFailure,
};
use crate::verification::policy::PollingPolicy;

/// Definitive outcome of a resolved session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Succeeded,
    Failed,
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Polling,
    Resolved(Resolution),
    TimedOut,
    Cancelled,
}

impl SessionState {
    /// Resolved or timed out.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Resolved(_) | SessionState::TimedOut)
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, SessionState::Cancelled)
    }

    /// No further queries or callbacks will happen.
    pub fn is_halted(self) -> bool {
        self.is_terminal() || self.is_cancelled()
    }

    /// Coarse status shown to users.
    pub fn phase(self) -> &'static str {
        match self {
            SessionState::Idle | SessionState::Polling => "verifying",
            SessionState::Resolved(Resolution::Succeeded) => "confirmed",
            SessionState::Resolved(Resolution::Failed) => "failed",
            SessionState::TimedOut => "timed_out",
            SessionState::Cancelled => "cancelled",
        }
    }
}

/// Inputs that drive a session forward.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session was started on a supported network.
    Start,
    /// The session cannot run at all.
    Rejected(VerificationFailure),
    /// A query attempt finished.
    AttemptFinished(ExplorerResult<TransactionStatusRecord>),
    /// The session's time budget ran out before it resolved.
    DeadlineReached,
}

/// What the driver must do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Issue the next query after waiting.
    Query { after: Duration },
    /// Deliver exactly one completion callback and stop.
    Complete(Completion),
    /// Nothing more to do.
    Halt,
}

/// The one callback a session delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded(TransactionStatusRecord),
    Failed(TransactionStatusRecord),
}

/// State owned by one tracker session.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    query: TransactionQuery,
    attempts_made: u32,
    last_status: TransactionStatusRecord,
    state: SessionState,
}

impl VerificationSession {
    pub fn new(query: TransactionQuery) -> Self {
        Self {
            query,
            attempts_made: 0,
            last_status: TransactionStatusRecord::unresolved(),
            state: SessionState::Idle,
        }
    }

    pub fn query(&self) -> &TransactionQuery {
        &self.query
    }

    /// Number of query attempts that have completed.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn last_status(&self) -> &TransactionStatusRecord {
        &self.last_status
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply one event and return the next step.
    ///
    /// Events arriving after the session halted are discarded.
    pub fn advance(&mut self, event: SessionEvent, policy: &PollingPolicy) -> Step {
        if self.state.is_halted() {
            return Step::Halt;
        }

        match (self.state, event) {
            (SessionState::Idle, SessionEvent::Start) => {
                self.state = SessionState::Polling;
                Step::Query {
                    after: policy.settle_delay,
                }
            }
            (SessionState::Idle, SessionEvent::Rejected(failure)) => {
                self.resolve(failure.into_record())
            }
            (SessionState::Polling, SessionEvent::AttemptFinished(result)) => {
                self.attempts_made = self.attempts_made.saturating_add(1);
                match result {
                    Ok(record) if record.outcome.is_resolved() => self.resolve(record),
                    Ok(record) => {
                        self.last_status = record;
                        self.continue_or_time_out(policy)
                    }
                    // Transient errors leave last_status untouched.
                    Err(_) => self.continue_or_time_out(policy),
                }
            }
            (SessionState::Polling, SessionEvent::DeadlineReached) => self.time_out(),
            (state, event) => {
                tracing::warn!(?state, ?event, "Ignoring out-of-order session event");
                Step::Halt
            }
        }
    }

    /// Halt the session without a callback. Returns false if it had already halted.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_halted() {
            return false;
        }
        self.state = SessionState::Cancelled;
        true
    }

    fn resolve(&mut self, record: TransactionStatusRecord) -> Step {
        self.last_status = record.clone();
        if record.outcome == Outcome::Succeeded {
            self.state = SessionState::Resolved(Resolution::Succeeded);
            Step::Complete(Completion::Succeeded(record))
        } else {
            self.state = SessionState::Resolved(Resolution::Failed);
            Step::Complete(Completion::Failed(record))
        }
    }

    fn continue_or_time_out(&mut self, policy: &PollingPolicy) -> Step {
        if self.attempts_made < policy.max_attempts {
            return Step::Query {
                after: policy.poll_interval,
            };
        }
        self.time_out()
    }

    fn time_out(&mut self) -> Step {
        let record = VerificationFailure::Timeout(self.attempts_made).into_record();
        self.last_status = record.clone();
        self.state = SessionState::TimedOut;
        Step::Complete(Completion::Failed(record))
    }
}
