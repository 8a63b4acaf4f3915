//! Confirmation tracker.
//!
//! # Responsibilities
//! - Resolve the network's explorer endpoint before any polling
//! - Run one sequential poll loop per session (at most one query in flight)
//! - Deliver exactly one completion callback per non-cancelled session
//! - Honor cancellation before the next scheduled action
//! - Cap the session's total time at settle delay plus the time budget
//!
//! # Design Decisions
//! - Every transition goes through `VerificationSession::advance`, applied
//!   atomically inside a `watch` channel. The same channel is the hosts'
//!   observation stream and the cancellation signal.
//! - The terminal transition is the linearization point: whichever of
//!   cancel / resolve reaches the session first wins, the other is a no-op.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::blockchain::client::TransactionStatusSource;
use crate::blockchain::registry::EndpointRegistry;
use crate::blockchain::types::{
    ExplorerError, ExplorerResult, Outcome, TransactionQuery, TransactionStatusRecord,
};
use crate::observability::metrics;
use crate::verification::policy::PollingPolicy;
use crate::verification::session::{Completion, SessionEvent, Step, VerificationSession};

type Callback = Box<dyn FnOnce(TransactionStatusRecord) + Send + 'static>;

/// The pair of one-shot completion callbacks of a session.
struct Callbacks {
    on_success: Callback,
    on_failure: Callback,
}

impl Callbacks {
    /// Consumes both callbacks; only one of them runs.
    fn deliver(self, completion: Completion) {
        match completion {
            Completion::Succeeded(record) => (self.on_success)(record),
            Completion::Failed(record) => (self.on_failure)(record),
        }
    }
}

/// Host-side handle to a running verification session.
///
/// Cloning the handle does not clone the session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    session: Arc<watch::Sender<VerificationSession>>,
    explorer_link: Option<Url>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Explorer page of the transaction, fixed when the session started.
    ///
    /// `None` for sessions rejected before polling.
    pub fn explorer_link(&self) -> Option<&Url> {
        self.explorer_link.as_ref()
    }

    /// Current state of the session.
    pub fn snapshot(&self) -> VerificationSession {
        self.session.borrow().clone()
    }

    /// Stream of session states, in transition order.
    pub fn subscribe(&self) -> watch::Receiver<VerificationSession> {
        self.session.subscribe()
    }

    /// Stop the session without invoking either callback.
    ///
    /// Idempotent; returns true only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.session.send_if_modified(VerificationSession::cancel);
        if cancelled {
            tracing::info!(session = %self.id, "Verification session cancelled");
        }
        cancelled
    }

    /// Wait until the session is resolved, timed out or cancelled.
    pub async fn wait(&self) -> VerificationSession {
        let mut rx = self.subscribe();
        let halted = rx
            .wait_for(|session| session.state().is_halted())
            .await
            .map(|session| VerificationSession::clone(&session));
        match halted {
            Ok(session) => session,
            Err(_) => self.snapshot(),
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.borrow();
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("tx", &session.query().transaction_id)
            .field("state", &session.state())
            .finish()
    }
}

/// Starts and cancels verification sessions.
pub struct ConfirmationTracker<S> {
    registry: Arc<EndpointRegistry>,
    source: Arc<S>,
    policy: PollingPolicy,
}

impl<S> Clone for ConfirmationTracker<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            source: self.source.clone(),
            policy: self.policy,
        }
    }
}

impl<S: TransactionStatusSource> ConfirmationTracker<S> {
    pub fn new(registry: Arc<EndpointRegistry>, source: Arc<S>, policy: PollingPolicy) -> Self {
        Self {
            registry,
            source,
            policy,
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// The global polling policy, before per-network overrides.
    pub fn policy(&self) -> &PollingPolicy {
        &self.policy
    }

    /// Start verifying a transaction.
    ///
    /// On an unsupported network `on_failure` runs before this returns and no
    /// query is ever issued. Otherwise polling runs on a spawned task, so this
    /// must be called from within a Tokio runtime.
    pub fn start<F, G>(
        &self,
        transaction_id: impl Into<String>,
        network: impl Into<String>,
        on_success: F,
        on_failure: G,
    ) -> SessionHandle
    where
        F: FnOnce(TransactionStatusRecord) + Send + 'static,
        G: FnOnce(TransactionStatusRecord) + Send + 'static,
    {
        let query = TransactionQuery::new(transaction_id, network);
        let id = Uuid::new_v4();
        let callbacks = Callbacks {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        };

        let endpoint = match self.registry.resolve(&query.network) {
            Ok(endpoint) => endpoint,
            Err(failure) => {
                tracing::warn!(
                    session = %id,
                    network = %query.network,
                    tx = %query.transaction_id,
                    "Rejecting verification for unsupported network"
                );
                metrics::record_session_finished(&query.network, "unsupported");

                let session = Arc::new(watch::Sender::new(VerificationSession::new(query)));
                if let Step::Complete(completion) =
                    apply(&session, SessionEvent::Rejected(failure), &self.policy)
                {
                    callbacks.deliver(completion);
                }
                return SessionHandle {
                    id,
                    session,
                    explorer_link: None,
                };
            }
        };

        let policy = self.policy.with_overrides(endpoint.polling());
        let base_url = endpoint.base_url().clone();
        let explorer_link = endpoint.transaction_link(&query.transaction_id);

        tracing::info!(
            session = %id,
            network = %query.network,
            tx = %query.transaction_id,
            max_attempts = policy.max_attempts,
            "Starting transaction verification"
        );
        metrics::record_session_started(&query.network);

        let span = tracing::info_span!("verification", session = %id, network = %query.network);
        let session = Arc::new(watch::Sender::new(VerificationSession::new(query)));

        tokio::spawn(
            drive(
                self.source.clone(),
                base_url,
                session.clone(),
                policy,
                callbacks,
            )
            .instrument(span),
        );

        SessionHandle {
            id,
            session,
            explorer_link,
        }
    }

    /// Cancel a session. Same as `SessionHandle::cancel`.
    pub fn cancel(&self, handle: &SessionHandle) {
        handle.cancel();
    }
}

/// Apply one event under the channel lock and return the resulting step.
fn apply(
    session: &watch::Sender<VerificationSession>,
    event: SessionEvent,
    policy: &PollingPolicy,
) -> Step {
    let mut step = Step::Halt;
    session.send_if_modified(|state| {
        step = state.advance(event, policy);
        step != Step::Halt
    });
    step
}

/// Resolves once the session has been cancelled.
async fn cancelled(rx: &mut watch::Receiver<VerificationSession>) {
    let _ = rx.wait_for(|session| session.state().is_cancelled()).await;
}

/// The poll loop of one session.
///
/// Sleeps and queries are cut short at the session deadline, so slow
/// explorers cannot stretch the session past its time budget.
async fn drive<S: TransactionStatusSource>(
    source: Arc<S>,
    endpoint: Url,
    session: Arc<watch::Sender<VerificationSession>>,
    policy: PollingPolicy,
    callbacks: Callbacks,
) {
    metrics::record_active_session(1.0);
    let mut cancel_rx = session.subscribe();
    let query = session.borrow().query().clone();
    let deadline = Instant::now() + policy.settle_delay + policy.timeout;

    let mut step = apply(&session, SessionEvent::Start, &policy);
    loop {
        match step {
            Step::Query { after } => {
                let wake = (Instant::now() + after).min(deadline);
                tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel_rx) => break,
                    _ = tokio::time::sleep_until(wake) => {}
                }
                if Instant::now() >= deadline {
                    step = apply(&session, SessionEvent::DeadlineReached, &policy);
                    continue;
                }

                let started = std::time::Instant::now();
                let attempt_deadline = (Instant::now() + policy.attempt_timeout).min(deadline);
                let attempt = tokio::time::timeout_at(
                    attempt_deadline,
                    source.query(&endpoint, &query.transaction_id),
                );
                let outcome = tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel_rx) => break,
                    res = attempt => match res {
                        Ok(result) => Some(result),
                        Err(_) if attempt_deadline >= deadline => None,
                        Err(_) => Some(Err(ExplorerError::Timeout(
                            policy.attempt_timeout.as_millis() as u64,
                        ))),
                    },
                };

                let Some(result) = outcome else {
                    tracing::warn!("Time budget ran out with a query in flight");
                    metrics::record_query(&query.network, "deadline", started);
                    step = apply(&session, SessionEvent::DeadlineReached, &policy);
                    continue;
                };

                metrics::record_query(&query.network, result_label(&result), started);
                match &result {
                    Ok(record) => {
                        tracing::debug!(outcome = ?record.outcome, "Status query answered")
                    }
                    Err(e) => tracing::warn!(error = %e, "Status query failed, will retry"),
                }

                step = apply(&session, SessionEvent::AttemptFinished(result), &policy);
            }
            Step::Complete(completion) => {
                let snapshot = session.borrow().clone();
                tracing::info!(
                    attempts = snapshot.attempts_made(),
                    state = ?snapshot.state(),
                    block_number = ?snapshot.last_status().block_number,
                    "Verification finished"
                );
                metrics::record_session_finished(&query.network, snapshot.state().phase());
                callbacks.deliver(completion);
                break;
            }
            Step::Halt => break,
        }
    }

    if session.borrow().state().is_cancelled() {
        metrics::record_session_finished(&query.network, "cancelled");
    }
    metrics::record_active_session(-1.0);
}

fn result_label(result: &ExplorerResult<TransactionStatusRecord>) -> &'static str {
    match result {
        Ok(record) => match record.outcome {
            Outcome::Unresolved => "unresolved",
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
        },
        Err(_) => "error",
    }
}
