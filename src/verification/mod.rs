//! Transaction verification subsystem.
//!
//! # Data Flow
//! ```text
//! Session host (HTTP API, CLI)
//!     → tracker.rs (start: resolve endpoint, spawn poll loop)
//!     → session.rs (state machine: Idle → Polling → Resolved | TimedOut)
//!     → blockchain::client (one query per attempt)
//!     → back to session.rs as an event
//!     → host observes snapshots and receives one completion callback
//! ```
//!
//! # Design Decisions
//! - One task per session, strictly sequential polling
//! - Sessions share only the read-only registry and the stateless client
//! - Transient errors are absorbed locally; only the budget surfaces them

pub mod policy;
pub mod session;
pub mod store;
pub mod tracker;

pub use policy::PollingPolicy;
pub use session::{Resolution, SessionState, VerificationSession};
pub use store::SessionStore;
pub use tracker::{ConfirmationTracker, SessionHandle};
