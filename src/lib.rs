//! Payment verifier library.
//!
//! Tracks a submitted blockchain transaction until its explorer reports it
//! confirmed, failed, or the query budget runs out.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod verification;

pub use config::schema::VerifierConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use verification::{ConfirmationTracker, SessionHandle};
