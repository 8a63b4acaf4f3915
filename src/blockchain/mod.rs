//! Block explorer integration subsystem.
//!
//! # Data Flow
//! ```text
//! Network identifier
//!     → registry.rs (network → explorer API base URL)
//!     → client.rs (gettxinfo query with timeouts)
//!     → types.rs (normalized TransactionStatusRecord)
//! ```
//!
//! # Constraints
//! - The registry is immutable once built and shared by all sessions
//! - Transport failures are never reported as a failed transaction
//! - The explorer's report is trusted; no proofs are checked locally

pub mod client;
pub mod registry;
pub mod types;

pub use client::{ExplorerClient, TransactionStatusSource};
pub use registry::{EndpointRegistry, NetworkEndpoint, RegistryError};
pub use types::{
    ExplorerError, Outcome, TransactionQuery, TransactionStatusRecord, VerificationFailure,
};
