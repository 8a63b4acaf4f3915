//! Session API subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → server.rs (Axum setup, request id, trace, timeout)
//!     → handlers.rs (start / inspect / cancel sessions)
//!     → verification::ConfirmationTracker (current snapshot via ArcSwap)
//!     → verification::SessionStore (live handles)
//!     → JSON session view
//! ```

pub mod handlers;
pub mod server;

pub use handlers::SessionView;
pub use server::{build_tracker, AppState, HttpServer, ServerError};
