//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate explorer URLs and value ranges (intervals > 0, budgets > 0)
//! - Validate listener and metrics addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VerifierConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{PollingOverrides, VerifierConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no networks configured")]
    NoNetworks,

    #[error("network identifier must not be empty")]
    EmptyNetworkName,

    #[error("network '{network}' has invalid URL '{url}': {reason}")]
    InvalidUrl {
        network: String,
        url: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: String, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &VerifierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let polling = &config.polling;
    check_nonzero(&mut errors, "polling.poll_interval_ms", polling.poll_interval_ms);
    check_nonzero(&mut errors, "polling.timeout_secs", polling.timeout_secs);
    check_nonzero(&mut errors, "polling.attempt_timeout_ms", polling.attempt_timeout_ms);
    if let Some(max) = polling.max_attempts {
        check_nonzero(&mut errors, "polling.max_attempts", max as u64);
    }
    check_nonzero(
        &mut errors,
        "explorer.request_timeout_ms",
        config.explorer.request_timeout_ms,
    );
    check_nonzero(
        &mut errors,
        "listener.request_timeout_secs",
        config.listener.request_timeout_secs,
    );

    if config.networks.is_empty() {
        errors.push(ValidationError::NoNetworks);
    }

    for (name, network) in &config.networks {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyNetworkName);
            continue;
        }
        if let Err(reason) = check_url(&network.url) {
            errors.push(ValidationError::InvalidUrl {
                network: name.clone(),
                url: network.url.clone(),
                reason,
            });
        }
        check_overrides(&mut errors, name, &network.polling);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_overrides(errors: &mut Vec<ValidationError>, name: &str, overrides: &PollingOverrides) {
    if let Some(v) = overrides.poll_interval_ms {
        check_nonzero(errors, &format!("networks.{name}.poll_interval_ms"), v);
    }
    if let Some(v) = overrides.timeout_secs {
        check_nonzero(errors, &format!("networks.{name}.timeout_secs"), v);
    }
    if let Some(v) = overrides.max_attempts {
        check_nonzero(errors, &format!("networks.{name}.max_attempts"), v as u64);
    }
}

fn check_nonzero(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero {
            field: field.to_string(),
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn check_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}
