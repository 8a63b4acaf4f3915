//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the verifier.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the payment verifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Listener configuration for the session API.
    pub listener: ListenerConfig,

    /// Global polling schedule.
    pub polling: PollingConfig,

    /// Explorer HTTP client settings.
    pub explorer: ExplorerConfig,

    /// Network identifier → explorer endpoint.
    pub networks: BTreeMap<String, NetworkConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            polling: PollingConfig::default(),
            explorer: ExplorerConfig::default(),
            networks: default_networks(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Blockscout instances known out of the box.
pub fn default_networks() -> BTreeMap<String, NetworkConfig> {
    [
        // Served by the Mordor testnet explorer.
        ("ethereum-classic", "https://etc-mordor.blockscout.com/api"),
        ("sepolia", "https://eth-sepolia.blockscout.com/api"),
        (
            "milkomeda-mainnet",
            "https://explorer-mainnet-cardano-evm.c1.milkomeda.com/api",
        ),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), NetworkConfig::new(url)))
    .collect()
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Per-request timeout for the session API in seconds.
    pub request_timeout_secs: u64,

    /// How long finished sessions stay queryable before they are dropped.
    pub session_retention_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            session_retention_secs: 600,
        }
    }
}

/// Polling schedule shared by all networks unless overridden.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Wait before the first query, in milliseconds.
    pub settle_delay_ms: u64,

    /// Wait between consecutive queries, in milliseconds.
    pub poll_interval_ms: u64,

    /// Total verification budget in seconds.
    pub timeout_secs: u64,

    /// Explicit query budget. Derived from `timeout_secs / poll_interval_ms` when unset.
    pub max_attempts: Option<u32>,

    /// Upper bound on a single query attempt, in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2_000,
            poll_interval_ms: 5_000,
            timeout_secs: 180,
            max_attempts: None,
            attempt_timeout_ms: 15_000,
        }
    }
}

/// Per-network overrides of the global polling schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollingOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// A single explorer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Base URL of the explorer's query API (e.g., "https://eth-sepolia.blockscout.com/api").
    pub url: String,

    /// Optional schedule overrides for faster or slower chains.
    #[serde(flatten)]
    pub polling: PollingOverrides,
}

impl NetworkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            polling: PollingOverrides::default(),
        }
    }
}

/// Explorer HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Timeout for a single explorer request in milliseconds.
    pub request_timeout_ms: u64,

    /// User-Agent header sent to explorers.
    pub user_agent: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            user_agent: concat!("payment-verifier/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
