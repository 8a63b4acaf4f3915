//! Network endpoint registry.
//!
//! Maps a network identifier to the base URL of its explorer API. Built once
//! from configuration and shared read-only (`Arc`) by every session.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use url::Url;

use crate::blockchain::types::VerificationFailure;
use crate::config::schema::{NetworkConfig, PollingOverrides};

/// Errors raised while building the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid explorer URL '{url}' for network '{network}': {source}")]
    InvalidUrl {
        network: String,
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A registered explorer endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    name: String,
    base_url: Url,
    polling: PollingOverrides,
}

impl NetworkEndpoint {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            polling: PollingOverrides::default(),
        }
    }

    /// Attach per-network schedule overrides.
    pub fn with_polling(mut self, polling: PollingOverrides) -> Self {
        self.polling = polling;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL of the query API.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn polling(&self) -> &PollingOverrides {
        &self.polling
    }

    /// Human-facing explorer page for a transaction.
    ///
    /// Blockscout serves its API under `/api`; the page lives at `/tx/{hash}`
    /// on the same host.
    pub fn transaction_link(&self, transaction_id: &str) -> Option<Url> {
        let ends_with_api = self
            .base_url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            == Some("api");

        let mut link = self.base_url.clone();
        link.set_query(None);
        {
            let mut segments = link.path_segments_mut().ok()?;
            segments.pop_if_empty();
            if ends_with_api {
                segments.pop();
            }
            segments.push("tx").push(transaction_id);
        }
        Some(link)
    }
}

/// Immutable lookup table of explorer endpoints.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, NetworkEndpoint>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the `[networks]` configuration table.
    pub fn from_config(networks: &BTreeMap<String, NetworkConfig>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (name, network) in networks {
            let url = Url::parse(&network.url).map_err(|source| RegistryError::InvalidUrl {
                network: name.clone(),
                url: network.url.clone(),
                source,
            })?;
            let endpoint =
                NetworkEndpoint::new(name.clone(), url).with_polling(network.polling.clone());
            registry = registry.with_endpoint(endpoint);
        }
        Ok(registry)
    }

    /// Add or replace an endpoint.
    pub fn with_endpoint(mut self, endpoint: NetworkEndpoint) -> Self {
        self.endpoints.insert(endpoint.name.clone(), endpoint);
        self
    }

    /// Look up the endpoint for a network. Exact, case-sensitive match.
    pub fn resolve(&self, network: &str) -> Result<&NetworkEndpoint, VerificationFailure> {
        self.endpoints
            .get(network)
            .ok_or_else(|| VerificationFailure::UnsupportedNetwork(network.to_string()))
    }

    /// Registered network identifiers, sorted.
    pub fn networks(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_networks;

    fn endpoint(name: &str, url: &str) -> NetworkEndpoint {
        NetworkEndpoint::new(name, Url::parse(url).unwrap())
    }

    #[test]
    fn test_resolve_is_exact_and_case_sensitive() {
        let registry = EndpointRegistry::new()
            .with_endpoint(endpoint("sepolia", "https://eth-sepolia.blockscout.com/api"));

        let found = registry.resolve("sepolia").unwrap();
        assert_eq!(found.base_url().as_str(), "https://eth-sepolia.blockscout.com/api");

        assert_eq!(
            registry.resolve("Sepolia").unwrap_err(),
            VerificationFailure::UnsupportedNetwork("Sepolia".to_string())
        );
        assert!(registry.resolve(" sepolia").is_err());
    }

    #[test]
    fn test_unsupported_network_message() {
        let registry = EndpointRegistry::new();
        let err = registry.resolve("net-X").unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_from_default_config() {
        let registry = EndpointRegistry::from_config(&default_networks()).unwrap();
        assert_eq!(
            registry.networks(),
            vec!["ethereum-classic", "milkomeda-mainnet", "sepolia"]
        );
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let mut networks = BTreeMap::new();
        networks.insert("bad".to_string(), NetworkConfig::new("not a url"));
        let err = EndpointRegistry::from_config(&networks).unwrap_err();
        assert!(err.to_string().contains("'bad'"));
    }

    #[test]
    fn test_from_config_keeps_overrides() {
        let mut net = NetworkConfig::new("http://localhost:4000/api");
        net.polling.poll_interval_ms = Some(250);
        let mut networks = BTreeMap::new();
        networks.insert("local".to_string(), net);

        let registry = EndpointRegistry::from_config(&networks).unwrap();
        assert_eq!(
            registry.resolve("local").unwrap().polling().poll_interval_ms,
            Some(250)
        );
    }

    #[test]
    fn test_transaction_link() {
        let ep = endpoint("sepolia", "https://eth-sepolia.blockscout.com/api");
        assert_eq!(
            ep.transaction_link("0xabc").unwrap().as_str(),
            "https://eth-sepolia.blockscout.com/tx/0xabc"
        );

        let ep = endpoint("trailing", "https://explorer.example/api/");
        assert_eq!(
            ep.transaction_link("0x1").unwrap().as_str(),
            "https://explorer.example/tx/0x1"
        );

        let ep = endpoint("nested", "https://explorer.example/chain/api");
        assert_eq!(
            ep.transaction_link("0x1").unwrap().as_str(),
            "https://explorer.example/chain/tx/0x1"
        );
    }
}
