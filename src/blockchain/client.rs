//! Block explorer client with timeout and error handling.
//!
//! # Responsibilities
//! - Issue `gettxinfo` queries against Blockscout-style explorer APIs
//! - Normalize the response into a `TransactionStatusRecord`
//! - Classify transport, HTTP and decoding problems as transient errors
//!
//! # Design Decisions
//! - A definitive result succeeds only with an explicit `success: true`;
//!   anything else in a definitive result is a failure
//! - Unknown fields are ignored, optional fields may be absent
//! - Numeric fields are accepted as JSON strings or JSON numbers

use async_trait::async_trait;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::blockchain::types::{
    ExplorerError, ExplorerResult, Outcome, TransactionStatusRecord, VerificationFailure,
    GENERIC_FAILURE_DETAIL,
};
use crate::config::schema::ExplorerConfig;

/// Anything that can answer "what is the status of this transaction?".
///
/// Implementations must be stateless per call; independent sessions invoke
/// them concurrently without coordination.
#[async_trait]
pub trait TransactionStatusSource: Send + Sync + 'static {
    /// Query the status of `transaction_id` against the explorer at `endpoint`.
    async fn query(
        &self,
        endpoint: &Url,
        transaction_id: &str,
    ) -> ExplorerResult<TransactionStatusRecord>;
}

/// HTTP client for Blockscout-compatible explorer APIs.
#[derive(Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    request_timeout: Duration,
}

impl ExplorerClient {
    /// Create a new explorer client.
    pub fn new(config: &ExplorerConfig) -> ExplorerResult<Self> {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ExplorerError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            request_timeout,
        })
    }

    /// Fetch and normalize transaction info.
    pub async fn get_tx_info(
        &self,
        endpoint: &Url,
        transaction_id: &str,
    ) -> ExplorerResult<TransactionStatusRecord> {
        let response = self
            .http
            .get(endpoint.clone())
            .query(&[
                ("module", "transaction"),
                ("action", "gettxinfo"),
                ("txhash", transaction_id),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let record = parse_tx_info(&body)?;

        tracing::debug!(
            endpoint = %endpoint,
            tx = %transaction_id,
            outcome = ?record.outcome,
            block_number = ?record.block_number,
            "Explorer query answered"
        );
        Ok(record)
    }

    fn classify(&self, err: reqwest::Error) -> ExplorerError {
        if err.is_timeout() {
            ExplorerError::Timeout(self.request_timeout.as_millis() as u64)
        } else {
            ExplorerError::Transport(err.to_string())
        }
    }
}

impl std::fmt::Debug for ExplorerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerClient")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl TransactionStatusSource for ExplorerClient {
    async fn query(
        &self,
        endpoint: &Url,
        transaction_id: &str,
    ) -> ExplorerResult<TransactionStatusRecord> {
        self.get_tx_info(endpoint, transaction_id).await
    }
}

/// Top-level `{status, message, result}` envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: Value,
    #[serde(default)]
    result: Value,
}

/// The `result` object of a definitive `gettxinfo` answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxInfo {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default, deserialize_with = "flexible_u64")]
    block_number: Option<u64>,
    #[serde(default, deserialize_with = "flexible_u64")]
    confirmations: Option<u64>,
    #[serde(default)]
    err_description: Option<String>,
    #[serde(default)]
    revert_reason: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    gas_used: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    from: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    to: Option<String>,
    #[serde(default, deserialize_with = "flexible_string")]
    value: Option<String>,
}

/// Normalize a raw `gettxinfo` response body.
pub fn parse_tx_info(body: &[u8]) -> ExplorerResult<TransactionStatusRecord> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| ExplorerError::Malformed(e.to_string()))?;

    let status_ok = match &envelope.status {
        Value::String(s) => s.trim() == "1",
        Value::Number(n) => n.as_u64() == Some(1),
        other => {
            return Err(ExplorerError::Malformed(format!(
                "unexpected status field: {other}"
            )))
        }
    };

    if !status_ok {
        // Not found or not indexed yet.
        return Ok(TransactionStatusRecord::unresolved());
    }

    let info: TxInfo = match envelope.result {
        Value::Null => return Ok(TransactionStatusRecord::unresolved()),
        result @ Value::Object(_) => {
            serde_json::from_value(result).map_err(|e| ExplorerError::Malformed(e.to_string()))?
        }
        other => {
            return Err(ExplorerError::Malformed(format!(
                "unexpected result field: {other}"
            )))
        }
    };

    let (outcome, confirmations, error_detail) = if info.success == Some(true) {
        (
            Outcome::Succeeded,
            Some(info.confirmations.unwrap_or(0)),
            None,
        )
    } else {
        let detail = non_empty(info.err_description)
            .or_else(|| non_empty(info.revert_reason))
            .unwrap_or_else(|| GENERIC_FAILURE_DETAIL.to_string());
        let failed = VerificationFailure::TransactionFailed(detail).into_record();
        (failed.outcome, info.confirmations, failed.error_detail)
    };

    let record = TransactionStatusRecord {
        outcome,
        block_number: info.block_number,
        confirmations,
        error_detail,
        gas_used: info.gas_used,
        from: info.from,
        to: info.to,
        value: info.value,
    };

    Ok(record)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn flexible_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected non-negative integer, got {n}"))),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            let parsed = match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse::<u64>(),
            };
            parsed
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid integer '{s}': {e}")))
        }
        Some(other) => Err(de::Error::custom(format!("expected integer, got {other}"))),
    }
}

fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected string, got {other}"))),
    }
}
