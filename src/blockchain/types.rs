//! Transaction status records and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when the explorer reports a failure without a reason.
pub const GENERIC_FAILURE_DETAIL: &str = "Transaction failed";

/// What a single explorer query concluded about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Not found, not yet indexed, or not yet mined.
    Unresolved,
    /// Mined and executed successfully.
    Succeeded,
    /// Mined but reverted, or otherwise reported as failed.
    Failed,
}

impl Outcome {
    /// Whether this outcome ends verification.
    pub fn is_resolved(self) -> bool {
        !matches!(self, Outcome::Unresolved)
    }
}

/// Identifies the transaction a verification session is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    /// Transaction hash as handed over by the payment widget.
    pub transaction_id: String,
    /// Network identifier used to look up the explorer endpoint.
    pub network: String,
}

impl TransactionQuery {
    pub fn new(transaction_id: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            network: network.into(),
        }
    }
}

/// Normalized result of one status query.
///
/// The pass-through fields (`gas_used`, `from`, `to`, `value`) are carried
/// for display only and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatusRecord {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TransactionStatusRecord {
    /// A record with nothing known yet.
    pub fn unresolved() -> Self {
        Self {
            outcome: Outcome::Unresolved,
            block_number: None,
            confirmations: None,
            error_detail: None,
            gas_used: None,
            from: None,
            to: None,
            value: None,
        }
    }

    /// A failure record carrying only an error detail.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            error_detail: Some(detail.into()),
            ..Self::unresolved()
        }
    }
}

/// Transient failure of the query mechanism itself.
///
/// None of these say anything about the transaction; the tracker retries
/// on the next scheduled poll.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Connection or request failed.
    #[error("Explorer request failed: {0}")]
    Transport(String),

    /// Explorer answered with a non-success HTTP status.
    #[error("Explorer returned HTTP {0}")]
    Status(u16),

    /// Request did not complete in time.
    #[error("Explorer request timed out after {0} ms")]
    Timeout(u64),

    /// Body could not be read or did not match the expected envelope.
    #[error("Malformed explorer response: {0}")]
    Malformed(String),
}

/// Result type for explorer queries.
pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Reasons a verification session ends without confirming the payment.
///
/// The `Display` text is what the host shows as `error_detail`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    /// No explorer endpoint is registered for the network.
    #[error("Network \"{0}\" not supported for verification")]
    UnsupportedNetwork(String),

    /// The explorer reported a definitive failure.
    #[error("{0}")]
    TransactionFailed(String),

    /// The query budget ran out before the transaction resolved.
    #[error(
        "Transaction verification timed out after {0} attempts. The transaction may still be \
         processing; check the block explorer manually."
    )]
    Timeout(u32),
}

impl VerificationFailure {
    /// Failure-shaped record carrying this failure as its detail.
    pub fn into_record(self) -> TransactionStatusRecord {
        TransactionStatusRecord::failed(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_network_message() {
        let err = VerificationFailure::UnsupportedNetwork("net-X".to_string());
        assert_eq!(
            err.to_string(),
            "Network \"net-X\" not supported for verification"
        );

        let record = err.into_record();
        assert_eq!(record.outcome, Outcome::Failed);
        assert!(record.error_detail.unwrap().contains("not supported"));
    }

    #[test]
    fn test_timeout_message_is_distinct_from_on_chain_failure() {
        let detail = VerificationFailure::Timeout(36).to_string();
        assert!(detail.contains("timed out after 36 attempts"));
        assert!(detail.contains("may still be processing"));
    }

    #[test]
    fn test_outcome_resolution() {
        assert!(!Outcome::Unresolved.is_resolved());
        assert!(Outcome::Succeeded.is_resolved());
        assert!(Outcome::Failed.is_resolved());
    }

    #[test]
    fn test_record_serializes_without_absent_fields() {
        let mut record = TransactionStatusRecord::unresolved();
        record.outcome = Outcome::Succeeded;
        record.block_number = Some(100);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "succeeded");
        assert_eq!(json["block_number"], 100);
        assert!(json.get("error_detail").is_none());
    }

    #[test]
    fn test_explorer_error_display() {
        assert_eq!(ExplorerError::Status(502).to_string(), "Explorer returned HTTP 502");
        assert!(ExplorerError::Timeout(1500).to_string().contains("1500"));
    }
}
