//! Error and Status Code Module
//!
//! Every public claim operation reports its outcome as a `StatusCode` inside the
//! response envelope. Internally, failures travel as `ClaimError` values and are
//! mapped to a status code exactly once, at the envelope boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StoreError;

// ============================================================================
// STATUS CODES
// ============================================================================

/// Closed set of status codes exposed in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    JwtError,
    DbNotFound,
    DbInsertError,
    DbUpdateError,
    DbQueryError,
    NonceError,
    EmissionError,
    ClaimTicketError,
    EthAddressError,
    EthSignatureError,
    MainchainTxError,
    MemoError,
    UnspecifiedError,
}

impl StatusCode {
    /// Human-readable description used as the prefix of envelope error strings.
    pub fn description(&self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::JwtError => "jwt error",
            StatusCode::DbNotFound => "db not found",
            StatusCode::DbInsertError => "db insert error",
            StatusCode::DbUpdateError => "db update error",
            StatusCode::DbQueryError => "db query error",
            StatusCode::NonceError => "nonce error",
            StatusCode::EmissionError => "emission error",
            StatusCode::ClaimTicketError => "claim ticket error",
            StatusCode::EthAddressError => "eth address error",
            StatusCode::EthSignatureError => "eth signature error",
            StatusCode::MainchainTxError => "mainchain tx error",
            StatusCode::MemoError => "memo error",
            StatusCode::UnspecifiedError => "unspecified error",
        }
    }
}

// ============================================================================
// CLAIM ERRORS
// ============================================================================

/// Failures raised while binding memos, issuing tickets or finalizing claims.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// Signed token is malformed, expired, or signed with an unknown secret
    #[error("{0}")]
    Auth(String),

    /// Typed-data signature could not be decoded or recovered
    #[error("malformed signature: {0}")]
    Signature(String),

    /// Recovered signer does not own the claim ticket
    #[error("eth address \"{stored}\" does not match recovered signature address \"{recovered}\"")]
    EthAddressMismatch { stored: String, recovered: String },

    /// Claim requested out of sequence for the Ethereum address
    #[error(
        "expected nonce {expected}, got {got} - nonce must be exactly 1 greater than last nonce {last}"
    )]
    Nonce { expected: u64, got: u64, last: u64 },

    /// Last nonce is `u64::MAX`, no further claim can follow it
    #[error("no nonce can follow last nonce {last}")]
    NonceExhausted { last: u64 },

    /// Validator has nothing left to claim
    #[error("currently no emissions to claim")]
    NoEmissions,

    /// Ticket request itself is invalid (e.g. unusable nonce)
    #[error("{0}")]
    InvalidTicketRequest(String),

    /// A ticket with the same signature was already generated
    #[error("ticket already generated for address, amount and nonce")]
    DuplicateTicket,

    #[error("{0}")]
    Insert(String),

    #[error("{0}")]
    Update(String),

    #[error("{0}")]
    Query(String),

    #[error("{0}")]
    NotFound(String),

    /// Mainchain transaction could not be fetched or did not succeed
    #[error("{0}")]
    Mainchain(String),

    /// Memo embedded in the mainchain transaction is invalid or stale
    #[error("{0}")]
    Memo(String),

    /// Internal invariant violated
    #[error("{0}")]
    Unspecified(String),
}

impl ClaimError {
    /// Maps the error to the status code reported in the envelope.
    pub fn status(&self) -> StatusCode {
        match self {
            ClaimError::Auth(_) => StatusCode::JwtError,
            ClaimError::Signature(_) => StatusCode::EthSignatureError,
            ClaimError::EthAddressMismatch { .. } => StatusCode::EthAddressError,
            ClaimError::Nonce { .. } => StatusCode::NonceError,
            ClaimError::NonceExhausted { .. } => StatusCode::NonceError,
            ClaimError::NoEmissions => StatusCode::EmissionError,
            ClaimError::InvalidTicketRequest(_) => StatusCode::ClaimTicketError,
            ClaimError::DuplicateTicket => StatusCode::ClaimTicketError,
            ClaimError::Insert(_) => StatusCode::DbInsertError,
            ClaimError::Update(_) => StatusCode::DbUpdateError,
            ClaimError::Query(_) => StatusCode::DbQueryError,
            ClaimError::NotFound(_) => StatusCode::DbNotFound,
            ClaimError::Mainchain(_) => StatusCode::MainchainTxError,
            ClaimError::Memo(_) => StatusCode::MemoError,
            ClaimError::Unspecified(_) => StatusCode::UnspecifiedError,
        }
    }

    /// Envelope error string: status description followed by the detail.
    pub fn envelope_message(&self) -> String {
        format!("{}: {}", self.status().description(), self)
    }

    /// Wraps a failed read against the store.
    pub fn query(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ClaimError::NotFound(msg),
            other => ClaimError::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_error_names_expected_value() {
        let err = ClaimError::Nonce {
            expected: 4,
            got: 3,
            last: 3,
        };
        assert_eq!(err.status(), StatusCode::NonceError);
        assert!(err.envelope_message().starts_with("nonce error: expected nonce 4, got 3"));
    }

    #[test]
    fn duplicate_ticket_reports_claim_ticket_status() {
        assert_eq!(ClaimError::DuplicateTicket.status(), StatusCode::ClaimTicketError);
    }

    #[test]
    fn query_wrapper_keeps_not_found() {
        let err = ClaimError::query(StoreError::NotFound("ticket 9".to_string()));
        assert_eq!(err.status(), StatusCode::DbNotFound);
        let err = ClaimError::query(StoreError::Backend("disk".to_string()));
        assert_eq!(err.status(), StatusCode::DbQueryError);
    }
}
