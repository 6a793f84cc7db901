//! Storage Module
//!
//! This module defines the persistent entities of the claim service (claim tickets,
//! emissions, validators, memo keys) and the `ClaimStore` interface the claim
//! lifecycle runs against.
//!
//! Check-then-act sequences of the lifecycle (nonce ordering, emission bundling,
//! duplicate-signature detection) are re-checked by the store inside each
//! conditional write, so concurrent requests cannot violate them even when
//! several service instances share one store.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::SignedTicket;

pub use memory::MemoryStore;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Lifecycle status of a claim ticket.
///
/// `Initialised` and `Issued` are resumable; `Claimed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Emissions bundled, ticket signature pending
    Initialised,
    /// Signed ticket generated and persisted
    Issued,
    /// Destination-chain transaction recorded
    Claimed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Initialised => "initialised",
            ClaimStatus::Issued => "issued",
            ClaimStatus::Claimed => "claimed",
        }
    }

    /// Parses a status from its name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "initialised" => Some(ClaimStatus::Initialised),
            "issued" => Some(ClaimStatus::Issued),
            "claimed" => Some(ClaimStatus::Claimed),
            _ => None,
        }
    }
}

/// One reward-claim request tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTicket {
    pub id: u64,
    /// Mainchain transaction reference (unique)
    pub mainchain_tx: String,
    pub validator_id: u64,
    /// Claimant address, checksummed
    pub eth_address: String,
    /// Number of bundled emissions
    pub amount: u64,
    pub nonce: u64,
    pub status: ClaimStatus,
    /// Signed ticket payload, present once issued
    pub ticket: Option<SignedTicket>,
    /// Destination-chain transaction hash, present once finalized
    pub ethereum_tx: Option<String>,
    pub emission_ids: Vec<u64>,
    pub created_at: DateTime<Utc>,
}

/// Row data for staging a new claim ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClaimTicket {
    pub mainchain_tx: String,
    pub validator_id: u64,
    pub eth_address: String,
    pub nonce: u64,
    pub emission_ids: Vec<u64>,
}

impl NewClaimTicket {
    /// Amount is always the number of bundled emissions.
    pub fn amount(&self) -> u64 {
        self.emission_ids.len() as u64
    }
}

/// An emission reward unit attributable to a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    pub id: u64,
    pub validator_id: u64,
    /// Mainchain height the emission accrued at
    pub height: u64,
    /// Claim ticket the emission is bundled into, if any
    pub claim_ticket_id: Option<u64>,
}

/// A mainchain validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub id: u64,
    pub moniker: String,
    pub operator_address: String,
    pub self_delegate_address: String,
}

/// Per-validator secret bound into memo tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoKey {
    pub validator_id: u64,
    pub memo_key: String,
    pub updated_at: DateTime<Utc>,
}

/// Filter for the read-only claim ticket queries. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimTicketFilter {
    pub eth_address: Option<String>,
    pub status: Option<ClaimStatus>,
    pub mainchain_tx: Option<String>,
}

/// Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write lost against the current row state
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

// ============================================================================
// STORE INTERFACE
// ============================================================================

/// Persistent store of the claim service.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn get_claim_ticket_by_id(&self, id: u64) -> Result<Option<ClaimTicket>, StoreError>;

    async fn get_claim_ticket_by_mainchain_tx(
        &self,
        mainchain_tx: &str,
    ) -> Result<Option<ClaimTicket>, StoreError>;

    async fn get_claim_ticket_by_signature(
        &self,
        signature: &str,
    ) -> Result<Option<ClaimTicket>, StoreError>;

    async fn get_claim_ticket_by_mainchain_tx_and_eth_address(
        &self,
        mainchain_tx: &str,
        eth_address: &str,
    ) -> Result<Option<ClaimTicket>, StoreError>;

    /// Highest nonce recorded for the address, if any.
    async fn get_last_nonce(&self, eth_address: &str) -> Result<Option<u64>, StoreError>;

    /// Stages a ticket in `Initialised` status and bundles its emissions.
    ///
    /// Must fail with `Conflict` when the mainchain tx already has a ticket,
    /// when a prior nonce exists for the address and `nonce != last + 1`, or
    /// when any listed emission is missing, foreign, or already bundled.
    /// Returns the new ticket id.
    async fn insert_claim_ticket(&self, ticket: NewClaimTicket) -> Result<u64, StoreError>;

    /// Persists the signed payload and moves the ticket to `Issued`.
    ///
    /// Must fail with `Conflict` unless the ticket is `Initialised` and no
    /// other ticket carries the same signature.
    async fn update_claim_ticket_with_ticket(
        &self,
        id: u64,
        ticket: SignedTicket,
    ) -> Result<ClaimTicket, StoreError>;

    /// Records the destination-chain tx and moves the ticket to `Claimed`.
    ///
    /// Re-recording the same tx on a claimed ticket is a no-op; any other
    /// state is a `Conflict`.
    async fn update_claim_ticket_with_eth_tx(
        &self,
        id: u64,
        ethereum_tx: &str,
    ) -> Result<ClaimTicket, StoreError>;

    async fn list_claim_tickets(
        &self,
        filter: ClaimTicketFilter,
    ) -> Result<Vec<ClaimTicket>, StoreError>;

    async fn get_unclaimed_emissions(&self, validator_id: u64)
        -> Result<Vec<Emission>, StoreError>;

    async fn get_validator_by_id(&self, id: u64) -> Result<Option<Validator>, StoreError>;

    async fn get_validator_by_self_delegate_address(
        &self,
        self_delegate_address: &str,
    ) -> Result<Option<Validator>, StoreError>;

    async fn get_memo_key(&self, validator_id: u64) -> Result<Option<MemoKey>, StoreError>;

    /// Stores `memo_key` for the validator unless one exists; returns the stored key.
    async fn create_memo_key(
        &self,
        validator_id: u64,
        memo_key: &str,
    ) -> Result<MemoKey, StoreError>;

    /// Replaces the validator's memo key.
    async fn rotate_memo_key(
        &self,
        validator_id: u64,
        memo_key: &str,
    ) -> Result<MemoKey, StoreError>;
}
