//! Claim Transaction Validation Module
//!
//! This module decides whether a mainchain transaction is a legitimate claim
//! request. A claim transaction is sent by a validator's self-delegator and
//! carries, as its memo, the memo token bound to the validator's current memo
//! key. The claimant proves ownership of the Ethereum address named in the memo
//! by signing `TxData { tx_hash, sig_nonce }` with that address.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: The memo key check is what makes a memo single-use. A memo
//! whose key has been rotated by finalization must never validate again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::crypto::address::{is_eth_address, same_eth_address, to_checksum_address};
use crate::crypto::{MemoClaims, TokenService, TypedDataDomain};
use crate::error::ClaimError;
use crate::mainchain_client::MainchainTx;
use crate::storage::ClaimStore;

// ============================================================================
// VALIDATION DATA STRUCTURES
// ============================================================================

/// Identity resolved from a valid claim transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedClaim {
    /// Claimant address, checksummed
    pub eth_address: String,
    pub validator_id: u64,
}

/// Confirms a mainchain transaction is a legitimate claim request.
#[async_trait]
pub trait ClaimTxValidator: Send + Sync {
    /// Validates the transaction against the claimant's typed-data signature.
    ///
    /// # Arguments
    ///
    /// * `tx` - Fetched mainchain transaction
    /// * `sig_nonce` - Nonce the claimant signed alongside the tx hash
    /// * `sig` - Claimant's typed-data signature over `{tx.hash, sig_nonce}`
    async fn validate_claim_tx(
        &self,
        tx: &MainchainTx,
        sig_nonce: &str,
        sig: &str,
    ) -> Result<ValidatedClaim, ClaimError>;
}

// ============================================================================
// MEMO CLAIM VALIDATOR IMPLEMENTATION
// ============================================================================

/// Validates claim transactions through their memo token.
pub struct MemoClaimValidator {
    store: Arc<dyn ClaimStore>,
    tokens: TokenService,
    domain: TypedDataDomain,
}

impl MemoClaimValidator {
    pub fn new(store: Arc<dyn ClaimStore>, tokens: TokenService, domain: TypedDataDomain) -> Self {
        Self {
            store,
            tokens,
            domain,
        }
    }
}

#[async_trait]
impl ClaimTxValidator for MemoClaimValidator {
    async fn validate_claim_tx(
        &self,
        tx: &MainchainTx,
        sig_nonce: &str,
        sig: &str,
    ) -> Result<ValidatedClaim, ClaimError> {
        if tx.code != 0 {
            return Err(ClaimError::Mainchain(format!(
                "tx {} failed on mainchain with code {}",
                tx.hash, tx.code
            )));
        }

        let memo: MemoClaims = self
            .tokens
            .verify(&tx.memo)
            .map_err(|e| ClaimError::Memo(format!("invalid memo in tx {}: {}", tx.hash, e)))?;
        if !is_eth_address(&memo.eth_address) {
            return Err(ClaimError::Memo(format!(
                "memo eth address {} is invalid",
                memo.eth_address
            )));
        }

        if tx.signer != memo.self_delegate_address {
            return Err(ClaimError::Memo(format!(
                "tx signer {} is not the memo's self-delegate address {}",
                tx.signer, memo.self_delegate_address
            )));
        }

        let validator = self
            .store
            .get_validator_by_self_delegate_address(&memo.self_delegate_address)
            .await
            .map_err(ClaimError::query)?
            .ok_or_else(|| {
                ClaimError::NotFound(format!(
                    "validator with self-delegate address {} not found",
                    memo.self_delegate_address
                ))
            })?;

        let current_key = self
            .store
            .get_memo_key(validator.id)
            .await
            .map_err(ClaimError::query)?;
        match current_key {
            Some(key) if key.memo_key == memo.memo_key => {}
            _ => {
                warn!(
                    "Stale memo in tx {} for validator {}",
                    tx.hash, validator.moniker
                );
                return Err(ClaimError::Memo(
                    "memo key expired - request a new memo".to_string(),
                ));
            }
        }

        let recovered = self.domain.recover_tx_data_signer(&tx.hash, sig_nonce, sig)?;
        if !same_eth_address(&recovered, &memo.eth_address) {
            return Err(ClaimError::EthAddressMismatch {
                stored: to_checksum_address(&memo.eth_address)?,
                recovered,
            });
        }

        info!(
            "Claim tx {} validated for validator {} ({})",
            tx.hash, validator.moniker, recovered
        );
        Ok(ValidatedClaim {
            eth_address: recovered,
            validator_id: validator.id,
        })
    }
}
