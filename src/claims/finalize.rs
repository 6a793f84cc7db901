//! Finalization: records the destination-chain redemption of a claim ticket
//! and rotates the validator's memo key.

use tracing::info;

use super::{ClaimService, EthTxRequest, FinalizeResult};
use crate::crypto::address::to_checksum_address;
use crate::crypto::generate_memo_key;
use crate::error::ClaimError;

impl ClaimService {
    /// Handles a signed finalization request.
    ///
    /// Rotating the memo key invalidates any memo issued for the validator but
    /// not yet used.
    pub async fn process_eth_tx(&self, payload: &str) -> Result<FinalizeResult, ClaimError> {
        let request: EthTxRequest = self.tokens.verify(payload)?;
        let eth_address = to_checksum_address(&request.eth_address)?;
        if !is_tx_hash(&request.eth_tx) {
            return Err(ClaimError::Auth(format!(
                "invalid ethereum tx hash: {}",
                request.eth_tx
            )));
        }

        let ticket = self
            .store
            .get_claim_ticket_by_mainchain_tx_and_eth_address(&request.mainchain_tx, &eth_address)
            .await
            .map_err(ClaimError::query)?
            .ok_or_else(|| {
                ClaimError::NotFound(format!(
                    "Mainchain Tx {} and Eth address {} not found",
                    request.mainchain_tx, request.eth_address
                ))
            })?;

        let updated = self
            .store
            .update_claim_ticket_with_eth_tx(ticket.id, &request.eth_tx)
            .await
            .map_err(|e| ClaimError::Update(e.to_string()))?;

        self.store
            .rotate_memo_key(ticket.validator_id, &generate_memo_key())
            .await
            .map_err(|e| ClaimError::Update(e.to_string()))?;

        info!(
            "Claim ticket {} claimed in eth tx {}; memo key rotated for validator {}",
            updated.id, request.eth_tx, updated.validator_id
        );
        Ok(FinalizeResult {
            mainchain_tx: updated.mainchain_tx,
            eth_tx: request.eth_tx,
            claim_status: updated.status,
        })
    }
}

/// `0x` followed by 64 hex digits.
fn is_tx_hash(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map_or(false, |h| h.len() == 64 && h.chars().all(|c| c.is_ascii_hexdigit()))
}
