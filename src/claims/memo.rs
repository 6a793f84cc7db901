//! Memo binding: issues the memo token a validator embeds in its claim transaction.

use tracing::info;

use super::{ClaimService, MemoRequest, MemoResult};
use crate::crypto::address::{check_bech32_address, is_eth_address};
use crate::crypto::generate_memo_key;
use crate::error::ClaimError;

impl ClaimService {
    /// Verifies a memo request and returns a memo bound to the validator's memo key.
    ///
    /// The validator's memo key is allocated on first use. The memo itself is
    /// never stored.
    pub async fn process_memo(&self, payload: &str) -> Result<MemoResult, ClaimError> {
        let request: MemoRequest = self.tokens.verify(payload)?;
        let (eth_address, self_delegate_address) =
            match (request.eth_address, request.self_delegate_address) {
                (Some(eth), Some(del)) if !eth.is_empty() && !del.is_empty() => (eth, del),
                _ => {
                    return Err(ClaimError::Auth(
                        "missing ethereum address or self delegator address".to_string(),
                    ))
                }
            };

        if !is_eth_address(&eth_address) {
            return Err(ClaimError::Auth(format!(
                "invalid ethereum address: {}",
                eth_address
            )));
        }
        if !check_bech32_address(&self_delegate_address, &self.bech32_prefix) {
            return Err(ClaimError::Auth(format!(
                "invalid self delegator address: {}",
                self_delegate_address
            )));
        }

        let validator = self
            .store
            .get_validator_by_self_delegate_address(&self_delegate_address)
            .await
            .map_err(ClaimError::query)?
            .ok_or_else(|| ClaimError::NotFound(format!("{} not found", self_delegate_address)))?;

        let memo_key = match self
            .store
            .get_memo_key(validator.id)
            .await
            .map_err(ClaimError::query)?
        {
            Some(key) => key,
            None => self
                .store
                .create_memo_key(validator.id, &generate_memo_key())
                .await
                .map_err(|e| ClaimError::Insert(e.to_string()))?,
        };

        let memo = self
            .tokens
            .sign_memo(&eth_address, &self_delegate_address, &memo_key.memo_key)?;
        info!(
            "Issued memo for validator {} bound to {}",
            validator.moniker, eth_address
        );
        Ok(MemoResult { memo })
    }
}
