//! Ticket Request Dispatcher
//!
//! Entry point of ticket requests: re-authenticates the caller against any
//! existing ticket for the mainchain transaction and routes to fresh issuance,
//! resumption, or an idempotent replay of the stored result.

use tracing::{debug, warn};

use super::{ClaimService, TicketRequest, TicketResult};
use crate::crypto::address::same_eth_address;
use crate::error::ClaimError;
use crate::storage::ClaimStatus;

impl ClaimService {
    /// Handles a signed ticket request.
    pub async fn process_ticket(&self, payload: &str) -> Result<TicketResult, ClaimError> {
        let request: TicketRequest = self.tokens.verify(payload)?;
        let nonce = parse_nonce(&request.nonce)?;
        let sig_nonce = sig_nonce_string(&request.sig_nonce);

        let existing = self
            .store
            .get_claim_ticket_by_mainchain_tx(&request.tx_hash)
            .await
            .map_err(ClaimError::query)?;

        let ticket = match existing {
            None => {
                return self
                    .issue_ticket(&request.tx_hash, &sig_nonce, &request.sig, nonce, None)
                    .await
            }
            Some(ticket) => ticket,
        };

        // Only the ticket's original claimant may query or resume it
        let recovered =
            self.domain
                .recover_tx_data_signer(&request.tx_hash, &sig_nonce, &request.sig)?;
        if !same_eth_address(&ticket.eth_address, &recovered) {
            warn!(
                "Ticket request for tx {} signed by {} instead of owner {}",
                request.tx_hash, recovered, ticket.eth_address
            );
            return Err(ClaimError::EthAddressMismatch {
                stored: ticket.eth_address,
                recovered,
            });
        }

        match ticket.status {
            ClaimStatus::Issued | ClaimStatus::Claimed => {
                debug!(
                    "Replaying claim ticket {} ({})",
                    ticket.id,
                    ticket.status.as_str()
                );
                self.ticket_success_body(
                    ticket.ticket.as_ref().map(|t| t.signature.as_str()),
                    ticket.amount,
                    ticket.nonce,
                    &ticket.eth_address,
                    ticket.status,
                    ticket.ethereum_tx.as_deref(),
                )
            }
            ClaimStatus::Initialised => {
                self.issue_ticket(
                    &request.tx_hash,
                    &sig_nonce,
                    &request.sig,
                    nonce,
                    Some(ticket.id),
                )
                .await
            }
        }
    }
}

/// Parses the requested claim nonce: a positive integer, given as a number or
/// a decimal string.
fn parse_nonce(value: &serde_json::Value) -> Result<u64, ClaimError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => Ok(n),
        _ => Err(ClaimError::InvalidTicketRequest(format!(
            "nonce {} is not a valid number",
            value
        ))),
    }
}

fn sig_nonce_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
