//! Ticket Issuer
//!
//! Stages a claim ticket for a validated mainchain transaction and advances it
//! to ISSUED by generating the signed ticket. A ticket left INITIALISED by a
//! failed signing attempt is resumed from its stored data on the next request.

use tracing::{error, info, warn};

use super::{ClaimService, TicketResult};
use crate::crypto::address::is_eth_address;
use crate::error::ClaimError;
use crate::storage::{ClaimStatus, NewClaimTicket, StoreError};

/// Ticket data both issuance paths converge on.
struct StagedTicket {
    id: u64,
    eth_address: String,
    validator_id: u64,
    amount: u64,
    nonce: u64,
}

impl ClaimService {
    /// Issues a claim ticket, or resumes issuance of a staged one.
    ///
    /// # Arguments
    ///
    /// * `tx_hash` - Mainchain claim transaction hash
    /// * `sig_nonce` - Nonce the claimant signed together with the tx hash
    /// * `sig` - Claimant's typed-data signature over `{tx_hash, sig_nonce}`
    /// * `nonce` - Claim nonce requested for the claimant address
    /// * `existing_ticket_id` - Id of a staged (INITIALISED) ticket to resume
    ///
    /// # Returns
    ///
    /// * `Ok(TicketResult)` - Ticket issued and persisted
    /// * `Err(ClaimError)` - Validation, nonce, emission, store or signing failure
    pub async fn issue_ticket(
        &self,
        tx_hash: &str,
        sig_nonce: &str,
        sig: &str,
        nonce: u64,
        existing_ticket_id: Option<u64>,
    ) -> Result<TicketResult, ClaimError> {
        let staged = match existing_ticket_id {
            None => self.stage_ticket(tx_hash, sig_nonce, sig, nonce).await?,
            Some(id) => self.load_staged_ticket(id).await?,
        };

        if !is_eth_address(&staged.eth_address)
            || staged.validator_id == 0
            || staged.amount == 0
            || staged.nonce == 0
            || staged.id == 0
        {
            error!(
                "Claim ticket {} for tx {} failed its consistency check",
                staged.id, tx_hash
            );
            return Err(ClaimError::Unspecified("unknown error...".to_string()));
        }

        let ticket = self
            .signer
            .generate_signed_ticket(&staged.eth_address, staged.amount, staged.nonce)
            .await?;

        // The signature is deterministic over (address, amount, nonce): a hit
        // means another request already issued this ticket.
        if self
            .store
            .get_claim_ticket_by_signature(&ticket.signature)
            .await
            .map_err(ClaimError::query)?
            .is_some()
        {
            warn!("Ticket for claim ticket {} already generated", staged.id);
            return Err(ClaimError::DuplicateTicket);
        }

        let signature = ticket.signature.clone();
        self.store
            .update_claim_ticket_with_ticket(staged.id, ticket)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ClaimError::DuplicateTicket,
                other => ClaimError::Update(other.to_string()),
            })?;

        info!(
            "Claim ticket {} issued for {} (amount {}, nonce {})",
            staged.id, staged.eth_address, staged.amount, staged.nonce
        );
        self.ticket_success_body(
            Some(&signature),
            staged.amount,
            staged.nonce,
            &staged.eth_address,
            ClaimStatus::Issued,
            None,
        )
    }

    /// Builds the ticket result body. A claimed ticket is never handed out again,
    /// so its wrapped ticket is empty.
    pub(crate) fn ticket_success_body(
        &self,
        signature: Option<&str>,
        amount: u64,
        nonce: u64,
        eth_address: &str,
        status: ClaimStatus,
        eth_tx: Option<&str>,
    ) -> Result<TicketResult, ClaimError> {
        let claim_ticket = match (status, signature) {
            (ClaimStatus::Claimed, _) => String::new(),
            (_, Some(signature)) => self
                .tokens
                .sign_ticket(signature, amount, nonce, eth_address)?,
            (_, None) => {
                error!("Issued claim ticket for {} has no ticket data", eth_address);
                return Err(ClaimError::Unspecified(
                    "issued claim ticket has no ticket data".to_string(),
                ));
            }
        };

        Ok(TicketResult {
            claim_ticket,
            claim_status: status,
            eth_tx: eth_tx.unwrap_or_default().to_string(),
        })
    }

    /// Fresh path: validate the tx, enforce nonce ordering, bundle emissions
    /// and insert the INITIALISED row.
    async fn stage_ticket(
        &self,
        tx_hash: &str,
        sig_nonce: &str,
        sig: &str,
        nonce: u64,
    ) -> Result<StagedTicket, ClaimError> {
        let tx = self.mainchain.fetch_tx(tx_hash).await?;
        let claim = self.validator.validate_claim_tx(&tx, sig_nonce, sig).await?;

        // Only enforced once the address has claimed before
        if let Some(last) = self
            .store
            .get_last_nonce(&claim.eth_address)
            .await
            .map_err(ClaimError::query)?
        {
            let expected = last
                .checked_add(1)
                .ok_or(ClaimError::NonceExhausted { last })?;
            if nonce != expected {
                return Err(ClaimError::Nonce {
                    expected,
                    got: nonce,
                    last,
                });
            }
        }

        let emissions = self
            .store
            .get_unclaimed_emissions(claim.validator_id)
            .await
            .map_err(ClaimError::query)?;
        if emissions.is_empty() {
            return Err(ClaimError::NoEmissions);
        }

        let row = NewClaimTicket {
            mainchain_tx: tx_hash.to_string(),
            validator_id: claim.validator_id,
            eth_address: claim.eth_address.clone(),
            nonce,
            emission_ids: emissions.iter().map(|e| e.id).collect(),
        };
        let amount = row.amount();
        let id = self
            .store
            .insert_claim_ticket(row)
            .await
            .map_err(|e| ClaimError::Insert(e.to_string()))?;
        if id == 0 {
            return Err(ClaimError::Insert("error creating claim ticket".to_string()));
        }

        info!(
            "Staged claim ticket {} for tx {} ({} emissions, nonce {})",
            id, tx_hash, amount, nonce
        );
        Ok(StagedTicket {
            id,
            eth_address: claim.eth_address,
            validator_id: claim.validator_id,
            amount,
            nonce,
        })
    }

    /// Resume path: adopt the staged row's data without re-validating.
    async fn load_staged_ticket(&self, id: u64) -> Result<StagedTicket, ClaimError> {
        let ticket = self
            .store
            .get_claim_ticket_by_id(id)
            .await
            .map_err(ClaimError::query)?
            .ok_or_else(|| {
                error!("Staged claim ticket {} vanished", id);
                ClaimError::Unspecified("unknown error...".to_string())
            })?;

        info!("Resuming issuance of claim ticket {}", id);
        Ok(StagedTicket {
            id: ticket.id,
            eth_address: ticket.eth_address,
            validator_id: ticket.validator_id,
            amount: ticket.amount,
            nonce: ticket.nonce,
        })
    }
}
