//! Read-only claim ticket listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ClaimService;
use crate::api::ApiResponse;
use crate::error::{ClaimError, StatusCode};
use crate::storage::{ClaimStatus, ClaimTicket, ClaimTicketFilter, Validator};

/// A claim ticket joined with its validator, as returned by the listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTicketView {
    pub moniker: String,
    pub operator_address: String,
    pub self_delegate_address: String,
    /// Wrapped ticket, present once issued
    pub claim_ticket: Option<String>,
    pub claim_status: ClaimStatus,
    pub mainchain_tx: String,
    pub ethereum_tx: Option<String>,
    pub created: DateTime<Utc>,
    pub amount: u64,
    pub nonce: u64,
    pub eth_address: String,
}

impl ClaimService {
    /// Lists claim tickets matching the filter.
    pub async fn list_claim_tickets(
        &self,
        filter: ClaimTicketFilter,
    ) -> Result<Vec<ClaimTicketView>, ClaimError> {
        let tickets = self
            .store
            .list_claim_tickets(filter)
            .await
            .map_err(|e| ClaimError::Query(e.to_string()))?;

        let mut validators: HashMap<u64, Validator> = HashMap::new();
        let mut views = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            if !validators.contains_key(&ticket.validator_id) {
                let validator = self
                    .store
                    .get_validator_by_id(ticket.validator_id)
                    .await
                    .map_err(|e| ClaimError::Query(e.to_string()))?
                    .ok_or_else(|| {
                        ClaimError::Query(format!(
                            "validator {} of claim ticket {} not found",
                            ticket.validator_id, ticket.id
                        ))
                    })?;
                validators.insert(ticket.validator_id, validator);
            }
            if let Some(validator) = validators.get(&ticket.validator_id) {
                views.push(self.view(validator, ticket)?);
            }
        }
        Ok(views)
    }

    /// Listing with an optional address and a status given by name.
    /// An unknown status name answers with a failed envelope.
    pub async fn list_by_status(
        &self,
        eth_address: Option<String>,
        status: &str,
    ) -> ApiResponse<Vec<ClaimTicketView>> {
        let status = match ClaimStatus::parse(status) {
            Some(status) => status,
            None => {
                return ApiResponse::failure(
                    StatusCode::DbQueryError,
                    "missing valid claim status",
                )
            }
        };
        ApiResponse::from_result(
            self.list_claim_tickets(ClaimTicketFilter {
                eth_address,
                status: Some(status),
                mainchain_tx: None,
            })
            .await,
        )
    }

    fn view(
        &self,
        validator: &Validator,
        ticket: ClaimTicket,
    ) -> Result<ClaimTicketView, ClaimError> {
        // Redeemed tickets are not handed out again
        let claim_ticket = match &ticket.ticket {
            Some(_) if ticket.status == ClaimStatus::Claimed => None,
            Some(signed) => Some(self.tokens.sign_ticket(
                &signed.signature,
                ticket.amount,
                ticket.nonce,
                &ticket.eth_address,
            )?),
            None => None,
        };

        Ok(ClaimTicketView {
            moniker: validator.moniker.clone(),
            operator_address: validator.operator_address.clone(),
            self_delegate_address: validator.self_delegate_address.clone(),
            claim_ticket,
            claim_status: ticket.status,
            mainchain_tx: ticket.mainchain_tx,
            ethereum_tx: ticket.ethereum_tx,
            created: ticket.created_at,
            amount: ticket.amount,
            nonce: ticket.nonce,
            eth_address: ticket.eth_address,
        })
    }
}
