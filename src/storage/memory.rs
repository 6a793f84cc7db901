//! In-Memory Claim Store
//!
//! This module provides an in-memory implementation of `ClaimStore`. All state
//! lives behind a single `RwLock`; every conditional write re-validates its
//! preconditions while holding the write guard.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    ClaimStatus, ClaimStore, ClaimTicket, ClaimTicketFilter, Emission, MemoKey, NewClaimTicket,
    StoreError, Validator,
};
use crate::crypto::SignedTicket;

#[derive(Default)]
struct State {
    next_ticket_id: u64,
    next_emission_id: u64,
    next_validator_id: u64,
    tickets: BTreeMap<u64, ClaimTicket>,
    emissions: BTreeMap<u64, Emission>,
    validators: BTreeMap<u64, Validator>,
    memo_keys: HashMap<u64, MemoKey>,
}

impl State {
    fn last_nonce(&self, eth_address: &str) -> Option<u64> {
        self.tickets
            .values()
            .filter(|t| t.eth_address.eq_ignore_ascii_case(eth_address))
            .map(|t| t.nonce)
            .max()
    }
}

/// In-memory storage for claim tickets, emissions, validators and memo keys.
///
/// Uses ordered maps so listings come back in insertion (id) order.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator.
    pub async fn add_validator(
        &self,
        moniker: &str,
        operator_address: &str,
        self_delegate_address: &str,
    ) -> Validator {
        let mut state = self.state.write().await;
        state.next_validator_id += 1;
        let validator = Validator {
            id: state.next_validator_id,
            moniker: moniker.to_string(),
            operator_address: operator_address.to_string(),
            self_delegate_address: self_delegate_address.to_string(),
        };
        state.validators.insert(validator.id, validator.clone());
        validator
    }

    /// Records an unclaimed emission for a validator.
    pub async fn add_emission(&self, validator_id: u64, height: u64) -> Emission {
        let mut state = self.state.write().await;
        state.next_emission_id += 1;
        let emission = Emission {
            id: state.next_emission_id,
            validator_id,
            height,
            claim_ticket_id: None,
        };
        state.emissions.insert(emission.id, emission.clone());
        emission
    }
}

#[async_trait]
impl ClaimStore for MemoryStore {
    async fn get_claim_ticket_by_id(&self, id: u64) -> Result<Option<ClaimTicket>, StoreError> {
        let state = self.state.read().await;
        Ok(state.tickets.get(&id).cloned())
    }

    async fn get_claim_ticket_by_mainchain_tx(
        &self,
        mainchain_tx: &str,
    ) -> Result<Option<ClaimTicket>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .values()
            .find(|t| t.mainchain_tx == mainchain_tx)
            .cloned())
    }

    async fn get_claim_ticket_by_signature(
        &self,
        signature: &str,
    ) -> Result<Option<ClaimTicket>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .values()
            .find(|t| t.ticket.as_ref().map(|s| s.signature.as_str()) == Some(signature))
            .cloned())
    }

    async fn get_claim_ticket_by_mainchain_tx_and_eth_address(
        &self,
        mainchain_tx: &str,
        eth_address: &str,
    ) -> Result<Option<ClaimTicket>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .values()
            .find(|t| {
                t.mainchain_tx == mainchain_tx && t.eth_address.eq_ignore_ascii_case(eth_address)
            })
            .cloned())
    }

    async fn get_last_nonce(&self, eth_address: &str) -> Result<Option<u64>, StoreError> {
        let state = self.state.read().await;
        Ok(state.last_nonce(eth_address))
    }

    async fn insert_claim_ticket(&self, ticket: NewClaimTicket) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;

        if state
            .tickets
            .values()
            .any(|t| t.mainchain_tx == ticket.mainchain_tx)
        {
            return Err(StoreError::Conflict(format!(
                "claim ticket already exists for mainchain tx {}",
                ticket.mainchain_tx
            )));
        }

        if let Some(last) = state.last_nonce(&ticket.eth_address) {
            if last.checked_add(1) != Some(ticket.nonce) {
                return Err(StoreError::Conflict(format!(
                    "nonce {} does not follow last nonce {} for {}",
                    ticket.nonce, last, ticket.eth_address
                )));
            }
        }

        if ticket.emission_ids.is_empty() {
            return Err(StoreError::Conflict("no emissions to bundle".to_string()));
        }
        for emission_id in &ticket.emission_ids {
            match state.emissions.get(emission_id) {
                Some(e)
                    if e.validator_id == ticket.validator_id && e.claim_ticket_id.is_none() => {}
                Some(e) if e.claim_ticket_id.is_some() => {
                    return Err(StoreError::Conflict(format!(
                        "emission {} already bundled into claim ticket {}",
                        emission_id,
                        e.claim_ticket_id.unwrap_or_default()
                    )));
                }
                _ => {
                    return Err(StoreError::Conflict(format!(
                        "emission {} is not an emission of validator {}",
                        emission_id, ticket.validator_id
                    )));
                }
            }
        }

        state.next_ticket_id += 1;
        let id = state.next_ticket_id;
        for emission_id in &ticket.emission_ids {
            if let Some(e) = state.emissions.get_mut(emission_id) {
                e.claim_ticket_id = Some(id);
            }
        }

        let amount = ticket.amount();
        state.tickets.insert(
            id,
            ClaimTicket {
                id,
                mainchain_tx: ticket.mainchain_tx,
                validator_id: ticket.validator_id,
                eth_address: ticket.eth_address,
                amount,
                nonce: ticket.nonce,
                status: ClaimStatus::Initialised,
                ticket: None,
                ethereum_tx: None,
                emission_ids: ticket.emission_ids,
                created_at: chrono::Utc::now(),
            },
        );
        debug!("Staged claim ticket {}", id);
        Ok(id)
    }

    async fn update_claim_ticket_with_ticket(
        &self,
        id: u64,
        ticket: SignedTicket,
    ) -> Result<ClaimTicket, StoreError> {
        let mut state = self.state.write().await;

        if state.tickets.values().any(|t| {
            t.id != id && t.ticket.as_ref().map(|s| &s.signature) == Some(&ticket.signature)
        }) {
            return Err(StoreError::Conflict(
                "ticket signature already recorded on another claim ticket".to_string(),
            ));
        }

        let row = state
            .tickets
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("claim ticket {}", id)))?;
        if row.status != ClaimStatus::Initialised {
            return Err(StoreError::Conflict(format!(
                "claim ticket {} is {}, expected initialised",
                id,
                row.status.as_str()
            )));
        }

        row.ticket = Some(ticket);
        row.status = ClaimStatus::Issued;
        Ok(row.clone())
    }

    async fn update_claim_ticket_with_eth_tx(
        &self,
        id: u64,
        ethereum_tx: &str,
    ) -> Result<ClaimTicket, StoreError> {
        let mut state = self.state.write().await;
        let row = state
            .tickets
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("claim ticket {}", id)))?;

        match row.status {
            ClaimStatus::Issued => {
                row.ethereum_tx = Some(ethereum_tx.to_string());
                row.status = ClaimStatus::Claimed;
                Ok(row.clone())
            }
            ClaimStatus::Claimed if row.ethereum_tx.as_deref() == Some(ethereum_tx) => {
                Ok(row.clone())
            }
            ClaimStatus::Claimed => Err(StoreError::Conflict(format!(
                "claim ticket {} already claimed in another transaction",
                id
            ))),
            ClaimStatus::Initialised => Err(StoreError::Conflict(format!(
                "claim ticket {} has not been issued",
                id
            ))),
        }
    }

    async fn list_claim_tickets(
        &self,
        filter: ClaimTicketFilter,
    ) -> Result<Vec<ClaimTicket>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .values()
            .filter(|t| {
                filter
                    .eth_address
                    .as_deref()
                    .map_or(true, |a| t.eth_address.eq_ignore_ascii_case(a))
                    && filter.status.map_or(true, |s| t.status == s)
                    && filter
                        .mainchain_tx
                        .as_deref()
                        .map_or(true, |tx| t.mainchain_tx == tx)
            })
            .cloned()
            .collect())
    }

    async fn get_unclaimed_emissions(
        &self,
        validator_id: u64,
    ) -> Result<Vec<Emission>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .emissions
            .values()
            .filter(|e| e.validator_id == validator_id && e.claim_ticket_id.is_none())
            .cloned()
            .collect())
    }

    async fn get_validator_by_id(&self, id: u64) -> Result<Option<Validator>, StoreError> {
        let state = self.state.read().await;
        Ok(state.validators.get(&id).cloned())
    }

    async fn get_validator_by_self_delegate_address(
        &self,
        self_delegate_address: &str,
    ) -> Result<Option<Validator>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .validators
            .values()
            .find(|v| v.self_delegate_address == self_delegate_address)
            .cloned())
    }

    async fn get_memo_key(&self, validator_id: u64) -> Result<Option<MemoKey>, StoreError> {
        let state = self.state.read().await;
        Ok(state.memo_keys.get(&validator_id).cloned())
    }

    async fn create_memo_key(
        &self,
        validator_id: u64,
        memo_key: &str,
    ) -> Result<MemoKey, StoreError> {
        let mut state = self.state.write().await;
        if !state.validators.contains_key(&validator_id) {
            return Err(StoreError::NotFound(format!("validator {}", validator_id)));
        }
        let entry = state
            .memo_keys
            .entry(validator_id)
            .or_insert_with(|| MemoKey {
                validator_id,
                memo_key: memo_key.to_string(),
                updated_at: chrono::Utc::now(),
            });
        Ok(entry.clone())
    }

    async fn rotate_memo_key(
        &self,
        validator_id: u64,
        memo_key: &str,
    ) -> Result<MemoKey, StoreError> {
        let mut state = self.state.write().await;
        if !state.validators.contains_key(&validator_id) {
            return Err(StoreError::NotFound(format!("validator {}", validator_id)));
        }
        let key = MemoKey {
            validator_id,
            memo_key: memo_key.to_string(),
            updated_at: chrono::Utc::now(),
        };
        state.memo_keys.insert(validator_id, key.clone());
        Ok(key)
    }
}
