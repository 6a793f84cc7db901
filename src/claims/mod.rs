//! Claim Lifecycle Module
//!
//! This module implements the claim ticket lifecycle: binding an Ethereum
//! address to a validator through a memo, issuing a signed claim ticket for a
//! validated mainchain transaction, and finalizing the claim once the ticket has
//! been redeemed on the destination chain.
//!
//! ```text
//! INITIALISED --sign--> ISSUED --eth tx--> CLAIMED
//!      ^                  |                   |
//!      +-- resume         +-- idempotent      +-- idempotent (empty ticket)
//! ```
//!
//! Every externally invoked operation takes a single signed token and returns
//! the uniform `ApiResponse` envelope; failures never escape as errors.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: Every request on an existing claim ticket re-authenticates the
//! caller against the ticket's original Ethereum address. Existence of a ticket
//! is keyed by a public mainchain transaction hash only.

mod dispatcher;
mod finalize;
mod issuer;
mod memo;
mod query;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::ApiResponse;
use crate::config::Config;
use crate::crypto::{EcdsaTicketSigner, TicketSigner, TokenService, TypedDataDomain};
use crate::error::ClaimError;
use crate::mainchain_client::{MainchainClient, RestMainchainClient};
use crate::storage::{ClaimStatus, ClaimStore};
use crate::validator::{ClaimTxValidator, MemoClaimValidator};

pub use query::ClaimTicketView;

// ============================================================================
// REQUEST PAYLOADS
// ============================================================================

/// Claims of a memo request token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoRequest {
    #[serde(default)]
    pub eth_address: Option<String>,
    #[serde(default)]
    pub self_delegate_address: Option<String>,
}

/// Claims of a ticket request token.
///
/// `nonce` and `sig_nonce` are accepted as numbers or strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketRequest {
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub nonce: serde_json::Value,
    #[serde(default)]
    pub sig_nonce: serde_json::Value,
    #[serde(default)]
    pub sig: String,
}

/// Claims of a finalization token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EthTxRequest {
    #[serde(default)]
    pub mainchain_tx: String,
    #[serde(default)]
    pub eth_address: String,
    #[serde(default)]
    pub eth_tx: String,
}

// ============================================================================
// RESULT BODIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoResult {
    /// Memo token to embed in the mainchain claim transaction
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResult {
    /// Wrapped claim ticket; empty once the ticket has been claimed
    pub claim_ticket: String,
    pub claim_status: ClaimStatus,
    /// Destination-chain transaction, empty until finalized
    pub eth_tx: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeResult {
    pub mainchain_tx: String,
    pub eth_tx: String,
    pub claim_status: ClaimStatus,
}

// ============================================================================
// CLAIM SERVICE
// ============================================================================

/// Claim ticket issuance engine.
///
/// Holds no per-request state; the store is the only shared mutable resource.
pub struct ClaimService {
    store: Arc<dyn ClaimStore>,
    mainchain: Arc<dyn MainchainClient>,
    validator: Arc<dyn ClaimTxValidator>,
    signer: Arc<dyn TicketSigner>,
    tokens: TokenService,
    domain: TypedDataDomain,
    bech32_prefix: String,
}

impl ClaimService {
    /// Creates a claim service from its collaborators.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistent store of tickets, emissions, validators and memo keys
    /// * `mainchain` - Source of mainchain transactions
    /// * `validator` - Claim transaction validator
    /// * `signer` - Destination-chain ticket signer
    /// * `tokens` - Shared-secret token service
    /// * `domain` - Typed-data domain of claimant signatures
    /// * `bech32_prefix` - Expected prefix of mainchain account addresses
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ClaimStore>,
        mainchain: Arc<dyn MainchainClient>,
        validator: Arc<dyn ClaimTxValidator>,
        signer: Arc<dyn TicketSigner>,
        tokens: TokenService,
        domain: TypedDataDomain,
        bech32_prefix: &str,
    ) -> Self {
        Self {
            store,
            mainchain,
            validator,
            signer,
            tokens,
            domain,
            bech32_prefix: bech32_prefix.to_string(),
        }
    }

    /// Wires the production collaborators from configuration.
    ///
    /// Secrets (JWT shared secret, ticket signer key) are read from the
    /// environment variables the configuration names.
    ///
    /// # Returns
    ///
    /// * `Ok(ClaimService)` - Service ready to handle requests
    /// * `Err(anyhow::Error)` - A secret is missing or a collaborator failed to initialize
    pub fn from_config(config: &Config, store: Arc<dyn ClaimStore>) -> anyhow::Result<Self> {
        let tokens = TokenService::from_config(config)?;
        let domain = TypedDataDomain::from_config(config)?;
        let signer = EcdsaTicketSigner::from_config(config)?;
        let mainchain = RestMainchainClient::new(
            &config.mainchain.rest_url,
            config.mainchain.request_timeout_ms,
        )?;
        let validator = MemoClaimValidator::new(store.clone(), tokens.clone(), domain.clone());

        info!(
            "Claim service initialized (mainchain {}, destination {} chain id {})",
            config.mainchain.name, config.ethereum.name, config.ethereum.chain_id
        );

        Ok(Self::new(
            store,
            Arc::new(mainchain),
            Arc::new(validator),
            Arc::new(signer),
            tokens,
            domain,
            &config.mainchain.bech32_prefix,
        ))
    }

    /// Submit-memo-request: issues a memo token for a validator.
    pub async fn submit_memo_request(&self, payload: &str) -> ApiResponse<MemoResult> {
        respond("memo", self.process_memo(payload).await)
    }

    /// Submit-ticket-request: issues, resumes or replays a claim ticket.
    pub async fn submit_ticket_request(&self, payload: &str) -> ApiResponse<TicketResult> {
        respond("ticket", self.process_ticket(payload).await)
    }

    /// Submit-finalization: records the destination-chain tx of a claim ticket.
    pub async fn submit_finalization(&self, payload: &str) -> ApiResponse<FinalizeResult> {
        respond("ethtx", self.process_eth_tx(payload).await)
    }
}

/// Converts an operation outcome into the envelope, logging failures.
/// Invariant violations are logged at error level.
fn respond<T>(operation: &str, result: Result<T, ClaimError>) -> ApiResponse<T> {
    match &result {
        Ok(_) => info!("Claim {} request succeeded", operation),
        Err(e @ ClaimError::Unspecified(_)) => {
            error!("Claim {} request hit an invariant violation: {}", operation, e)
        }
        Err(e) => warn!(
            "Claim {} request failed ({}): {}",
            operation,
            e.status().description(),
            e
        ),
    }
    ApiResponse::from_result(result)
}
