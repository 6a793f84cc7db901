//! Shared test helpers for integration tests
//!
//! This module provides helper functions used by the integration tests.
//!
//! The module is organized into several categories:
//! - **Constants**: Dummy secrets, keys and addresses
//! - **Test Doubles**: Map-backed mainchain client and a ticket signer that can be made to fail
//! - **Harness**: A fully wired `ClaimService` over the in-memory store
//! - **Payload Builders**: Signed request tokens for the claim endpoints

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use emission_claims::config::Config;
use emission_claims::crypto::address::eth_address_from_key;
use emission_claims::crypto::{
    EcdsaTicketSigner, SignedTicket, TicketSigner, TokenService, TypedDataDomain,
};
use emission_claims::storage::{ClaimStore, MemoryStore, Validator};
use emission_claims::{ClaimError, ClaimService, MainchainClient, MainchainTx, MemoClaimValidator};

// ============================================================================
// CONSTANTS
// ============================================================================

// ------------------------------- SECRETS --------------------------------

/// Dummy JWT shared secret
pub const DUMMY_JWT_SECRET: &str = "test-shared-secret";

/// Dummy ticket signer key (secp256k1, hex)
pub const DUMMY_SIGNER_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Dummy claimant key (secp256k1, hex)
pub const DUMMY_CLAIMANT_KEY: &str =
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Dummy key of a party that does not own the claim (secp256k1, hex)
pub const DUMMY_INTRUDER_KEY: &str =
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

// ------------------------------ ADDRESSES -------------------------------

/// Dummy claim contract address
pub const DUMMY_CLAIM_CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

/// Dummy destination chain ID
pub const DUMMY_CHAIN_ID: u64 = 31337;

/// Dummy validator self-delegate address (bech32, "und" prefix)
pub const DUMMY_SELF_DELEGATE_ADDR: &str = "und1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5c8thq6";

/// Second registered self-delegate address (bech32, "und" prefix)
pub const DUMMY_SELF_DELEGATE_ADDR_2: &str = "und1z5tpwxqergd3c8g7ruszzg3rysjjvfeg0zlegv";

/// Dummy validator operator address
pub const DUMMY_OPERATOR_ADDR: &str = "undvaloper1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5n38uqu";

/// Valid bech32 address with a foreign prefix
pub const DUMMY_FOREIGN_PREFIX_ADDR: &str = "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu";

// ----------------------------- TRANSACTIONS -----------------------------

/// Dummy mainchain claim tx hash
pub const DUMMY_MAINCHAIN_TX: &str =
    "A1B2C3D4E5F60718293A4B5C6D7E8F90A1B2C3D4E5F60718293A4B5C6D7E8F90";

/// Dummy signature nonce signed together with the tx hash
pub const DUMMY_SIG_NONCE: &str = "7c1d4f0a";

/// Dummy destination-chain tx hash
pub const DUMMY_ETH_TX: &str =
    "0x00000000000000000000000000000000000000000000000000000000000000e1";

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Build a valid test configuration
pub fn build_test_config() -> Config {
    let mut config = Config::default();
    config.ethereum.chain_id = DUMMY_CHAIN_ID;
    config.ethereum.claim_contract_addr = DUMMY_CLAIM_CONTRACT.to_string();
    config
}

pub fn test_domain() -> TypedDataDomain {
    TypedDataDomain::new("xFUND", "1", DUMMY_CHAIN_ID, DUMMY_CLAIM_CONTRACT).unwrap()
}

pub fn key(hex_key: &str) -> SigningKey {
    SigningKey::from_slice(&hex::decode(hex_key).unwrap()).unwrap()
}

/// Checksummed Ethereum address of a hex key
pub fn address_of(hex_key: &str) -> String {
    eth_address_from_key(key(hex_key).verifying_key())
}

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Mainchain client serving transactions from a map.
#[derive(Default)]
pub struct MockMainchainClient {
    txs: RwLock<HashMap<String, MainchainTx>>,
}

impl MockMainchainClient {
    pub async fn add_tx(&self, tx: MainchainTx) {
        self.txs.write().await.insert(tx.hash.clone(), tx);
    }
}

#[async_trait]
impl MainchainClient for MockMainchainClient {
    async fn fetch_tx(&self, hash: &str) -> Result<MainchainTx, ClaimError> {
        self.txs
            .read()
            .await
            .get(hash)
            .cloned()
            .ok_or_else(|| ClaimError::Mainchain(format!("tx {} not found", hash)))
    }
}

/// Ticket signer that can be switched to fail, simulating an unavailable
/// signing service. Counts successful signatures.
pub struct ToggleSigner {
    inner: EcdsaTicketSigner,
    fail: AtomicBool,
    signed: AtomicUsize,
}

impl ToggleSigner {
    pub fn new() -> Self {
        Self {
            inner: EcdsaTicketSigner::new(DUMMY_SIGNER_KEY, DUMMY_CLAIM_CONTRACT).unwrap(),
            fail: AtomicBool::new(false),
            signed: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn signed_count(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketSigner for ToggleSigner {
    async fn generate_signed_ticket(
        &self,
        eth_address: &str,
        amount: u64,
        nonce: u64,
    ) -> Result<SignedTicket, ClaimError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClaimError::Unspecified("ticket signer unavailable".to_string()));
        }
        let ticket = self.inner.generate_signed_ticket(eth_address, amount, nonce).await?;
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(ticket)
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Fully wired claim service over the in-memory store with one registered
/// validator (`DUMMY_SELF_DELEGATE_ADDR`).
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub mainchain: Arc<MockMainchainClient>,
    pub signer: Arc<ToggleSigner>,
    pub tokens: TokenService,
    pub domain: TypedDataDomain,
    pub validator: Validator,
    pub service: Arc<ClaimService>,
}

pub async fn setup_harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let validator = store
        .add_validator("validator-1", DUMMY_OPERATOR_ADDR, DUMMY_SELF_DELEGATE_ADDR)
        .await;
    let tokens = TokenService::new(DUMMY_JWT_SECRET);
    let domain = test_domain();
    let mainchain = Arc::new(MockMainchainClient::default());
    let signer = Arc::new(ToggleSigner::new());
    let tx_validator = Arc::new(MemoClaimValidator::new(
        store.clone(),
        tokens.clone(),
        domain.clone(),
    ));

    let service = Arc::new(ClaimService::new(
        store.clone(),
        mainchain.clone(),
        tx_validator,
        signer.clone(),
        tokens.clone(),
        domain.clone(),
        "und",
    ));

    TestHarness {
        store,
        mainchain,
        signer,
        tokens,
        domain,
        validator,
        service,
    }
}

impl TestHarness {
    /// Records `count` unclaimed emissions for the harness validator.
    pub async fn add_emissions(&self, count: u64) {
        for height in 0..count {
            self.store.add_emission(self.validator.id, 100 + height).await;
        }
    }

    /// Requests a memo binding `eth_address` to the harness validator.
    pub async fn memo_for(&self, eth_address: &str) -> String {
        let payload = self.memo_payload(eth_address, DUMMY_SELF_DELEGATE_ADDR);
        self.service.process_memo(&payload).await.unwrap().memo
    }

    /// Publishes a successful claim tx carrying `memo`, sent by the validator.
    pub async fn publish_claim_tx(&self, tx_hash: &str, memo: &str) {
        self.mainchain
            .add_tx(MainchainTx {
                hash: tx_hash.to_string(),
                height: 1000,
                code: 0,
                memo: memo.to_string(),
                signer: DUMMY_SELF_DELEGATE_ADDR.to_string(),
            })
            .await;
    }

    /// Memo + tx + emissions for the dummy claimant: the state right before
    /// the claimant requests a ticket for `tx_hash`.
    pub async fn prepare_claim(&self, tx_hash: &str, emissions: u64) {
        self.add_emissions(emissions).await;
        let memo = self.memo_for(&address_of(DUMMY_CLAIMANT_KEY)).await;
        self.publish_claim_tx(tx_hash, &memo).await;
    }

    pub fn memo_payload(&self, eth_address: &str, self_delegate_address: &str) -> String {
        self.tokens
            .sign(&json!({
                "eth_address": eth_address,
                "self_delegate_address": self_delegate_address,
            }))
            .unwrap()
    }

    /// Ticket request for `tx_hash`, signed by `signer_key`.
    pub fn ticket_payload(&self, tx_hash: &str, nonce: u64, signer_key: &str) -> String {
        let sig = self
            .domain
            .sign_tx_data(&key(signer_key), tx_hash, DUMMY_SIG_NONCE)
            .unwrap();
        self.tokens
            .sign(&json!({
                "tx_hash": tx_hash,
                "nonce": nonce,
                "sig_nonce": DUMMY_SIG_NONCE,
                "sig": sig,
            }))
            .unwrap()
    }

    pub fn ethtx_payload(&self, mainchain_tx: &str, eth_address: &str, eth_tx: &str) -> String {
        self.tokens
            .sign(&json!({
                "mainchain_tx": mainchain_tx,
                "eth_address": eth_address,
                "eth_tx": eth_tx,
            }))
            .unwrap()
    }

    pub async fn ticket_count(&self) -> usize {
        self.store
            .list_claim_tickets(Default::default())
            .await
            .unwrap()
            .len()
    }
}
