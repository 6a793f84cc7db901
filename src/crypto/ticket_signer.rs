//! Claim ticket signing for the destination EVM chain.
//!
//! A claim ticket is an ECDSA signature over
//! `keccak256(abi.encodePacked(address claimant, uint256 amount, uint256 nonce, address claimContract))`
//! wrapped in the Ethereum signed message prefix. Signing is RFC 6979
//! deterministic, so the same (address, amount, nonce) always yields the same ticket.

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::address::{checksum_address_from_bytes, eth_address_from_key, parse_eth_address};
use super::keccak256;
use super::typed_data::uint256;
use crate::config::Config;
use crate::error::ClaimError;

/// Signed ticket payload persisted on an issued claim ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTicket {
    /// ECDSA signature (0x r || s || v, 65 bytes)
    pub signature: String,
    /// Claimant address (checksummed)
    pub eth_address: String,
    /// Number of bundled emissions
    pub amount: u64,
    pub nonce: u64,
    /// Claim contract the ticket is scoped to
    pub contract_address: String,
}

/// Destination-chain signing collaborator.
#[async_trait]
pub trait TicketSigner: Send + Sync {
    /// Produces the signed ticket for (eth_address, amount, nonce).
    async fn generate_signed_ticket(
        &self,
        eth_address: &str,
        amount: u64,
        nonce: u64,
    ) -> Result<SignedTicket, ClaimError>;
}

/// Ticket signer backed by a local secp256k1 key.
pub struct EcdsaTicketSigner {
    signing_key: SigningKey,
    claim_contract: [u8; 20],
}

impl EcdsaTicketSigner {
    /// Creates a signer from a hex-encoded secp256k1 private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_hex` - 32-byte private key, hex encoded (optional 0x prefix)
    /// * `claim_contract_addr` - Address of the claim contract tickets are scoped to
    pub fn new(private_key_hex: &str, claim_contract_addr: &str) -> anyhow::Result<Self> {
        let key_bytes = hex::decode(private_key_hex.trim().trim_start_matches("0x"))
            .map_err(|e| anyhow::anyhow!("Invalid signer key hex: {}", e))?;
        if key_bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid signer key length: expected 32 bytes, got {}",
                key_bytes.len()
            ));
        }
        let signing_key = SigningKey::from_slice(&key_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;
        let claim_contract = parse_eth_address(claim_contract_addr)
            .map_err(|e| anyhow::anyhow!("Invalid claim contract address: {}", e))?;

        Ok(Self {
            signing_key,
            claim_contract,
        })
    }

    /// Creates a signer with the key named by `ethereum.signer_key_env`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let key = config.ethereum.get_signer_key()?;
        let signer = Self::new(&key, &config.ethereum.claim_contract_addr)?;
        info!(
            "Ticket signer initialized for claim contract {} (signer {})",
            config.ethereum.claim_contract_addr,
            signer.signer_address()
        );
        Ok(signer)
    }

    /// Checksummed Ethereum address of the signer, to be registered in the claim contract.
    pub fn signer_address(&self) -> String {
        eth_address_from_key(self.signing_key.verifying_key())
    }

    /// Packed ticket message hash before the signed-message prefix is applied.
    pub fn ticket_message_hash(
        &self,
        eth_address: &[u8; 20],
        amount: u64,
        nonce: u64,
    ) -> [u8; 32] {
        let mut packed = Vec::with_capacity(20 + 32 + 32 + 20);
        packed.extend_from_slice(eth_address);
        packed.extend_from_slice(&uint256(amount));
        packed.extend_from_slice(&uint256(nonce));
        packed.extend_from_slice(&self.claim_contract);
        keccak256(&packed)
    }

    fn sign_ticket(
        &self,
        eth_address: &str,
        amount: u64,
        nonce: u64,
    ) -> Result<SignedTicket, ClaimError> {
        // An unusable claimant address here is a signer-side fault
        let claimant = parse_eth_address(eth_address).map_err(|e| {
            ClaimError::Unspecified(format!("cannot sign claim ticket for {}: {}", eth_address, e))
        })?;
        let message_hash = self.ticket_message_hash(&claimant, amount, nonce);
        let final_hash = eth_signed_message_hash(&message_hash);

        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&final_hash)
            .map_err(|e| ClaimError::Unspecified(format!("failed to sign claim ticket: {}", e)))?;

        let mut sig_bytes = Vec::with_capacity(65);
        sig_bytes.extend_from_slice(&signature.to_bytes());
        sig_bytes.push(recovery_id.to_byte() + 27);

        Ok(SignedTicket {
            signature: format!("0x{}", hex::encode(sig_bytes)),
            eth_address: checksum_address_from_bytes(&claimant),
            amount,
            nonce,
            contract_address: checksum_address_from_bytes(&self.claim_contract),
        })
    }
}

#[async_trait]
impl TicketSigner for EcdsaTicketSigner {
    async fn generate_signed_ticket(
        &self,
        eth_address: &str,
        amount: u64,
        nonce: u64,
    ) -> Result<SignedTicket, ClaimError> {
        let ticket = self.sign_ticket(eth_address, amount, nonce)?;
        info!(
            "Generated claim ticket for {} (amount {}, nonce {})",
            ticket.eth_address, amount, nonce
        );
        Ok(ticket)
    }
}

/// keccak256("\x19Ethereum Signed Message:\n32" || hash)
pub fn eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    let prefix = b"\x19Ethereum Signed Message:\n32";
    let mut prefixed = Vec::with_capacity(prefix.len() + 32);
    prefixed.extend_from_slice(prefix);
    prefixed.extend_from_slice(hash);
    keccak256(&prefixed)
}
