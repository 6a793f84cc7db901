//! EIP-712 typed-data signatures over claim requests.
//!
//! A claimant authorizes a claim by signing `TxData { tx_hash, sig_nonce }`
//! under a fixed domain (name, version, chain id, verifying contract). The
//! signer address is recovered from the signature and the canonical digest:
//!
//! `keccak256(0x19 || 0x01 || domainSeparator || hashStruct(TxData))`

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};

use super::address::{eth_address_from_key, parse_eth_address};
use super::keccak256;
use crate::config::Config;
use crate::error::ClaimError;

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const TX_DATA_TYPE: &str = "TxData(string tx_hash,string sig_nonce)";

/// Fixed EIP-712 domain of claim request signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: [u8; 20],
}

impl TypedDataDomain {
    /// Creates a domain, validating the verifying contract address.
    pub fn new(
        name: &str,
        version: &str,
        chain_id: u64,
        verifying_contract: &str,
    ) -> Result<Self, ClaimError> {
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            chain_id,
            verifying_contract: parse_eth_address(verifying_contract)?,
        })
    }

    /// Builds the domain from the claims and ethereum configuration sections.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.claims.sig_domain_name,
            &config.claims.sig_domain_version,
            config.ethereum.chain_id,
            &config.ethereum.claim_contract_addr,
        )
        .map_err(|e| anyhow::anyhow!("Invalid typed-data domain: {}", e))
    }

    /// hashStruct(EIP712Domain)
    pub fn separator(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 5);
        encoded.extend_from_slice(&keccak256(EIP712_DOMAIN_TYPE.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.name.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.version.as_bytes()));
        encoded.extend_from_slice(&uint256(self.chain_id));
        encoded.extend_from_slice(&address_word(&self.verifying_contract));
        keccak256(&encoded)
    }

    /// Digest a wallet signs for `TxData { tx_hash, sig_nonce }`.
    pub fn tx_data_digest(&self, tx_hash: &str, sig_nonce: &str) -> [u8; 32] {
        let mut struct_encoded = Vec::with_capacity(32 * 3);
        struct_encoded.extend_from_slice(&keccak256(TX_DATA_TYPE.as_bytes()));
        struct_encoded.extend_from_slice(&keccak256(tx_hash.as_bytes()));
        struct_encoded.extend_from_slice(&keccak256(sig_nonce.as_bytes()));
        let struct_hash = keccak256(&struct_encoded);

        let mut message = Vec::with_capacity(2 + 64);
        message.extend_from_slice(&[0x19, 0x01]);
        message.extend_from_slice(&self.separator());
        message.extend_from_slice(&struct_hash);
        keccak256(&message)
    }

    /// Recovers the checksummed address that signed `TxData { tx_hash, sig_nonce }`.
    ///
    /// Accepts 65-byte `r || s || v` signatures (hex, optional 0x prefix) with
    /// `v` in {0, 1, 27, 28}. High-s signatures are normalised before recovery.
    pub fn recover_tx_data_signer(
        &self,
        tx_hash: &str,
        sig_nonce: &str,
        signature: &str,
    ) -> Result<String, ClaimError> {
        let bytes = hex::decode(signature.strip_prefix("0x").unwrap_or(signature))
            .map_err(|e| ClaimError::Signature(format!("invalid hex: {}", e)))?;
        if bytes.len() != 65 {
            return Err(ClaimError::Signature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let v = bytes[64];
        let v = if v >= 27 { v - 27 } else { v };
        let mut recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| ClaimError::Signature(format!("invalid recovery id {}", bytes[64])))?;
        let mut sig = EcdsaSignature::from_slice(&bytes[..64])
            .map_err(|e| ClaimError::Signature(e.to_string()))?;
        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let digest = self.tx_data_digest(tx_hash, sig_nonce);
        let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
            .map_err(|e| ClaimError::Signature(e.to_string()))?;
        Ok(eth_address_from_key(&key))
    }

    /// Signs `TxData { tx_hash, sig_nonce }` the way a wallet would
    /// (`eth_signTypedData`), returning `0x` r || s || v with v = 27/28.
    pub fn sign_tx_data(
        &self,
        key: &SigningKey,
        tx_hash: &str,
        sig_nonce: &str,
    ) -> Result<String, ClaimError> {
        let digest = self.tx_data_digest(tx_hash, sig_nonce);
        let (sig, recovery_id) = key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| ClaimError::Signature(e.to_string()))?;

        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&sig.to_bytes());
        bytes.push(recovery_id.to_byte() + 27);
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

/// Big-endian uint256 encoding of a u64.
pub(crate) fn uint256(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-padded 32-byte ABI word of an address.
fn address_word(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}
