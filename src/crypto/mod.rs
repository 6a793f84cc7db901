//! Cryptographic Operations Module
//!
//! This module handles the cryptographic operations of the emission claims service:
//! shared-secret token signing and verification, EIP-712 typed-data signature recovery,
//! Ethereum and bech32 address handling, and claim ticket signing.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: The JWT shared secret and the ticket signer key are loaded from the
//! environment and must never be exposed or logged. Memo keys are secrets as well.

pub mod address;
pub mod ticket_signer;
pub mod typed_data;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use tracing::info;

use crate::config::Config;
use crate::error::ClaimError;

pub use ticket_signer::{EcdsaTicketSigner, SignedTicket, TicketSigner};
pub use typed_data::TypedDataDomain;

type HmacSha256 = Hmac<Sha256>;

/// Only algorithm accepted for inbound tokens.
const JWT_ALGORITHM: &str = "HS256";

// ============================================================================
// TOKEN CLAIM STRUCTURES
// ============================================================================

/// Claims carried by a memo token.
///
/// A validator embeds this token as the memo of a mainchain claim transaction;
/// the memo key binds it to the validator's current memo key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoClaims {
    pub eth_address: String,
    pub self_delegate_address: String,
    pub memo_key: String,
}

/// Claims carried by a wrapped claim ticket handed back to the claimant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClaims {
    /// Signature redeemable on the claim contract
    pub ticket: String,
    pub amount: u64,
    pub nonce: u64,
    pub eth_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

// ============================================================================
// TOKEN SERVICE IMPLEMENTATION
// ============================================================================

/// Signs and verifies HS256 JSON Web Tokens with the shared secret.
///
/// Every inbound request payload is such a token, and the memo and claim
/// ticket artifacts handed back to clients are wrapped the same way.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a token service for the given shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Creates a token service with the shared secret named in the configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(TokenService)` - Secret loaded from the environment
    /// * `Err(anyhow::Error)` - Environment variable missing or empty
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let secret = config.claims.get_jwt_secret()?;
        if secret.is_empty() {
            return Err(anyhow::anyhow!(
                "Environment variable '{}' is empty",
                config.claims.jwt_secret_env
            ));
        }
        info!("Token service initialized with shared secret from environment");
        Ok(Self::new(secret))
    }

    fn mac(&self) -> Result<HmacSha256, ClaimError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ClaimError::Unspecified(format!("invalid shared secret: {}", e)))
    }

    /// Signs the claims, adding an `iat` timestamp when the claims are a JSON object.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, ClaimError> {
        let mut payload = serde_json::to_value(claims)
            .map_err(|e| ClaimError::Unspecified(format!("failed to encode token claims: {}", e)))?;
        if let serde_json::Value::Object(map) = &mut payload {
            map.entry("iat")
                .or_insert_with(|| serde_json::json!(chrono::Utc::now().timestamp()));
        }

        let header = serde_json::to_vec(&JwtHeader {
            alg: JWT_ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        })
        .map_err(|e| ClaimError::Unspecified(format!("failed to encode token header: {}", e)))?;
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ClaimError::Unspecified(format!("failed to encode token claims: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(body)
        );
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verifies a token and decodes its claims.
    ///
    /// Fails with `ClaimError::Auth` when the token is malformed, uses another
    /// algorithm, carries a bad signature, is expired (`exp`) or not yet
    /// active (`nbf`), or its claims do not match `T`.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, ClaimError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(ClaimError::Auth("jwt malformed".to_string()));
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(parts[0])
            .map_err(|_| ClaimError::Auth("jwt malformed".to_string()))?;
        let header: JwtHeader = serde_json::from_slice(&header_bytes)
            .map_err(|_| ClaimError::Auth("jwt malformed".to_string()))?;
        if header.alg != JWT_ALGORITHM {
            return Err(ClaimError::Auth("invalid algorithm".to_string()));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| ClaimError::Auth("invalid signature".to_string()))?;
        let mut mac = self.mac()?;
        mac.update(parts[0].as_bytes());
        mac.update(b".");
        mac.update(parts[1].as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| ClaimError::Auth("invalid signature".to_string()))?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| ClaimError::Auth("jwt malformed".to_string()))?;
        let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
            .map_err(|_| ClaimError::Auth("jwt malformed".to_string()))?;

        let now = chrono::Utc::now().timestamp();
        if let Some(exp) = payload.get("exp").and_then(|v| v.as_i64()) {
            if exp <= now {
                return Err(ClaimError::Auth("jwt expired".to_string()));
            }
        }
        if let Some(nbf) = payload.get("nbf").and_then(|v| v.as_i64()) {
            if nbf > now {
                return Err(ClaimError::Auth("jwt not active".to_string()));
            }
        }

        serde_json::from_value(payload)
            .map_err(|e| ClaimError::Auth(format!("invalid token payload: {}", e)))
    }

    /// Wraps a memo binding an Ethereum address to a validator's memo key.
    pub fn sign_memo(
        &self,
        eth_address: &str,
        self_delegate_address: &str,
        memo_key: &str,
    ) -> Result<String, ClaimError> {
        self.sign(&MemoClaims {
            eth_address: eth_address.to_string(),
            self_delegate_address: self_delegate_address.to_string(),
            memo_key: memo_key.to_string(),
        })
    }

    /// Wraps an issued ticket signature for hand-over to the claimant.
    pub fn sign_ticket(
        &self,
        signature: &str,
        amount: u64,
        nonce: u64,
        eth_address: &str,
    ) -> Result<String, ClaimError> {
        self.sign(&TicketClaims {
            ticket: signature.to_string(),
            amount,
            nonce,
            eth_address: eth_address.to_string(),
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Generates a fresh, unpredictable memo key (32 random bytes, hex encoded).
pub fn generate_memo_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
