//! Key Generation Utility
//!
//! This binary generates the secrets the emission claims service needs:
//! a secp256k1 ticket signer key and a JWT shared secret.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_keys
//! ```
//!
//! ## Output
//!
//! - Ticket signer private key (hex) - export as `EMISSION_CLAIMS_SIGNER_KEY`
//! - Ticket signer Ethereum address - register it in the claim contract
//! - JWT shared secret (hex) - export as `EMISSION_CLAIMS_JWT_SECRET`

use k256::ecdsa::SigningKey;
use rand::RngCore;

use emission_claims::crypto::address::eth_address_from_key;

fn main() {
    let mut rng = rand::rngs::OsRng;

    // Retry in the negligible case the bytes are not a valid scalar
    let signing_key = loop {
        let mut secret_key_bytes = [0u8; 32];
        rng.fill_bytes(&mut secret_key_bytes);
        if let Ok(key) = SigningKey::from_slice(&secret_key_bytes) {
            break key;
        }
    };
    let eth_address = eth_address_from_key(signing_key.verifying_key());

    let mut jwt_secret = [0u8; 32];
    rng.fill_bytes(&mut jwt_secret);

    println!("Generated Emission Claims Secrets:");
    println!("Ticket Signer Key (hex): {}", hex::encode(signing_key.to_bytes()));
    println!("Ticket Signer Address: {}", eth_address);
    println!("JWT Shared Secret (hex): {}", hex::encode(jwt_secret));
    println!();
    println!("Export the key and secret in the environment variables named in config/emission-claims.toml.");
}
