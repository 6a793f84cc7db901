//! Address handling for Ethereum (EIP-55) and mainchain (bech32) accounts.
//!
//! Ethereum addresses are compared in checksummed form everywhere; raw string
//! comparison is case-sensitive and would treat the same account as two owners.

use bech32::Variant;
use k256::ecdsa::VerifyingKey;

use super::keccak256;
use crate::error::ClaimError;

/// Returns true for `0x` followed by 40 hex digits. All-lowercase and
/// all-uppercase forms are accepted as is; mixed case must be a valid EIP-55 checksum.
pub fn is_eth_address(address: &str) -> bool {
    let hex_part = match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(rest) => rest,
        None => return false,
    };
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    checksum_hex(hex_part) == hex_part
}

/// Parses an Ethereum address into its 20 raw bytes.
pub fn parse_eth_address(address: &str) -> Result<[u8; 20], ClaimError> {
    if !is_eth_address(address) {
        return Err(ClaimError::Auth(format!("invalid ethereum address: {}", address)));
    }
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(&address[2..], &mut bytes)
        .map_err(|_| ClaimError::Auth(format!("invalid ethereum address: {}", address)))?;
    Ok(bytes)
}

/// Converts a well-formed Ethereum address to its EIP-55 checksummed form.
pub fn to_checksum_address(address: &str) -> Result<String, ClaimError> {
    if !is_eth_address(address) {
        return Err(ClaimError::Auth(format!("invalid ethereum address: {}", address)));
    }
    Ok(format!("0x{}", checksum_hex(&address[2..])))
}

/// Checksummed address of raw address bytes.
pub fn checksum_address_from_bytes(bytes: &[u8; 20]) -> String {
    format!("0x{}", checksum_hex(&hex::encode(bytes)))
}

/// Checksummed Ethereum address of a secp256k1 public key:
/// keccak256(uncompressed_public_key)[12:32].
pub fn eth_address_from_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 prefix, hash the 64 bytes of x || y
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..32]);
    checksum_address_from_bytes(&bytes)
}

/// Compares two Ethereum addresses in checksummed form.
/// Malformed input never matches.
pub fn same_eth_address(a: &str, b: &str) -> bool {
    match (to_checksum_address(a), to_checksum_address(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Returns true if `address` is a valid bech32 (not bech32m) string with the given prefix.
pub fn check_bech32_address(address: &str, prefix: &str) -> bool {
    match bech32::decode(address) {
        Ok((hrp, data, Variant::Bech32)) => hrp == prefix && !data.is_empty(),
        _ => false,
    }
}

fn checksum_hex(hex_part: &str) -> String {
    let lower = hex_part.to_ascii_lowercase();
    let hash = keccak256(lower.as_bytes());

    lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}
