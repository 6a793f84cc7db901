//! Unit tests for token verification and typed-data signature recovery
//!
//! These tests verify the authenticity checks every inbound claim request
//! goes through.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::json;

use emission_claims::crypto::address::{check_bech32_address, to_checksum_address};
use emission_claims::crypto::{MemoClaims, TicketClaims, TokenService};
use emission_claims::ClaimError;

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    address_of, key, test_domain, DUMMY_CLAIMANT_KEY, DUMMY_FOREIGN_PREFIX_ADDR,
    DUMMY_JWT_SECRET, DUMMY_MAINCHAIN_TX, DUMMY_SELF_DELEGATE_ADDR, DUMMY_SIG_NONCE,
};

fn auth_message(err: ClaimError) -> String {
    match err {
        ClaimError::Auth(msg) => msg,
        other => panic!("expected auth error, got {:?}", other),
    }
}

// ============================================================================
// TOKEN TESTS
// ============================================================================

/// Test that a signed memo verifies with the same secret
/// Why: Memos handed out must be accepted back when embedded in a claim tx
#[test]
fn test_memo_token_verifies() {
    let tokens = TokenService::new(DUMMY_JWT_SECRET);
    let token = tokens
        .sign_memo("0xabc", DUMMY_SELF_DELEGATE_ADDR, "memo-key")
        .unwrap();

    let claims: MemoClaims = tokens.verify(&token).unwrap();
    assert_eq!(claims.eth_address, "0xabc");
    assert_eq!(claims.self_delegate_address, DUMMY_SELF_DELEGATE_ADDR);
    assert_eq!(claims.memo_key, "memo-key");
}

/// Test that a wrapped ticket carries the ticket fields
/// Why: Claimants submit these fields to the claim contract
#[test]
fn test_ticket_token_fields() {
    let tokens = TokenService::new(DUMMY_JWT_SECRET);
    let token = tokens.sign_ticket("0xsig", 3, 1, "0xabc").unwrap();
    let claims: TicketClaims = tokens.verify(&token).unwrap();
    assert_eq!(claims.ticket, "0xsig");
    assert_eq!(claims.amount, 3);
    assert_eq!(claims.nonce, 1);
}

/// Test that tokens signed with another secret are rejected
/// What is tested: HMAC verification
/// Why: Only the service's own clients hold the shared secret
#[test]
fn test_token_wrong_secret_rejected() {
    let token = TokenService::new("other-secret")
        .sign(&json!({"tx_hash": "AB"}))
        .unwrap();
    let err = TokenService::new(DUMMY_JWT_SECRET)
        .verify::<serde_json::Value>(&token)
        .unwrap_err();
    assert_eq!(auth_message(err), "invalid signature");
}

/// Test that expired tokens are rejected
/// Why: exp must be honoured like any JWT library does
#[test]
fn test_token_expired_rejected() {
    let tokens = TokenService::new(DUMMY_JWT_SECRET);
    let past = chrono::Utc::now().timestamp() - 60;
    let token = tokens.sign(&json!({"tx_hash": "AB", "exp": past})).unwrap();
    let err = tokens.verify::<serde_json::Value>(&token).unwrap_err();
    assert_eq!(auth_message(err), "jwt expired");

    let future = chrono::Utc::now().timestamp() + 600;
    let token = tokens.sign(&json!({"tx_hash": "AB", "exp": future})).unwrap();
    assert!(tokens.verify::<serde_json::Value>(&token).is_ok());
}

/// Test that tokens not yet active are rejected
#[test]
fn test_token_not_before_rejected() {
    let tokens = TokenService::new(DUMMY_JWT_SECRET);
    let future = chrono::Utc::now().timestamp() + 600;
    let token = tokens.sign(&json!({"nbf": future})).unwrap();
    let err = tokens.verify::<serde_json::Value>(&token).unwrap_err();
    assert_eq!(auth_message(err), "jwt not active");
}

/// Test that unsigned ("alg": "none") tokens are rejected
/// What is tested: Algorithm pinning to HS256
/// Why: Accepting alg=none would bypass authentication entirely
#[test]
fn test_token_alg_none_rejected() {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(br#"{"tx_hash":"AB"}"#);
    let token = format!("{}.{}.", header, body);

    let err = TokenService::new(DUMMY_JWT_SECRET)
        .verify::<serde_json::Value>(&token)
        .unwrap_err();
    assert_eq!(auth_message(err), "invalid algorithm");
}

/// Test that garbage is reported as malformed
#[test]
fn test_token_malformed() {
    let tokens = TokenService::new(DUMMY_JWT_SECRET);
    for token in ["", "abc", "a.b", "!!.??.##"] {
        let err = tokens.verify::<serde_json::Value>(token).unwrap_err();
        assert_eq!(auth_message(err), "jwt malformed", "token {:?}", token);
    }
}

// ============================================================================
// TYPED-DATA SIGNATURE TESTS
// ============================================================================

/// Test that the signer of TxData is recovered in checksummed form
/// What is tested: EIP-712 sign / recover over {tx_hash, sig_nonce}
/// Why: Claim ownership is proven by this recovery
#[test]
fn test_recover_tx_data_signer() {
    let domain = test_domain();
    let sig = domain
        .sign_tx_data(&key(DUMMY_CLAIMANT_KEY), DUMMY_MAINCHAIN_TX, DUMMY_SIG_NONCE)
        .unwrap();

    let recovered = domain
        .recover_tx_data_signer(DUMMY_MAINCHAIN_TX, DUMMY_SIG_NONCE, &sig)
        .unwrap();
    assert_eq!(recovered, address_of(DUMMY_CLAIMANT_KEY));
    assert_eq!(recovered, to_checksum_address(&recovered.to_lowercase()).unwrap());
}

/// Test that v = 0/1 signatures recover the same signer as v = 27/28
/// Why: Wallets and libraries disagree on the recovery id encoding
#[test]
fn test_recover_accepts_raw_recovery_id() {
    let domain = test_domain();
    let sig = domain
        .sign_tx_data(&key(DUMMY_CLAIMANT_KEY), DUMMY_MAINCHAIN_TX, DUMMY_SIG_NONCE)
        .unwrap();
    let mut bytes = hex::decode(&sig[2..]).unwrap();
    bytes[64] -= 27;
    let raw = hex::encode(bytes);

    let recovered = domain
        .recover_tx_data_signer(DUMMY_MAINCHAIN_TX, DUMMY_SIG_NONCE, &raw)
        .unwrap();
    assert_eq!(recovered, address_of(DUMMY_CLAIMANT_KEY));
}

/// Test that a signature over another message recovers another address
/// Why: Signatures must be bound to both tx hash and sig nonce
#[test]
fn test_recover_other_message_differs() {
    let domain = test_domain();
    let sig = domain
        .sign_tx_data(&key(DUMMY_CLAIMANT_KEY), DUMMY_MAINCHAIN_TX, DUMMY_SIG_NONCE)
        .unwrap();

    let recovered = domain
        .recover_tx_data_signer(DUMMY_MAINCHAIN_TX, "another-nonce", &sig)
        .unwrap();
    assert_ne!(recovered, address_of(DUMMY_CLAIMANT_KEY));
}

/// Test that malformed signatures fail with a signature error
#[test]
fn test_recover_malformed_signature() {
    let domain = test_domain();
    for sig in ["0xzz", "0x1234", &format!("0x{}", "00".repeat(65))] {
        let err = domain
            .recover_tx_data_signer(DUMMY_MAINCHAIN_TX, DUMMY_SIG_NONCE, sig)
            .unwrap_err();
        assert!(matches!(err, ClaimError::Signature(_)), "sig {}", sig);
    }
}

// ============================================================================
// ADDRESS TESTS
// ============================================================================

/// Test bech32 validation of mainchain addresses
/// What is tested: checksum and prefix checks
/// Why: Memos are only issued for well-formed self-delegate addresses
#[test]
fn test_check_bech32_address() {
    assert!(check_bech32_address(DUMMY_SELF_DELEGATE_ADDR, "und"));
    assert!(!check_bech32_address(DUMMY_FOREIGN_PREFIX_ADDR, "und"));
    assert!(check_bech32_address(DUMMY_FOREIGN_PREFIX_ADDR, "cosmos"));

    // Flip the last checksum character
    let mut corrupted = DUMMY_SELF_DELEGATE_ADDR.to_string();
    corrupted.pop();
    corrupted.push('q');
    assert!(!check_bech32_address(&corrupted, "und"));
    assert!(!check_bech32_address("not-an-address", "und"));
}
