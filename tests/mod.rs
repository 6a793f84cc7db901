//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    address_of, build_test_config, key, setup_harness, test_domain, MockMainchainClient,
    TestHarness, ToggleSigner, DUMMY_CHAIN_ID, DUMMY_CLAIMANT_KEY, DUMMY_CLAIM_CONTRACT,
    DUMMY_ETH_TX, DUMMY_FOREIGN_PREFIX_ADDR, DUMMY_INTRUDER_KEY, DUMMY_JWT_SECRET,
    DUMMY_MAINCHAIN_TX, DUMMY_OPERATOR_ADDR, DUMMY_SELF_DELEGATE_ADDR,
    DUMMY_SELF_DELEGATE_ADDR_2, DUMMY_SIGNER_KEY, DUMMY_SIG_NONCE,
};
