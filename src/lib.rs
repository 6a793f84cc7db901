//! Emission Claims Service Library
//!
//! This crate provides the claim ticket issuance engine of a cross-chain reward
//! bridge: validators accrue emissions on the mainchain and claim them on an EVM
//! chain with a signed claim ticket issued by this service.

pub mod api;
pub mod claims;
pub mod config;
pub mod crypto;
pub mod error;
pub mod mainchain_client;
pub mod storage;
pub mod validator;

// Re-export commonly used types
pub use api::{ApiResponse, ApiServer};
pub use claims::ClaimService;
pub use config::Config;
pub use crypto::{EcdsaTicketSigner, SignedTicket, TicketSigner, TokenService, TypedDataDomain};
pub use error::{ClaimError, StatusCode};
pub use mainchain_client::{MainchainClient, MainchainTx, RestMainchainClient};
pub use storage::{ClaimStatus, ClaimStore, ClaimTicket, MemoryStore};
pub use validator::{ClaimTxValidator, MemoClaimValidator, ValidatedClaim};
