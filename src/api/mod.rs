//! REST API Server Module
//!
//! This module provides the REST API of the emission claims service: the three
//! claim lifecycle endpoints (memo, ticket, ethtx), the read-only claim ticket
//! listings and a health check. All responses use the `ApiResponse` envelope.

// Generic shared code
mod generic;

// Claim endpoint handlers
mod claims;

pub use generic::{handle_rejection, with_claim_service, ApiResponse, ApiServer, PayloadRequest};
