//! Claim endpoint handlers
//!
//! Thin adapters between warp and the claim service. Every handler answers
//! HTTP 200 with the response envelope.

use std::sync::Arc;
use tracing::debug;

use super::generic::{ApiResponse, PayloadRequest};
use crate::claims::{ClaimService, ClaimTicketView, FinalizeResult, MemoResult, TicketResult};
use crate::error::StatusCode;
use crate::storage::ClaimTicketFilter;

const MISSING_PAYLOAD: &str = "missing payload";

// ============================================================================
// LIFECYCLE HANDLERS
// ============================================================================

/// Handler for `POST /claims/memo`.
pub async fn memo_handler(
    request: PayloadRequest,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = match request.payload() {
        Some(payload) => service.submit_memo_request(payload).await,
        None => ApiResponse::<MemoResult>::failure(StatusCode::JwtError, MISSING_PAYLOAD),
    };
    Ok(warp::reply::json(&response))
}

/// Handler for `POST /claims/ticket`.
pub async fn ticket_handler(
    request: PayloadRequest,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = match request.payload() {
        Some(payload) => service.submit_ticket_request(payload).await,
        None => ApiResponse::<TicketResult>::failure(StatusCode::JwtError, MISSING_PAYLOAD),
    };
    Ok(warp::reply::json(&response))
}

/// Handler for `POST /claims/ethtx`.
pub async fn ethtx_handler(
    request: PayloadRequest,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = match request.payload() {
        Some(payload) => service.submit_finalization(payload).await,
        None => ApiResponse::<FinalizeResult>::failure(StatusCode::JwtError, MISSING_PAYLOAD),
    };
    Ok(warp::reply::json(&response))
}

// ============================================================================
// QUERY HANDLERS
// ============================================================================

async fn list(
    service: &ClaimService,
    filter: ClaimTicketFilter,
) -> ApiResponse<Vec<ClaimTicketView>> {
    debug!("Listing claim tickets: {:?}", filter);
    ApiResponse::from_result(service.list_claim_tickets(filter).await)
}

/// Handler for `GET /claims`.
pub async fn list_all_handler(
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let response = list(&service, ClaimTicketFilter::default()).await;
    Ok(warp::reply::json(&response))
}

/// Handler for `GET /claims/address/:address`.
pub async fn list_by_address_handler(
    address: String,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let filter = ClaimTicketFilter {
        eth_address: Some(address),
        ..Default::default()
    };
    Ok(warp::reply::json(&list(&service, filter).await))
}

/// Handler for `GET /claims/status/:status`.
pub async fn list_by_status_handler(
    status: String,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&service.list_by_status(None, &status).await))
}

/// Handler for `GET /claims/address/:address/status/:status`.
pub async fn list_by_address_and_status_handler(
    address: String,
    status: String,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(
        &service.list_by_status(Some(address), &status).await,
    ))
}

/// Handler for `GET /claims/address/:address/mctx/:mctx`.
pub async fn list_by_address_and_mctx_handler(
    address: String,
    mctx: String,
    service: Arc<ClaimService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let filter = ClaimTicketFilter {
        eth_address: Some(address),
        status: None,
        mainchain_tx: Some(mctx),
    };
    Ok(warp::reply::json(&list(&service, filter).await))
}
