//! Generic API structures and handlers
//!
//! This module contains the response envelope, filter helpers, the rejection
//! handler and the API server shared by all claim endpoints.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::{Method, StatusCode as HttpStatus};
use warp::{Filter, Rejection, Reply};

use crate::claims::ClaimService;
use crate::config::Config;
use crate::error::{ClaimError, StatusCode};

// ============================================================================
// SHARED REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// Standardized response envelope for all API endpoints and claim operations.
///
/// Failures are reported with `success: false`, the failure's status code and
/// an error string; they are never raised past the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Outcome status code
    pub status: StatusCode,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result body (if successful)
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying `result`.
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            status: StatusCode::Ok,
            error: None,
            result: Some(result),
        }
    }

    /// Failed envelope with an explicit status and message.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            error: Some(message.into()),
            result: None,
        }
    }

    /// Converts an operation outcome into the envelope.
    pub fn from_result(result: Result<T, ClaimError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::failure(e.status(), e.envelope_message()),
        }
    }
}

/// Body of the claim POST endpoints: a single signed token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadRequest {
    #[serde(default)]
    pub payload: Option<String>,
}

impl PayloadRequest {
    /// The payload token, if present and non-empty.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref().filter(|p| !p.is_empty())
    }
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that provides access to the claim service.
///
/// # Arguments
///
/// * `service` - The claim service instance
///
/// # Returns
///
/// A warp filter that provides the claim service to handlers
pub fn with_claim_service(
    service: Arc<ClaimService>,
) -> impl Filter<Extract = (Arc<ClaimService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

// ============================================================================
// CORS CONFIGURATION
// ============================================================================

/// Creates a CORS filter based on the configured allowed origins.
fn create_cors_filter(allowed_origins: &[String]) -> warp::cors::Builder {
    let methods = vec![Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.iter().any(|o| o == "*") {
        warp::cors()
            .allow_any_origin()
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    } else {
        let origins: Vec<&str> = allowed_origins.iter().map(|s| s.as_str()).collect();
        warp::cors()
            .allow_origins(origins)
            .allow_methods(methods)
            .allow_headers(vec!["content-type"])
    }
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
///
/// This function converts warp rejections (unknown route, bad JSON, wrong
/// method) into the standard envelope with an appropriate HTTP status.
///
/// # Arguments
///
/// * `rej` - The warp rejection to handle
///
/// # Returns
///
/// A warp reply with an error response
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(err) = rej.find::<warp::filters::body::BodyDeserializeError>()
    {
        (HttpStatus::BAD_REQUEST, format!("Invalid JSON: {}", err))
    } else if rej.is_not_found() {
        (HttpStatus::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (HttpStatus::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (HttpStatus::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::<()>::failure(
            StatusCode::UnspecifiedError,
            message,
        )),
        status,
    ))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the emission claims service.
pub struct ApiServer {
    /// Service configuration
    config: Arc<Config>,
    /// Claim lifecycle engine
    service: Arc<ClaimService>,
}

impl ApiServer {
    /// Creates a new API server.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `service` - Claim service handling the requests
    ///
    /// # Returns
    ///
    /// A new API server instance
    pub fn new(config: Config, service: Arc<ClaimService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
        }
    }

    /// Starts the API server on the configured host and port.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server stopped
    /// * `Err(anyhow::Error)` - The configured address is invalid
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.api.host, self.config.api.port)
            .parse()
            .map_err(|e| {
                anyhow::anyhow!(
                    "Invalid API address {}:{}: {}",
                    self.config.api.host,
                    self.config.api.port,
                    e
                )
            })?;
        info!("Starting API server on {}", addr);

        let routes = self.create_routes();
        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    ///
    /// # Returns
    ///
    /// A warp filter containing all API routes
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        use super::claims;

        let service = self.service.clone();

        // Health check endpoint - returns service status
        let health = warp::path!("health").and(warp::get()).map(|| {
            warp::reply::json(&ApiResponse::ok(
                "Emission claims service is running".to_string(),
            ))
        });

        // POST /claims/memo - issue a memo for a validator
        let memo = warp::path!("claims" / "memo")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_claim_service(service.clone()))
            .and_then(claims::memo_handler);

        // POST /claims/ticket - issue, resume or replay a claim ticket
        let ticket = warp::path!("claims" / "ticket")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_claim_service(service.clone()))
            .and_then(claims::ticket_handler);

        // POST /claims/ethtx - record the destination-chain redemption
        let ethtx = warp::path!("claims" / "ethtx")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_claim_service(service.clone()))
            .and_then(claims::ethtx_handler);

        // GET /claims - all claim tickets
        let list_all = warp::path!("claims")
            .and(warp::get())
            .and(with_claim_service(service.clone()))
            .and_then(claims::list_all_handler);

        // GET /claims/address/:address
        let by_address = warp::path!("claims" / "address" / String)
            .and(warp::get())
            .and(with_claim_service(service.clone()))
            .and_then(claims::list_by_address_handler);

        // GET /claims/status/:status
        let by_status = warp::path!("claims" / "status" / String)
            .and(warp::get())
            .and(with_claim_service(service.clone()))
            .and_then(claims::list_by_status_handler);

        // GET /claims/address/:address/status/:status
        let by_address_status = warp::path!("claims" / "address" / String / "status" / String)
            .and(warp::get())
            .and(with_claim_service(service.clone()))
            .and_then(claims::list_by_address_and_status_handler);

        // GET /claims/address/:address/mctx/:mctx
        let by_address_mctx = warp::path!("claims" / "address" / String / "mctx" / String)
            .and(warp::get())
            .and(with_claim_service(service))
            .and_then(claims::list_by_address_and_mctx_handler);

        // Combine all routes and apply rejection handler
        health
            .or(memo)
            .or(ticket)
            .or(ethtx)
            .or(list_all)
            .or(by_address)
            .or(by_status)
            .or(by_address_status)
            .or(by_address_mctx)
            .with(create_cors_filter(&self.config.api.cors_origins))
            .recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    pub fn test_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}
