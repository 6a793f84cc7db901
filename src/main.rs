//! Emission Claims Service
//!
//! Issues signed claim tickets that let mainchain validators redeem their
//! emission rewards on an EVM chain.
//!
//! ## Overview
//!
//! The service:
//! 1. Issues memos binding an Ethereum address to a validator
//! 2. Validates mainchain claim transactions carrying such a memo
//! 3. Issues exactly one signed claim ticket per claim, in nonce order
//! 4. Records the destination-chain redemption and rotates the memo key
//!
//! ## Security Requirements
//!
//! **CRITICAL**: This service holds the claim contract's ticket signer key and the
//! JWT shared secret. Both are read from the environment and must be kept secret.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use emission_claims::{ApiServer, ClaimService, Config, MemoryStore};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the claims service.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Initializes the store and the claim service
/// 4. Runs the API server until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Emission Claims Service");

    let args: Vec<String> = std::env::args().collect();

    // Check for help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Emission Claims Service");
        println!();
        println!("Usage: emission-claims [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  EMISSION_CLAIMS_CONFIG_PATH    Path to config file (overrides --config)");
        println!("  EMISSION_CLAIMS_JWT_SECRET     JWT shared secret (name configurable)");
        println!("  EMISSION_CLAIMS_SIGNER_KEY     Ticket signer key, hex (name configurable)");
        return Ok(());
    }

    let mut config_path = None;
    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        if std::env::var("EMISSION_CLAIMS_CONFIG_PATH").is_err() {
            std::env::set_var("EMISSION_CLAIMS_CONFIG_PATH", &path);
            info!("Using custom config: {}", path);
        }
    }

    // Load configuration from config/emission-claims.toml (or EMISSION_CLAIMS_CONFIG_PATH)
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let store = Arc::new(MemoryStore::new());
    let service = ClaimService::from_config(&config, store)?;

    info!("All components initialized successfully");

    // Run the service (this blocks until shutdown)
    let api_server = ApiServer::new(config, Arc::new(service));
    api_server.run().await
}
