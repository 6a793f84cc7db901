//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the emission claims service.
//! Configuration includes the mainchain REST endpoint, the destination EVM chain and claim
//! contract, the names of the environment variables holding secrets, and API settings.

use serde::{Deserialize, Serialize};

use crate::crypto::address::is_eth_address;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - Mainchain connection details (where validator emissions accrue)
/// - Destination EVM chain details (where claim tickets are redeemed)
/// - Claim token and signature-domain settings
/// - API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mainchain configuration (source of claim transactions)
    pub mainchain: MainchainConfig,
    /// Destination EVM chain configuration (claim contract)
    pub ethereum: EthereumConfig,
    /// Claim processing configuration (shared secret, typed-data domain)
    pub claims: ClaimsConfig,
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
}

/// Configuration for the mainchain connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainchainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// REST (LCD) endpoint URL used to fetch transactions
    pub rest_url: String,
    /// Bech32 prefix of mainchain account addresses
    #[serde(default = "default_bech32_prefix")]
    pub bech32_prefix: String,
    /// Timeout for mainchain requests in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Configuration for the destination EVM chain.
///
/// The signer key itself is loaded from an environment variable at runtime;
/// the config file only names that variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthereumConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// Chain ID (e.g., 31337 for Hardhat, 1 for Ethereum mainnet)
    pub chain_id: u64,
    /// Address of the claim contract (typed-data verifying contract and ticket scope)
    pub claim_contract_addr: String,
    /// Environment variable name containing the secp256k1 ticket signer key (hex)
    /// Default: "EMISSION_CLAIMS_SIGNER_KEY"
    #[serde(default = "default_signer_key_env")]
    pub signer_key_env: String,
}

/// Claim processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsConfig {
    /// Environment variable name containing the JWT shared secret
    /// Default: "EMISSION_CLAIMS_JWT_SECRET"
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,
    /// EIP-712 domain name used for claim request signatures
    pub sig_domain_name: String,
    /// EIP-712 domain version used for claim request signatures
    pub sig_domain_version: String,
}

/// API server configuration for external communication.
///
/// Controls how the service exposes its REST API endpoints
/// and handles cross-origin requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests
    pub cors_origins: Vec<String>,
}

fn default_bech32_prefix() -> String {
    "und".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_signer_key_env() -> String {
    "EMISSION_CLAIMS_SIGNER_KEY".to_string()
}

fn default_jwt_secret_env() -> String {
    "EMISSION_CLAIMS_JWT_SECRET".to_string()
}

impl EthereumConfig {
    /// Loads the ticket signer key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The signer key (hex encoded)
    /// * `Err(anyhow::Error)` - Failed to load from environment
    pub fn get_signer_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.signer_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the ticket signer's secp256k1 private key (hex encoded).",
                self.signer_key_env
            )
        })
    }
}

impl ClaimsConfig {
    /// Loads the JWT shared secret from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The shared secret
    /// * `Err(anyhow::Error)` - Failed to load from environment
    pub fn get_jwt_secret(&self) -> anyhow::Result<String> {
        std::env::var(&self.jwt_secret_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the JWT shared secret.",
                self.jwt_secret_env
            )
        })
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - The mainchain REST URL parses
    /// - The bech32 prefix is not empty
    /// - The claim contract address is a well-formed Ethereum address
    /// - The destination chain ID is not zero
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - A field is invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.mainchain.rest_url).map_err(|e| {
            anyhow::anyhow!(
                "Configuration error: invalid mainchain rest_url '{}': {}",
                self.mainchain.rest_url,
                e
            )
        })?;

        if self.mainchain.bech32_prefix.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration error: mainchain bech32_prefix must not be empty"
            ));
        }

        if !is_eth_address(&self.ethereum.claim_contract_addr) {
            return Err(anyhow::anyhow!(
                "Configuration error: invalid claim_contract_addr '{}'",
                self.ethereum.claim_contract_addr
            ));
        }

        if self.ethereum.chain_id == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: ethereum chain_id must not be zero"
            ));
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// This function:
    /// 1. Checks if config/emission-claims.toml exists
    /// 2. If it exists, loads and parses the configuration
    /// 3. Validates the configuration
    /// 4. If it doesn't exist, returns an error asking user to copy template
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - Failed to load configuration, file doesn't exist, or validation failed
    pub fn load() -> anyhow::Result<Self> {
        // Check for custom config path via environment variable (for tests)
        let config_path = std::env::var("EMISSION_CLAIMS_CONFIG_PATH")
            .unwrap_or_else(|_| "config/emission-claims.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/emission-claims.template.toml config/emission-claims.toml\n\
                Then edit config/emission-claims.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Creates a default configuration with placeholder values.
    ///
    /// This configuration is suitable for local development and testing.
    /// For production use, the endpoints and contract address must be replaced
    /// and the secret environment variables set.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            mainchain: MainchainConfig {
                name: "Mainchain".to_string(),
                rest_url: "http://127.0.0.1:1317".to_string(),
                bech32_prefix: default_bech32_prefix(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            ethereum: EthereumConfig {
                name: "Ethereum".to_string(),
                chain_id: 31337,
                claim_contract_addr: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
                signer_key_env: default_signer_key_env(),
            },
            claims: ClaimsConfig {
                jwt_secret_env: default_jwt_secret_env(),
                sig_domain_name: "xFUND".to_string(),
                sig_domain_version: "1".to_string(),
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3333,
                cors_origins: vec!["http://localhost:3333".to_string()],
            },
        }
    }
}
