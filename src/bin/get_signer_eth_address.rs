//! Get Ticket Signer Address from Config
//!
//! This binary reads the service configuration, loads the ticket signer key from
//! the environment and prints the signer's Ethereum address. This address must be
//! registered as the ticket signer in the claim contract.

use anyhow::Result;
use emission_claims::config::Config;
use emission_claims::crypto::EcdsaTicketSigner;

fn main() -> Result<()> {
    // Load config
    let config = Config::load()?;

    let signer = EcdsaTicketSigner::new(
        &config.ethereum.get_signer_key()?,
        &config.ethereum.claim_contract_addr,
    )?;

    println!("{}", signer.signer_address());

    Ok(())
}
