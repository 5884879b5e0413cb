// src/main.rs

//! # Trust Claims - Main Entry Point
//!
//! Loads configuration, connects the service clients and starts the API
//! server.
//!
//! ## Environment Variables
//! - `CERAMIC_URL`: (Optional) document service URL (default: http://localhost:7007)
//! - `INDEXER_URL`: (Optional) EAS indexer URL (default: https://easscan.org)
//! - `BIND_ADDRESS`: (Optional) listen address (default: 127.0.0.1:3000)
//! - `PRIVATE_KEY`: (Optional) Ethereum private key; enables attestations
//! - `SECRET_KEY`: (Optional) Ed25519 seed of the issuing `did:key`

use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use trust_claims::blockchain::AttestationIndexer;
use trust_claims::services::ApiServer;
use trust_claims::settings::{self, Settings};
use trust_claims::storage::{GraphQlClient, SubmissionClient};
use trust_claims::wallet::{Session, WalletSession};

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Connect the document service and indexer clients
/// 3. Open the wallet session, if a private key is configured
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let settings = Settings::load().context("invalid configuration")?;

    let client = SubmissionClient::new(Arc::new(GraphQlClient::new(&settings.ceramic_url)));
    let indexer = AttestationIndexer::new(&settings.indexer_url);

    let wallet = match settings.private_key.as_deref() {
        Some(key) => {
            let session = Session::new(
                WalletSession::from_private_key(key).context("PRIVATE_KEY is not a valid key")?,
            );
            info!("Wallet session for {}", session.did());
            Some(session)
        }
        None => {
            warn!("PRIVATE_KEY not set; attestations are disabled");
            None
        }
    };
    if settings::secret_key().is_none() {
        warn!("SECRET_KEY not set; claims are not ready until it is");
    }

    let api_server = ApiServer::new(client, indexer, wallet, Arc::new(settings::secret_key));

    let addr: SocketAddr = settings
        .bind_address
        .parse()
        .with_context(|| format!("invalid BIND_ADDRESS {}", settings.bind_address))?;
    api_server.run(addr).await?;
    Ok(())
}
