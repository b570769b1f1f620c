//! pdfsweep - one-shot mailbox PDF ingestion
//!
//! Scans the configured mailbox for messages received in the current daily
//! window, uploads every PDF attachment and prints a JSON summary.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use ingest::{
    ClientCredentialsAuth, FileObjectStore, GcsObjectStore, IngestConfig, IngestCoordinator,
    MetadataServerToken, ObjectStore, StaticToken, TokenProvider, UreqTransport,
};
use log::{error, info};

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // A missing .env is fine; the real environment still applies
    dotenvy::dotenv().ok();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = IngestConfig::load().context("Failed to load configuration")?;

    let transport = Arc::new(UreqTransport::new());
    let creds = &config.credentials;
    let graph_tokens = Arc::new(ClientCredentialsAuth::new(
        transport.clone(),
        creds.tenant_id.clone(),
        creds.client_id.clone(),
        creds.client_secret.clone(),
    ));
    let store = build_store(&config, transport.clone());

    if let Some(dir) = &config.download_dir {
        let shown = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
        info!("Local cache: {}", shown.display());
    }

    let coordinator = IngestCoordinator::new(config, transport, graph_tokens, store)?;
    info!("Storage: {}", coordinator.storage_location());

    coordinator
        .preflight()
        .context("Storage destination is not usable")?;

    let result = coordinator
        .run(Utc::now())
        .with_context(|| format!("Ingest run for {} failed", coordinator.config().mailbox))?;

    println!("{}", serde_json::to_string_pretty(&result.summary())?);
    Ok(())
}

fn build_store(config: &IngestConfig, transport: Arc<UreqTransport>) -> Arc<dyn ObjectStore> {
    if let Some(store) = FileObjectStore::from_uri(&config.bucket) {
        return Arc::new(store);
    }

    let tokens: Arc<dyn TokenProvider> = match &config.gcs_access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(MetadataServerToken::new()),
    };
    Arc::new(GcsObjectStore::new(config.bucket.clone(), transport, tokens))
}
