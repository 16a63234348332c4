use anyhow::Result;
use event_registry::{
    ObjectStoreClient, RegistryConfig, StoreClient,
    http::{self, AppState},
    new_event_storage,
    storage::StoreConfig,
};
use std::sync::Arc;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    info!("Starting event registry");

    let config = RegistryConfig::from_env()?;
    let backend = match &config.store {
        StoreConfig::Memory => "memory".to_string(),
        StoreConfig::S3 { bucket, .. } => format!("s3 bucket {bucket}"),
    };
    info!(
        "Using {} store under prefix {:?}, ttl {:?}",
        backend, config.key_prefix, config.ttl
    );

    // Initialize store client
    let client = ObjectStoreClient::from_config(config.store.clone())?;
    let client: Arc<dyn StoreClient> = Arc::new(client);

    let state = AppState {
        storage: Arc::new(new_event_storage(client, config.storage_options())),
        request_timeout: config.request_timeout,
    };

    // Start the HTTP server
    http::start_server(state, config.bind_address).await?;

    Ok(())
}
