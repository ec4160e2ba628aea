use std::path::PathBuf;

use tracing::info;

use crate::api;
use crate::cli::commands::ServeArgs;
use crate::config;
use crate::errors::KestrelError;
use crate::store::ArtifactStore;

pub async fn handle_serve(args: ServeArgs) -> Result<(), KestrelError> {
    info!(host = %args.host, port = args.port, "Starting API server");

    let kestrel_config = if let Some(path) = &args.config {
        config::parse_config(&PathBuf::from(path)).await?
    } else {
        Default::default()
    };

    let store = ArtifactStore::new(&args.db)?;
    let state = api::create_app_state(store, kestrel_config, args.workers);
    let app = api::build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KestrelError::Network(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| KestrelError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
