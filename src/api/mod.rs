pub mod routes;
pub mod models;
pub mod errors;
pub mod auth;

use std::sync::Arc;
use axum::Router;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::config::KestrelConfig;
use crate::pipeline::CampaignEventBus;
use crate::store::ArtifactStore;

/// Bookkeeping for one campaign currently running in this process, keyed by
/// campaign id in `AppState::active_campaigns`. Generalizes
/// `PipelineHandle{state, cancel_token}`.
pub struct CampaignHandle {
    pub event_bus: Arc<CampaignEventBus>,
    pub cancel_token: CancellationToken,
}

#[derive(Clone)]
pub struct AppState {
    pub store: ArtifactStore,
    pub config: Arc<KestrelConfig>,
    pub active_campaigns: Arc<DashMap<String, Arc<CampaignHandle>>>,
    pub max_concurrent_campaigns: usize,
}

pub fn create_app_state(store: ArtifactStore, config: KestrelConfig, max_concurrent_campaigns: usize) -> AppState {
    AppState {
        store,
        config: Arc::new(config),
        active_campaigns: Arc::new(DashMap::new()),
        max_concurrent_campaigns,
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", axum::routing::get(routes::health::health_check))
        .route("/api/campaigns", axum::routing::post(routes::campaigns::create_campaign).get(routes::campaigns::list_campaigns))
        .route("/api/campaigns/{id}", axum::routing::get(routes::campaigns::get_campaign))
        .route("/api/campaigns/{id}/status", axum::routing::get(routes::status::get_status))
        .route("/api/campaigns/{id}/events", axum::routing::get(routes::status::stream_events))
        .route("/api/campaigns/{id}/report", axum::routing::get(routes::report::get_report))
        .route("/api/campaigns/{id}/stop", axum::routing::post(routes::campaigns::stop_campaign))
        .with_state(state)
}
