use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::KestrelError;
use crate::models::Campaign;
use crate::pipeline::{CampaignCoordinator, CampaignEventBus};

use crate::api::models::{CampaignResponse, CreateCampaignRequest};
use crate::api::{AppState, CampaignHandle};

pub async fn create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<Json<CampaignResponse>, KestrelError> {
    if state.active_campaigns.len() >= state.max_concurrent_campaigns {
        return Err(KestrelError::ExecutionLimit(format!(
            "max concurrent campaigns ({}) reached",
            state.max_concurrent_campaigns
        )));
    }

    let id = Uuid::new_v4().to_string();
    let mut campaign = Campaign::new(id.clone(), req.target_url.clone(), Utc::now());
    campaign.tags = req.tags;
    state.store.create_campaign(&campaign)?;

    let mut config = (*state.config).clone();
    let mut target = config.target.clone().unwrap_or(crate::config::TargetConfig {
        url: String::new(),
        protocol: Default::default(),
        message_field: "message".to_string(),
        auth: Default::default(),
        request_timeout_secs: 30,
        ws_session_id: None,
    });
    target.url = req.target_url.clone();
    config.target = Some(target);

    let coordinator = CampaignCoordinator::new(&config, state.store.clone())?;
    let cancel_token = CancellationToken::new();
    let event_bus = Arc::new(CampaignEventBus::new(256));
    let coordinator = coordinator
        .with_cancel_token(cancel_token.clone())
        .with_event_bus(event_bus.clone());

    state.active_campaigns.insert(
        id.clone(),
        Arc::new(CampaignHandle { event_bus, cancel_token }),
    );

    let campaign_id = id.clone();
    let target_url = req.target_url.clone();
    let active_campaigns = state.active_campaigns.clone();
    tokio::spawn(async move {
        if let Err(e) = coordinator.run(&campaign_id, &target_url).await {
            error!(campaign_id = %campaign_id, error = %e, "campaign run failed");
        } else {
            info!(campaign_id = %campaign_id, "campaign run completed");
        }
        active_campaigns.remove(&campaign_id);
    });

    Ok(Json(CampaignResponse {
        id: campaign.id,
        status: "created".to_string(),
        target_url: req.target_url,
    }))
}

pub async fn list_campaigns(State(state): State<AppState>) -> Result<Json<Vec<CampaignResponse>>, KestrelError> {
    let campaigns = state.store.list_campaigns(100, 0)?;
    Ok(Json(
        campaigns
            .into_iter()
            .map(|c| CampaignResponse {
                id: c.id,
                status: format!("{:?}", c.stage),
                target_url: c.target_url,
            })
            .collect(),
    ))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CampaignResponse>, KestrelError> {
    let campaign = state.store.get_campaign(&id)?;
    Ok(Json(CampaignResponse {
        id: campaign.id,
        status: format!("{:?}", campaign.stage),
        target_url: campaign.target_url,
    }))
}

pub async fn stop_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, KestrelError> {
    match state.active_campaigns.get(&id) {
        Some(handle) => {
            handle.cancel_token.cancel();
            Ok(Json(serde_json::json!({ "id": id, "status": "stopping" })))
        }
        None => Err(KestrelError::NotFound(format!("active campaign {}", id))),
    }
}
