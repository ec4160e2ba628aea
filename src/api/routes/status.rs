use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::errors::KestrelError;
use crate::models::CampaignStage;

struct EventStreamState {
    app: AppState,
    campaign_id: String,
    ticker: tokio::time::Interval,
    pending: VecDeque<Event>,
    finished: bool,
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, KestrelError> {
    let campaign = state.store.get_campaign(&id)?;

    let events = state
        .active_campaigns
        .get(&id)
        .map(|handle| handle.event_bus.drain())
        .unwrap_or_default();

    Ok(Json(json!({
        "id": campaign.id,
        "stage": format!("{:?}", campaign.stage),
        "recon_artifact_id": campaign.recon_artifact_id,
        "scan_artifact_id": campaign.scan_artifact_id,
        "exploit_artifact_id": campaign.exploit_artifact_id,
        "events": events,
    })))
}

/// Streams the campaign's `CampaignEventBus` over SSE by polling it at a
/// fixed interval, terminating once the campaign reaches `Done`/`Failed` or
/// drops out of `active_campaigns` (process restart, or it already finished
/// before this request arrived).
pub async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = EventStreamState {
        app: state,
        campaign_id: id,
        ticker: tokio::time::interval(Duration::from_millis(500)),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = stream::unfold(initial, |mut s| async move {
        loop {
            if let Some(event) = s.pending.pop_front() {
                return Some((Ok(event), s));
            }
            if s.finished {
                return None;
            }

            s.ticker.tick().await;

            match s.app.active_campaigns.get(&s.campaign_id) {
                Some(handle) => {
                    for event in handle.event_bus.drain() {
                        if let Ok(payload) = serde_json::to_string(&event) {
                            s.pending.push_back(Event::default().data(payload));
                        }
                    }
                    if let Ok(campaign) = s.app.store.get_campaign(&s.campaign_id) {
                        if matches!(campaign.stage, CampaignStage::Done | CampaignStage::Failed) {
                            s.finished = true;
                        }
                    }
                }
                None => {
                    if let Ok(campaign) = s.app.store.get_campaign(&s.campaign_id) {
                        s.pending.push_back(
                            Event::default().event("campaign_done").data(format!("{:?}", campaign.stage)),
                        );
                    }
                    s.finished = true;
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
