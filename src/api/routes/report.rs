use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::errors::KestrelError;
use crate::models::{ExploitResult, VulnerabilityReport};
use crate::store::ArtifactType;

/// Dumps the persisted scan/exploit artifacts for a campaign as JSON. There is
/// no markdown assembler in this domain; clients render the report
/// themselves from the structured `VulnerabilityReport` / `ExploitResult`.
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, KestrelError> {
    let campaign = state.store.get_campaign(&id)?;

    let scan_report: Option<VulnerabilityReport> = if state.store.exists(ArtifactType::Scan, &id)? {
        Some(state.store.get(ArtifactType::Scan, &id)?)
    } else {
        None
    };

    let exploit_result: Option<ExploitResult> = if state.store.exists(ArtifactType::Exploit, &id)? {
        Some(state.store.get(ArtifactType::Exploit, &id)?)
    } else {
        None
    };

    Ok(Json(json!({
        "id": campaign.id,
        "target_url": campaign.target_url,
        "stage": format!("{:?}", campaign.stage),
        "vulnerability_report": scan_report,
        "exploit_result": exploit_result,
    })))
}
