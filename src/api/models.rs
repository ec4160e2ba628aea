use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CreateCampaignRequest {
    pub target_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct CampaignResponse {
    pub id: String,
    pub status: String,
    pub target_url: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
