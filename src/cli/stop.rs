use tracing::info;

use crate::cli::commands::StopArgs;
use crate::errors::KestrelError;

pub async fn handle_stop(args: StopArgs) -> Result<(), KestrelError> {
    info!(campaign_id = %args.campaign_id, "Requesting campaign cancellation");

    let client = reqwest::Client::new();
    let url = format!("{}/api/campaigns/{}/stop", args.server, args.campaign_id);

    client
        .post(&url)
        .send()
        .await
        .map_err(|e| KestrelError::Network(format!("Failed to stop campaign: {}", e)))?;

    println!("Stop signal sent for campaign {}", args.campaign_id);
    Ok(())
}
