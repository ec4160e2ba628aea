use tracing::info;

use crate::cli::commands::StatusArgs;
use crate::errors::KestrelError;

pub async fn handle_status(args: StatusArgs) -> Result<(), KestrelError> {
    info!(campaign_id = %args.campaign_id, "Querying campaign status");

    let client = reqwest::Client::new();
    let url = format!("{}/api/campaigns/{}/status", args.server, args.campaign_id);

    loop {
        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| KestrelError::Network(format!("Failed to query campaign: {}", e)))?;

        let status: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| KestrelError::Network(format!("Invalid response: {}", e)))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("Stage: {}", status["stage"].as_str().unwrap_or("unknown"));
            if let Some(events) = status["events"].as_array() {
                for event in events {
                    println!("  {}", event);
                }
            }
        }

        let stage = status["stage"].as_str().unwrap_or("");
        if !args.follow || stage == "Done" || stage == "Failed" {
            break;
        }

        tokio::time::sleep(std::time::Duration::from_secs(args.interval)).await;
    }

    Ok(())
}
