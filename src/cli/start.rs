use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use crate::cli::commands::StartArgs;
use crate::config::{self, AuthKind, KestrelConfig, LlmConfig, LlmRoleConfig, ReconConfig, ReconDepth, TargetAuth, TargetConfig};
use crate::errors::KestrelError;
use crate::pipeline::CampaignCoordinator;
use crate::store::ArtifactStore;

pub async fn handle_start(args: StartArgs) -> Result<(), KestrelError> {
    info!(target = %args.target, "Starting campaign");

    let file_config = if let Some(path) = &args.config {
        Some(config::parse_config(&PathBuf::from(path)).await?)
    } else {
        None
    };

    let kestrel_config = build_config(&args, file_config)?;
    let campaign_id = args.campaign_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    let store = ArtifactStore::new(&args.db)?;
    let coordinator = CampaignCoordinator::new(&kestrel_config, store)?;

    let campaign = coordinator.run(&campaign_id, &args.target).await?;

    info!(
        campaign_id = %campaign.id,
        stage = ?campaign.stage,
        "Campaign run finished"
    );
    println!("campaign {} -> {:?}", campaign.id, campaign.stage);

    Ok(())
}

fn build_config(args: &StartArgs, file_config: Option<KestrelConfig>) -> Result<KestrelConfig, KestrelError> {
    let mut cfg = file_config.unwrap_or_default();

    let depth = match args.recon_depth.as_str() {
        "shallow" => ReconDepth::Shallow,
        "standard" => ReconDepth::Standard,
        "aggressive" => ReconDepth::Aggressive,
        other => return Err(KestrelError::Config(format!("Invalid recon depth: {}", other))),
    };
    let mut recon = cfg.recon.unwrap_or_default();
    recon.depth = depth;
    cfg.recon = Some(recon);

    let auth = match &args.target_token {
        Some(token) => TargetAuth {
            kind: AuthKind::Bearer,
            header_name: None,
            token: Some(token.clone()),
            username: None,
            password: None,
        },
        None => TargetAuth::default(),
    };
    cfg.target = Some(TargetConfig {
        url: args.target.clone(),
        protocol: Default::default(),
        message_field: "message".to_string(),
        auth,
        request_timeout_secs: 30,
        ws_session_id: None,
    });

    let api_key = args
        .api_key
        .clone()
        .or_else(|| resolve_api_key_from_env(&args.provider));

    let mut llm = cfg.llm.unwrap_or_default();
    let role = LlmRoleConfig {
        provider: Some(args.provider.clone()),
        model: args.model.clone(),
        api_key,
        base_url: Some(args.base_url.clone()),
    };
    llm.reasoning = Some(role.clone());
    llm.scoring = Some(role.clone());
    llm.reconnaissance = Some(role);
    cfg.llm = Some(llm);

    Ok(cfg)
}

fn resolve_api_key_from_env(provider: &str) -> Option<String> {
    let var_name = match provider {
        "anthropic" => "ANTHROPIC_API_KEY",
        "openai" => "OPENAI_API_KEY",
        "gemini" => "GEMINI_API_KEY",
        "openrouter" => "OPENROUTER_API_KEY",
        _ => return None,
    };
    std::env::var(var_name).ok()
}
