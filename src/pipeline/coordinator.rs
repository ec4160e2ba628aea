use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ExploitConfig, KbConfig, KestrelConfig, ReconConfig, ScanConfig};
use crate::errors::KestrelError;
use crate::events::{CampaignEvent, CampaignEventBus, EventEmitter};
use crate::exploit::ExploitEngine;
use crate::kb::BypassKnowledgeStore;
use crate::llm::LlmGateway;
use crate::models::{Campaign, CampaignStage};
use crate::probes::ProbeCatalog;
use crate::recon::ReconEngine;
use crate::scanner::ScannerEngine;
use crate::scheduler::RateLimiter;
use crate::store::{ArtifactStore, ArtifactType};
use crate::target::TargetClient;

/// Default capacity of a campaign's event buffer (SPEC_FULL §4.12). Sized
/// generously above the number of phase-transition events a single campaign
/// can ever emit (5 stages * 3 lifecycle events), so only `PhaseProgress`
/// chatter ever triggers the drop-oldest path in practice.
const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 256;

/// Owns a single campaign's lifecycle: Recon -> Scan -> Exploit -> Done,
/// invoking C8/C9/C10 in order and persisting each phase's artifact through
/// C1 before advancing `Campaign.stage`. Generalizes
/// `pipeline::orchestrator::PipelineOrchestrator`'s phase-sequencing shape.
pub struct CampaignCoordinator {
    store: ArtifactStore,
    llm: LlmGateway,
    target: TargetClient,
    limiter: RateLimiter,
    catalog: ProbeCatalog,
    kb: BypassKnowledgeStore,
    recon_config: ReconConfig,
    scan_config: ScanConfig,
    exploit_config: ExploitConfig,
    kb_config: KbConfig,
    cancel_token: CancellationToken,
    event_bus: Arc<CampaignEventBus>,
    seq: Arc<AtomicU64>,
}

impl CampaignCoordinator {
    pub fn new(config: &KestrelConfig, store: ArtifactStore) -> Result<Self, KestrelError> {
        let target_config = config
            .target
            .clone()
            .ok_or_else(|| KestrelError::Config("missing [target] section".into()))?;
        let llm_config = config.llm.clone().unwrap_or_default();
        let scheduler_config = config.scheduler.clone().unwrap_or_default();
        let kb_config = config.kb.clone().unwrap_or_default();

        let target = TargetClient::new(target_config)?;
        let llm = LlmGateway::new(&llm_config)?;
        let limiter = RateLimiter::new(scheduler_config.requests_per_second, scheduler_config.burst);
        let catalog = ProbeCatalog::load(None)?;
        let kb = BypassKnowledgeStore::new(&store, kb_config.clone());

        Ok(Self {
            store,
            llm,
            target,
            limiter,
            catalog,
            kb,
            recon_config: config.recon.clone().unwrap_or_default(),
            scan_config: config.scan.clone().unwrap_or_default(),
            exploit_config: config.exploit.clone().unwrap_or_default(),
            kb_config,
            cancel_token: CancellationToken::new(),
            event_bus: Arc::new(CampaignEventBus::new(DEFAULT_EVENT_BUFFER_CAPACITY)),
            seq: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<CampaignEventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn event_bus(&self) -> Arc<CampaignEventBus> {
        self.event_bus.clone()
    }

    fn emitter(&self, campaign_id: &str) -> EventEmitter {
        EventEmitter::new(self.event_bus.clone(), campaign_id, self.seq.clone())
    }

    fn fail(&self, campaign_id: &str, stage: CampaignStage, err: KestrelError) -> KestrelError {
        warn!(campaign_id, ?stage, error = %err, "campaign phase failed");
        self.emitter(campaign_id).phase_failed(stage, err.to_string());
        if let Err(e) = self.store.advance_stage(campaign_id, CampaignStage::Failed) {
            warn!(campaign_id, error = %e, "failed to mark campaign Failed after phase error");
        }
        self.emitter(campaign_id).campaign_done(false);
        err
    }

    fn check_cancelled(&self, campaign_id: &str, stage: CampaignStage) -> Result<(), KestrelError> {
        if self.cancel_token.is_cancelled() {
            return Err(self.fail(campaign_id, stage, KestrelError::Cancelled));
        }
        Ok(())
    }

    /// Start (or resume) a campaign against `target_url`, running whichever
    /// stages haven't completed yet. Returns the final persisted `Campaign`
    /// row, whose `.stage` is `Done` on success or `Failed` otherwise.
    pub async fn run(&self, campaign_id: &str, target_url: &str) -> Result<Campaign, KestrelError> {
        if !self.store.exists_campaign(campaign_id)? {
            self.store.create_campaign(&Campaign::new(campaign_id, target_url, Utc::now()))?;
        }
        let mut campaign = self.store.get_campaign(campaign_id)?;
        info!(campaign_id, target = %campaign.target_url, stage = ?campaign.stage, "campaign run starting");
        let events = self.emitter(campaign_id);

        if campaign.stage == CampaignStage::Created {
            self.check_cancelled(campaign_id, CampaignStage::Recon)?;
            events.phase_started(CampaignStage::Recon);

            let recon = ReconEngine::new(&self.target, &self.llm, &self.recon_config);
            let blueprint = recon.run(campaign_id, &events).await.map_err(|e| self.fail(campaign_id, CampaignStage::Recon, e))?;

            self.store.put(ArtifactType::Recon, campaign_id, &blueprint)?;
            self.store.set_artifact_id(campaign_id, ArtifactType::Recon, campaign_id)?;
            self.store.advance_stage(campaign_id, CampaignStage::Recon)?;
            let observation_count: usize = crate::models::ALL_OBSERVATION_CATEGORIES
                .iter()
                .map(|c| blueprint.observation_count(*c))
                .sum();
            events.phase_progress(CampaignStage::Recon, format!("{} observation(s) recorded", observation_count));
            events.phase_completed(CampaignStage::Recon, campaign_id);
            campaign = self.store.get_campaign(campaign_id)?;
        }

        if campaign.stage == CampaignStage::Recon {
            self.check_cancelled(campaign_id, CampaignStage::Scan)?;
            events.phase_started(CampaignStage::Scan);

            let blueprint = self.store.get(ArtifactType::Recon, campaign_id)?;
            let scanner = ScannerEngine::new(&self.target, &self.llm, &self.limiter, &self.catalog, &self.scan_config);
            let report = scanner.run(&blueprint, &self.cancel_token, &events).await.map_err(|e| self.fail(campaign_id, CampaignStage::Scan, e))?;

            self.store.put(ArtifactType::Scan, campaign_id, &report)?;
            self.store.set_artifact_id(campaign_id, ArtifactType::Scan, campaign_id)?;
            self.store.advance_stage(campaign_id, CampaignStage::Scan)?;
            events.phase_progress(CampaignStage::Scan, format!("{} vulnerability cluster(s) found", report.clusters.len()));
            events.phase_completed(CampaignStage::Scan, campaign_id);
            campaign = self.store.get_campaign(campaign_id)?;
        }

        if campaign.stage == CampaignStage::Scan {
            self.check_cancelled(campaign_id, CampaignStage::Exploit)?;
            events.phase_started(CampaignStage::Exploit);

            let blueprint = self.store.get(ArtifactType::Recon, campaign_id)?;
            let report = self.store.get(ArtifactType::Scan, campaign_id)?;

            if report.clusters.is_empty() {
                events.phase_progress(CampaignStage::Exploit, "no vulnerability clusters to exploit, skipping");
                events.phase_completed(CampaignStage::Exploit, "");
            } else {
                let exploit = ExploitEngine::new(&self.target, &self.llm, &self.kb, &self.exploit_config, &self.kb_config);
                let result = exploit
                    .run(campaign_id, &blueprint, &report, &self.cancel_token, &events)
                    .await
                    .map_err(|e| self.fail(campaign_id, CampaignStage::Exploit, e))?;

                self.store.put(ArtifactType::Exploit, campaign_id, &result)?;
                self.store.set_artifact_id(campaign_id, ArtifactType::Exploit, campaign_id)?;
                events.phase_progress(
                    CampaignStage::Exploit,
                    format!("{} iteration(s) run, success={}", result.iterations_run, result.is_successful),
                );
                events.phase_completed(CampaignStage::Exploit, campaign_id);
            }

            self.store.advance_stage(campaign_id, CampaignStage::Exploit)?;
        }

        self.store.advance_stage(campaign_id, CampaignStage::Done)?;
        events.campaign_done(true);
        info!(campaign_id, "campaign run complete");
        self.store.get_campaign(campaign_id)
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthKind, LlmRoleConfig, TargetAuth, TargetProtocol};

    fn test_config() -> KestrelConfig {
        let role = Some(LlmRoleConfig {
            provider: Some("anthropic".to_string()),
            model: None,
            api_key: Some("test-key".to_string()),
            base_url: None,
        });
        KestrelConfig {
            target: Some(crate::config::TargetConfig {
                url: "https://target.example/chat".to_string(),
                protocol: TargetProtocol::Http,
                message_field: "message".to_string(),
                auth: TargetAuth { kind: AuthKind::None, header_name: None, token: None, username: None, password: None },
                request_timeout_secs: 30,
                ws_session_id: None,
            }),
            llm: Some(crate::config::LlmConfig {
                reasoning: role.clone(),
                scoring: role.clone(),
                reconnaissance: role,
                reasoning_timeout_secs: 30,
                schema_retries: 2,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn new_builds_from_config_sections() {
        let store = ArtifactStore::in_memory().unwrap();
        let coordinator = CampaignCoordinator::new(&test_config(), store);
        assert!(coordinator.is_ok());
    }

    #[test]
    fn new_rejects_missing_target_section() {
        let store = ArtifactStore::in_memory().unwrap();
        let mut config = test_config();
        config.target = None;
        assert!(matches!(CampaignCoordinator::new(&config, store), Err(KestrelError::Config(_))));
    }

    #[test]
    fn check_cancelled_fails_the_campaign_and_emits_done() {
        let store = ArtifactStore::in_memory().unwrap();
        store.create_campaign(&Campaign::new("c1", "https://target.example", Utc::now())).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let coordinator = CampaignCoordinator::new(&test_config(), store.clone()).unwrap().with_cancel_token(token);

        let err = coordinator.check_cancelled("c1", CampaignStage::Recon);
        assert!(matches!(err, Err(KestrelError::Cancelled)));
        assert_eq!(store.get_campaign("c1").unwrap().stage, CampaignStage::Failed);

        let events = coordinator.event_bus().drain();
        assert!(events.iter().any(|e| matches!(e, CampaignEvent::PhaseFailed { .. })));
        assert!(events.iter().any(|e| matches!(e, CampaignEvent::CampaignDone { success: false, .. })));
    }
}
