use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::models::CampaignStage;

/// Messages streamed from an engine or the coordinator to REPL/API consumers.
/// Every variant carries `campaign_id` and a monotonic per-campaign `seq` so a
/// consumer can detect gaps without losing ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignEvent {
    PhaseStarted {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
    },
    /// recon: one LLM-directed turn's outbound prompt.
    TurnPrompt {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        prompt_text: String,
    },
    /// recon: a take_note observation recorded into the Blueprint.
    Observation {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        category: String,
        text: String,
    },
    /// recon: an analyze_gaps check.
    GapAnalysis {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        per_category_counts: HashMap<String, u32>,
        missing: Vec<String>,
    },
    /// scan: a probe is about to dispatch its generated prompts.
    ProbeStart {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        probe_name: String,
        planned_generations: u32,
    },
    /// scan: one probe prompt's detector verdict.
    ProbeResult {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        probe_name: String,
        prompt_index: usize,
        status: String,
        detector_name: String,
        detector_score: f64,
    },
    /// scan: a probe's prompts have all been executed.
    ProbeComplete {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        probe_name: String,
        pass_count: u32,
        fail_count: u32,
        duration_ms: u64,
    },
    /// exploit: an iteration is about to articulate and send payloads.
    IterationStart {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        iteration_index: u32,
        chain: Vec<String>,
        framing: Option<String>,
    },
    /// exploit: an iteration's representative composite score.
    IterationScored {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        composite_score: f64,
    },
    /// exploit: the adaptive loop's decision after a failed iteration.
    Adaptation {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        failure_cause: String,
        next_chain: Vec<String>,
        actions: Vec<String>,
    },
    /// scan: terminal summary, emitted once after every probe has completed.
    Complete {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        vulnerabilities: usize,
    },
    /// Low-priority progress chatter. The only variant the event bus is
    /// allowed to drop under backpressure.
    PhaseProgress {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        message: String,
    },
    PhaseCompleted {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        artifact_id: String,
    },
    PhaseFailed {
        campaign_id: String,
        seq: u64,
        stage: CampaignStage,
        reason: String,
    },
    CampaignDone {
        campaign_id: String,
        seq: u64,
        success: bool,
    },
}

impl CampaignEvent {
    pub fn seq(&self) -> u64 {
        match self {
            Self::PhaseStarted { seq, .. }
            | Self::TurnPrompt { seq, .. }
            | Self::Observation { seq, .. }
            | Self::GapAnalysis { seq, .. }
            | Self::ProbeStart { seq, .. }
            | Self::ProbeResult { seq, .. }
            | Self::ProbeComplete { seq, .. }
            | Self::IterationStart { seq, .. }
            | Self::IterationScored { seq, .. }
            | Self::Adaptation { seq, .. }
            | Self::Complete { seq, .. }
            | Self::PhaseProgress { seq, .. }
            | Self::PhaseCompleted { seq, .. }
            | Self::PhaseFailed { seq, .. }
            | Self::CampaignDone { seq, .. } => *seq,
        }
    }

    fn is_progress(&self) -> bool {
        matches!(self, Self::PhaseProgress { .. })
    }
}

/// Bounded event buffer backing a campaign's SSE/status stream. Full buffer +
/// incoming `PhaseProgress` drops the oldest buffered `PhaseProgress` entry to
/// make room; every other event type is never dropped, so the buffer can grow
/// past `capacity` under a burst of sub-events (bounded by probe/iteration
/// counts, which are themselves config-bounded).
pub struct CampaignEventBus {
    capacity: usize,
    buffer: Mutex<VecDeque<CampaignEvent>>,
}

impl CampaignEventBus {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, buffer: Mutex::new(VecDeque::new()) }
    }

    pub fn publish(&self, event: CampaignEvent) {
        let mut buf = self.buffer.lock().unwrap();
        if buf.len() >= self.capacity {
            if event.is_progress() {
                if let Some(pos) = buf.iter().position(|e| e.is_progress()) {
                    buf.remove(pos);
                } else {
                    return;
                }
            }
        }
        buf.push_back(event);
    }

    /// Drain everything buffered so far, in publish order.
    pub fn drain(&self) -> Vec<CampaignEvent> {
        self.buffer.lock().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }
}

/// Emits `CampaignEvent`s for one campaign onto a shared bus, handing out
/// seq numbers from a counter shared across every phase so ordering survives
/// Recon -> Scan -> Exploit handoff. Cloned cheaply and threaded into C8/C9/C10
/// engines so sub-events originate from the engine that knows about them,
/// instead of being collapsed into one post-hoc coordinator message.
#[derive(Clone)]
pub struct EventEmitter {
    bus: Arc<CampaignEventBus>,
    campaign_id: String,
    seq: Arc<AtomicU64>,
}

impl EventEmitter {
    pub fn new(bus: Arc<CampaignEventBus>, campaign_id: impl Into<String>, seq: Arc<AtomicU64>) -> Self {
        Self { bus, campaign_id: campaign_id.into(), seq }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn emit(&self, build: impl FnOnce(String, u64) -> CampaignEvent) {
        let seq = self.next_seq();
        self.bus.publish(build(self.campaign_id.clone(), seq));
    }

    pub fn phase_started(&self, stage: CampaignStage) {
        self.emit(|campaign_id, seq| CampaignEvent::PhaseStarted { campaign_id, seq, stage });
    }

    pub fn phase_progress(&self, stage: CampaignStage, message: impl Into<String>) {
        let message = message.into();
        self.emit(move |campaign_id, seq| CampaignEvent::PhaseProgress { campaign_id, seq, stage, message });
    }

    pub fn phase_completed(&self, stage: CampaignStage, artifact_id: impl Into<String>) {
        let artifact_id = artifact_id.into();
        self.emit(move |campaign_id, seq| CampaignEvent::PhaseCompleted { campaign_id, seq, stage, artifact_id });
    }

    pub fn phase_failed(&self, stage: CampaignStage, reason: impl Into<String>) {
        let reason = reason.into();
        self.emit(move |campaign_id, seq| CampaignEvent::PhaseFailed { campaign_id, seq, stage, reason });
    }

    pub fn campaign_done(&self, success: bool) {
        self.emit(move |campaign_id, seq| CampaignEvent::CampaignDone { campaign_id, seq, success });
    }

    pub fn turn_prompt(&self, stage: CampaignStage, prompt_text: impl Into<String>) {
        let prompt_text = prompt_text.into();
        self.emit(move |campaign_id, seq| CampaignEvent::TurnPrompt { campaign_id, seq, stage, prompt_text });
    }

    pub fn observation(&self, stage: CampaignStage, category: impl Into<String>, text: impl Into<String>) {
        let category = category.into();
        let text = text.into();
        self.emit(move |campaign_id, seq| CampaignEvent::Observation { campaign_id, seq, stage, category, text });
    }

    pub fn gap_analysis(&self, stage: CampaignStage, per_category_counts: HashMap<String, u32>, missing: Vec<String>) {
        self.emit(move |campaign_id, seq| CampaignEvent::GapAnalysis { campaign_id, seq, stage, per_category_counts, missing });
    }

    pub fn probe_start(&self, stage: CampaignStage, probe_name: impl Into<String>, planned_generations: u32) {
        let probe_name = probe_name.into();
        self.emit(move |campaign_id, seq| CampaignEvent::ProbeStart { campaign_id, seq, stage, probe_name, planned_generations });
    }

    pub fn probe_result(
        &self,
        stage: CampaignStage,
        probe_name: impl Into<String>,
        prompt_index: usize,
        status: impl Into<String>,
        detector_name: impl Into<String>,
        detector_score: f64,
    ) {
        let probe_name = probe_name.into();
        let status = status.into();
        let detector_name = detector_name.into();
        self.emit(move |campaign_id, seq| CampaignEvent::ProbeResult {
            campaign_id,
            seq,
            stage,
            probe_name,
            prompt_index,
            status,
            detector_name,
            detector_score,
        });
    }

    pub fn probe_complete(&self, stage: CampaignStage, probe_name: impl Into<String>, pass_count: u32, fail_count: u32, duration_ms: u64) {
        let probe_name = probe_name.into();
        self.emit(move |campaign_id, seq| CampaignEvent::ProbeComplete { campaign_id, seq, stage, probe_name, pass_count, fail_count, duration_ms });
    }

    pub fn iteration_start(&self, stage: CampaignStage, iteration_index: u32, chain: Vec<String>, framing: Option<String>) {
        self.emit(move |campaign_id, seq| CampaignEvent::IterationStart { campaign_id, seq, stage, iteration_index, chain, framing });
    }

    pub fn iteration_scored(&self, stage: CampaignStage, composite_score: f64) {
        self.emit(move |campaign_id, seq| CampaignEvent::IterationScored { campaign_id, seq, stage, composite_score });
    }

    pub fn adaptation(&self, stage: CampaignStage, failure_cause: impl Into<String>, next_chain: Vec<String>, actions: Vec<String>) {
        let failure_cause = failure_cause.into();
        self.emit(move |campaign_id, seq| CampaignEvent::Adaptation { campaign_id, seq, stage, failure_cause, next_chain, actions });
    }

    pub fn scan_complete(&self, stage: CampaignStage, vulnerabilities: usize) {
        self.emit(move |campaign_id, seq| CampaignEvent::Complete { campaign_id, seq, stage, vulnerabilities });
    }
}

/// `(probe_name, prompt_index, status, detector_name, round(detector_score * 1000))`
/// dedup key. A scanner run keeps one of these per emitted `ProbeResult` and
/// skips re-emitting an identical signature.
pub type ProbeResultSignature = (String, usize, String, String, i64);

pub fn probe_result_signature(probe_name: &str, prompt_index: usize, status: &str, detector_name: &str, detector_score: f64) -> ProbeResultSignature {
    (probe_name.to_string(), prompt_index, status.to_string(), detector_name.to_string(), (detector_score * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(seq: u64) -> CampaignEvent {
        CampaignEvent::PhaseProgress { campaign_id: "c1".into(), seq, stage: CampaignStage::Scan, message: format!("turn {seq}") }
    }

    fn started(seq: u64) -> CampaignEvent {
        CampaignEvent::PhaseStarted { campaign_id: "c1".into(), seq, stage: CampaignStage::Scan }
    }

    #[test]
    fn drops_oldest_progress_event_under_backpressure() {
        let bus = CampaignEventBus::new(2);
        bus.publish(progress(1));
        bus.publish(progress(2));
        bus.publish(progress(3));
        let drained = bus.drain();
        assert_eq!(drained.iter().map(|e| e.seq()).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn never_drops_non_progress_events() {
        let bus = CampaignEventBus::new(1);
        bus.publish(started(1));
        bus.publish(started(2));
        bus.publish(started(3));
        assert_eq!(bus.len(), 3);
    }

    #[test]
    fn phase_started_is_not_dropped_to_make_room_for_progress() {
        let bus = CampaignEventBus::new(1);
        bus.publish(started(1));
        bus.publish(progress(2));
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].seq(), 1);
    }

    #[test]
    fn drain_empties_the_buffer() {
        let bus = CampaignEventBus::new(4);
        bus.publish(started(1));
        assert_eq!(bus.drain().len(), 1);
        assert_eq!(bus.drain().len(), 0);
    }

    #[test]
    fn emitter_hands_out_monotonic_seq_across_clones() {
        let bus = Arc::new(CampaignEventBus::new(16));
        let seq = Arc::new(AtomicU64::new(0));
        let a = EventEmitter::new(bus.clone(), "c1", seq.clone());
        let b = a.clone();
        a.phase_started(CampaignStage::Recon);
        b.phase_started(CampaignStage::Scan);
        let drained = bus.drain();
        assert_eq!(drained[0].seq(), 0);
        assert_eq!(drained[1].seq(), 1);
    }

    #[test]
    fn probe_result_signature_rounds_score_to_three_decimals() {
        let a = probe_result_signature("dan_roleplay", 0, "pass", "dan_roleplay", 0.90001);
        let b = probe_result_signature("dan_roleplay", 0, "pass", "dan_roleplay", 0.9003);
        assert_eq!(a, b);
    }
}
