use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};

use crate::config::KbConfig;
use crate::errors::KestrelError;
use crate::models::{BypassEpisode, DefenseFingerprint, HistoricalInsight, TechniqueStat};
use crate::store::ArtifactStore;

use super::embedder::{cosine_similarity, Embedder, HashedEmbedder};

/// Episodic memory of successful bypasses (C11), sharing the artifact
/// store's connection rather than opening a second database file.
pub struct BypassKnowledgeStore {
    conn: Arc<Mutex<Connection>>,
    embedder: HashedEmbedder,
    config: KbConfig,
}

impl BypassKnowledgeStore {
    pub fn new(artifact_store: &ArtifactStore, config: KbConfig) -> Self {
        let embedder = HashedEmbedder::new(config.embedding_dim);
        Self { conn: artifact_store.conn(), embedder, config }
    }

    fn document_text(episode: &BypassEpisode) -> String {
        format!(
            "{} {} {}",
            episode.defense_fingerprint.defense_response_text,
            episode.successful_technique.converter_chain.join(" "),
            episode.why_it_worked,
        )
    }

    /// Capture path (SPEC_FULL §4.11): caller must have already validated the
    /// episode (`BypassEpisode::is_valid`) before calling this.
    pub fn record(&self, episode: &BypassEpisode) -> Result<(), KestrelError> {
        let embedding = self.embedder.embed_document(&Self::document_text(episode));
        let embedding_json = serde_json::to_string(&embedding)?;
        let body = serde_json::to_string(episode)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO bypass_episodes (episode_id, campaign_id, target_domain, embedding, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(episode_id) DO UPDATE SET embedding = excluded.embedding, body = excluded.body",
            params![
                episode.episode_id,
                episode.campaign_id,
                episode.defense_fingerprint.target_domain,
                embedding_json,
                body,
                episode.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| KestrelError::Database(format!("failed to record bypass episode: {}", e)))?;
        Ok(())
    }

    /// Query path (SPEC_FULL §4.11): cosine-similarity search over episodes
    /// sharing `fingerprint.target_domain`, aggregated into a `HistoricalInsight`.
    pub fn query(&self, fingerprint: &DefenseFingerprint) -> Result<HistoricalInsight, KestrelError> {
        let query_text = format!("{} {}", fingerprint.defense_response_text, fingerprint.failed_technique_names.join(" "));
        let query_embedding = self.embedder.embed_query(&query_text);

        let rows: Vec<(String, String)> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn
                .prepare("SELECT embedding, body FROM bypass_episodes WHERE target_domain = ?1")
                .map_err(|e| KestrelError::Database(format!("failed to prepare kb query: {}", e)))?;
            let mapped = stmt
                .query_map(params![fingerprint.target_domain], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| KestrelError::Database(format!("failed to query bypass episodes: {}", e)))?;
            let mut out = Vec::new();
            for row in mapped {
                out.push(row.map_err(|e| KestrelError::Database(format!("failed to read kb row: {}", e)))?);
            }
            out
        };

        let mut matches: Vec<(f64, BypassEpisode)> = Vec::new();
        for (embedding_json, body) in rows {
            let embedding: Vec<f32> = serde_json::from_str(&embedding_json)?;
            let episode: BypassEpisode = serde_json::from_str(&body)?;
            let similarity = cosine_similarity(&query_embedding, &embedding);
            if similarity >= self.config.min_similarity {
                matches.push((similarity, episode));
            }
        }

        matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(self.config.top_k);

        Ok(aggregate(&matches))
    }
}

fn aggregate(matches: &[(f64, BypassEpisode)]) -> HistoricalInsight {
    if matches.is_empty() {
        return HistoricalInsight::empty();
    }

    let mut grouped: HashMap<Vec<String>, (u32, f64, f64)> = HashMap::new();
    for (similarity, episode) in matches {
        let chain = episode.successful_technique.converter_chain.clone();
        let entry = grouped.entry(chain).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += similarity;
        entry.2 += episode.jailbreak_score;
    }

    let mut technique_stats: Vec<TechniqueStat> = grouped
        .into_iter()
        .map(|(chain, (frequency, sum_similarity, sum_score))| TechniqueStat {
            converter_chain: chain,
            frequency,
            mean_similarity: sum_similarity / frequency as f64,
            mean_jailbreak_score: sum_score / frequency as f64,
        })
        .collect();
    technique_stats.sort_by(|a, b| a.converter_chain.cmp(&b.converter_chain));

    let recommended_chain = technique_stats
        .iter()
        .max_by(|a, b| {
            (a.frequency as f64 * a.mean_jailbreak_score)
                .partial_cmp(&(b.frequency as f64 * b.mean_jailbreak_score))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|s| s.converter_chain.clone());

    let mut framing_counts: HashMap<String, u32> = HashMap::new();
    for (_, episode) in matches {
        if let Some(framing) = &episode.successful_technique.framing {
            *framing_counts.entry(framing.clone()).or_insert(0) += 1;
        }
    }
    let recommended_framing = framing_counts.into_iter().max_by_key(|(_, count)| *count).map(|(framing, _)| framing);

    let avg_similarity = matches.iter().map(|(s, _)| s).sum::<f64>() / matches.len() as f64;
    let concentration = 1.0 / technique_stats.len().max(1) as f64;
    let confidence = (avg_similarity * concentration).clamp(0.0, 1.0);

    HistoricalInsight { technique_stats, recommended_chain, recommended_framing, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::SuccessfulTechnique;

    fn episode(id: &str, chain: Vec<&str>, score: f64, framing: &str) -> BypassEpisode {
        BypassEpisode {
            episode_id: id.into(),
            campaign_id: "c1".into(),
            created_at: Utc::now(),
            defense_fingerprint: DefenseFingerprint {
                defense_response_text: "I cannot comply with that.".into(),
                failed_technique_names: vec![],
                target_domain: "support-bot".into(),
            },
            successful_technique: SuccessfulTechnique {
                converter_chain: chain.into_iter().map(String::from).collect(),
                framing: Some(framing.into()),
                final_prompt: "...".into(),
            },
            jailbreak_score: score,
            why_it_worked: "role play framing defeated the refusal heuristic".into(),
            key_insight: "role_play + base64".into(),
            iteration_count: 2,
            target_description: "support bot".into(),
        }
    }

    #[test]
    fn record_then_query_round_trips() {
        let artifact_store = ArtifactStore::in_memory().unwrap();
        let kb = BypassKnowledgeStore::new(&artifact_store, KbConfig { min_similarity: 0.0, top_k: 5, override_confidence: 0.7, embedding_dim: 64 });

        kb.record(&episode("e1", vec!["base64"], 0.9, "role_play")).unwrap();
        kb.record(&episode("e2", vec!["base64"], 0.85, "role_play")).unwrap();
        kb.record(&episode("e3", vec!["rot13"], 0.4, "authority")).unwrap();

        let insight = kb
            .query(&DefenseFingerprint {
                defense_response_text: "I cannot comply with that.".into(),
                failed_technique_names: vec![],
                target_domain: "support-bot".into(),
            })
            .unwrap();

        assert_eq!(insight.recommended_chain, Some(vec!["base64".to_string()]));
        assert_eq!(insight.recommended_framing, Some("role_play".to_string()));
        assert!(insight.confidence > 0.0);
    }

    #[test]
    fn query_with_no_matches_returns_empty_insight() {
        let artifact_store = ArtifactStore::in_memory().unwrap();
        let kb = BypassKnowledgeStore::new(&artifact_store, KbConfig { min_similarity: 0.6, top_k: 5, override_confidence: 0.7, embedding_dim: 64 });
        let insight = kb
            .query(&DefenseFingerprint {
                defense_response_text: "whatever".into(),
                failed_technique_names: vec![],
                target_domain: "unseen-domain".into(),
            })
            .unwrap();
        assert!(insight.technique_stats.is_empty());
        assert_eq!(insight.confidence, 0.0);
    }

    #[test]
    fn query_respects_min_similarity_filter() {
        let artifact_store = ArtifactStore::in_memory().unwrap();
        let kb = BypassKnowledgeStore::new(&artifact_store, KbConfig { min_similarity: 1.1, top_k: 5, override_confidence: 0.7, embedding_dim: 64 });
        kb.record(&episode("e1", vec!["base64"], 0.9, "role_play")).unwrap();
        let insight = kb
            .query(&DefenseFingerprint {
                defense_response_text: "I cannot comply with that.".into(),
                failed_technique_names: vec![],
                target_domain: "support-bot".into(),
            })
            .unwrap();
        assert!(insight.technique_stats.is_empty());
    }
}
