pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS campaigns (
    id TEXT PRIMARY KEY,
    target_url TEXT NOT NULL,
    stage TEXT NOT NULL DEFAULT 'CREATED',
    recon_artifact_id TEXT,
    scan_artifact_id TEXT,
    exploit_artifact_id TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS artifacts (
    artifact_type TEXT NOT NULL,
    scan_id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (artifact_type, scan_id)
);

CREATE TABLE IF NOT EXISTS bypass_episodes (
    episode_id TEXT PRIMARY KEY,
    campaign_id TEXT NOT NULL,
    target_domain TEXT NOT NULL,
    embedding TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_campaigns_stage ON campaigns(stage);
CREATE INDEX IF NOT EXISTS idx_artifacts_type ON artifacts(artifact_type);
CREATE INDEX IF NOT EXISTS idx_episodes_domain ON bypass_episodes(target_domain);
";
