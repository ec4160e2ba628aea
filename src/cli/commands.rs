use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kestrel", version, about = "Automated AI red-teaming orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a campaign against a target to completion (headless)
    Start(StartArgs),
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Query a running or completed campaign's status
    Status(StatusArgs),
    /// Request cancellation of a running campaign
    Stop(StopArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct StartArgs {
    /// Target endpoint URL
    #[arg(short, long)]
    pub target: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQLite artifact store path
    #[arg(long, default_value = "./data/kestrel.db")]
    pub db: String,

    /// Recon depth: shallow, standard, aggressive
    #[arg(long, default_value = "standard")]
    pub recon_depth: String,

    /// LLM provider: anthropic, openai, gemini, openrouter, local
    #[arg(long, default_value = "anthropic")]
    pub provider: String,

    /// LLM model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// LLM API key (or use env vars)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Local/Ollama-compatible LLM endpoint
    #[arg(long, default_value = "http://localhost:11434/v1")]
    pub base_url: String,

    /// Bearer/API-key token for the target, if it requires authentication
    #[arg(long)]
    pub target_token: Option<String>,

    /// Block until the campaign reaches Done or Failed, printing progress
    #[arg(long)]
    pub wait: bool,

    /// Custom campaign identifier (generated if omitted)
    #[arg(long)]
    pub campaign_id: Option<String>,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite artifact store path
    #[arg(long, default_value = "./data/kestrel.db")]
    pub db: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Max campaigns running concurrently in this process
    #[arg(long, default_value = "3")]
    pub workers: usize,
}

#[derive(Args, Clone)]
pub struct StatusArgs {
    /// Campaign ID to query
    pub campaign_id: String,

    /// API server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Continuously poll until the campaign completes
    #[arg(long)]
    pub follow: bool,

    /// Poll interval in seconds
    #[arg(long, default_value = "5")]
    pub interval: u64,
}

#[derive(Args, Clone)]
pub struct StopArgs {
    /// Campaign ID to stop
    pub campaign_id: String,

    /// API server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
