use clap::Parser;
use kestrel::{cli, errors};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        cli::Commands::Start(args) => cli::start::handle_start(args).await,
        cli::Commands::Serve(args) => cli::serve::handle_serve(args).await,
        cli::Commands::Status(args) => cli::status::handle_status(args).await,
        cli::Commands::Stop(args) => cli::stop::handle_stop(args).await,
        cli::Commands::Validate(args) => cli::validate::handle_validate(args).await,
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            let exit_code = match &e {
                errors::KestrelError::Config(_) => 2,
                errors::KestrelError::Authentication(_) => 4,
                errors::KestrelError::InvalidTarget(_) => 5,
                errors::KestrelError::PolicyVeto(_) => 6,
                errors::KestrelError::ScanDegraded(_) => 7,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    }
}
