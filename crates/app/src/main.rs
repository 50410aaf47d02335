use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nowplaying_relay::settings::{default_config_path, init_config, load_or_default};
use nowplaying_relay::{serve, AppState};
use nowplaying_relay_core::RelayConfig;
use nowplaying_relay_upstream::SpotifyClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "nowplaying-relay",
    about = "OAuth + now-playing relay with stabilized playback for overlays"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API (default).
    Run,
    /// Validate the effective configuration and print it with secrets masked.
    Check,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cmd {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Check => {
            let cfg = load_or_default(&cfg_path)?;
            check(&cfg)
        }
        Commands::Run => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            run(cfg).await
        }
    }
}

async fn run(cfg: RelayConfig) -> Result<()> {
    cfg.validate_for_serving()
        .context("configuration is not usable for serving")?;

    let client = Arc::new(
        SpotifyClient::new(&cfg.upstream, &cfg.oauth).context("failed to build upstream client")?,
    );
    info!(
        api_base = %cfg.upstream.api_base,
        timeout_ms = cfg.upstream.timeout_ms,
        stale_tolerance_ms = cfg.stabilizer.stale_tolerance_ms,
        near_end_ratio = cfg.stabilizer.near_end_ratio,
        young_progress_ms = cfg.stabilizer.young_progress_ms,
        "nowplaying-relay starting"
    );

    let state = AppState::new(cfg, client.clone(), client);
    serve(state).await
}

fn check(cfg: &RelayConfig) -> Result<()> {
    let verdict = cfg.validate_for_serving();
    let rendered = toml::to_string_pretty(&cfg.redacted())?;
    println!("{rendered}");
    match verdict {
        Ok(()) => {
            println!("configuration OK");
            Ok(())
        }
        Err(err) => Err(err).context("configuration is not usable for serving"),
    }
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
