use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use proctored_player::Config;
use proctored_player::models::PlaybackBootstrap;
use proctored_player::player::attacher::resolve_play_url;
use proctored_player::ui::surface::rate_menu;

#[derive(Debug, Parser)]
#[command(
    name = "proctored-player",
    about = "Print the enforcement a playback bootstrap would get"
)]
struct Args {
    /// Playback bootstrap JSON as issued by the backend
    bootstrap: PathBuf,
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("proctored_player=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Args {
        bootstrap: bootstrap_path,
        config: config_path,
    } = Args::parse();

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    debug!("Using API base {}", config.network.api_base_url);

    let contents = std::fs::read_to_string(&bootstrap_path)
        .with_context(|| format!("Failed to read {}", bootstrap_path.display()))?;
    let bootstrap: PlaybackBootstrap =
        serde_json::from_str(&contents).context("Failed to parse playback bootstrap")?;
    info!("Loaded bootstrap from {}", bootstrap_path.display());

    let policy = bootstrap.normalized_policy();
    let play_url = match resolve_play_url(Some(&bootstrap.play_url), &config.network.api_base_url)
    {
        Ok(url) => json!(url.as_str()),
        Err(e) => json!({ "error": e.to_string(), "fatal": e.fatal_reason().as_str() }),
    };

    let rates = if policy.speed_locked() {
        Vec::new()
    } else {
        rate_menu(policy.max_rate())
    };

    let summary = json!({
        "access_mode": bootstrap.access_mode.as_str(),
        "sessionless": bootstrap
            .token
            .is_sessionless(&config.network.sessionless_prefix),
        "expires_at": bootstrap.expires_at_utc().map(|at| at.to_rfc3339()),
        "play_url": play_url,
        "policy": policy,
        "enforcement": {
            "seek_mode": policy.seek.mode,
            "seek_blocked": policy.seek_blocked(),
            "grace_seconds": policy.grace_seconds(),
            "max_rate": policy.max_rate(),
            "speed_locked": policy.speed_locked(),
            "rate_menu": rates,
            "monitoring_enabled": policy.monitoring_enabled,
            "reports_violations": policy.reports_violations(),
        },
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
