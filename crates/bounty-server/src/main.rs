mod commands;
mod events;
mod interactions;
mod scheduler;
mod slack;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;
use tracing::info;

use bounty_engine::Engine;
use bounty_types::config::BountyConfig;

use crate::slack::SlackClient;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine<SlackClient>,
    pub slack: Arc<SlackClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "bounty_server=debug,bounty_engine=debug,bounty_store=debug,tower_http=debug"
                        .into()
                }),
        )
        .init();

    // Config
    let token = std::env::var("SLACK_BOT_TOKEN").context("SLACK_BOT_TOKEN is required")?;
    let db_path = std::env::var("BOUNTY_DB_PATH").unwrap_or_else(|_| "bounty.db".into());
    let host = std::env::var("BOUNTY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BOUNTY_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let daily_secs: u64 = std::env::var("BOUNTY_DAILY_TICK_SECS")
        .unwrap_or_else(|_| "86400".into())
        .parse()?;
    let interval_secs: u64 = std::env::var("BOUNTY_INTERVAL_TICK_SECS")
        .unwrap_or_else(|_| "604800".into())
        .parse()?;
    let config = load_config()?;

    // Init store and engine
    let store = Arc::new(bounty_store::Database::open(&PathBuf::from(&db_path))?);
    let slack = Arc::new(SlackClient::new(token));
    let engine = Engine::new(store, slack.clone(), Arc::new(config));

    let state = AppState {
        engine: engine.clone(),
        slack,
    };

    // Scheduler loops
    tokio::spawn(scheduler::run_daily_loop(
        engine.clone(),
        Duration::from_secs(daily_secs),
    ));
    tokio::spawn(scheduler::run_interval_loop(
        engine,
        Duration::from_secs(interval_secs),
    ));

    // Routes
    let app = Router::new()
        .route("/slack/events", post(events::handle_event))
        .route("/slack/commands", post(commands::handle_command))
        .route("/slack/interactions", post(interactions::handle_interaction))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Bounty server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Defaults, optionally overridden by a JSON file. The value is built once
/// here and shared read-only by every component.
fn load_config() -> anyhow::Result<BountyConfig> {
    match std::env::var("BOUNTY_CONFIG_PATH") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config from {path}"))?;
            let config = serde_json::from_str(&raw)
                .with_context(|| format!("parsing config from {path}"))?;
            info!("loaded bounty config from {}", path);
            Ok(config)
        }
        Err(_) => Ok(BountyConfig::default()),
    }
}
