use std::time::Duration;

use tracing::{info, warn};

use bounty_engine::Engine;
use bounty_engine::chat::ChatClient;

/// Runs the daily leaderboard/reset/decay/income cycle on a fixed
/// period. The first tick fires immediately and is consumed so the
/// cycle only runs after a full period has elapsed.
pub async fn run_daily_loop<C: ChatClient>(engine: Engine<C>, period: Duration) {
    info!("daily tick every {:?}", period);
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Err(e) = engine.daily_tick().await {
            warn!("daily tick failed: {}", e);
        }
    }
}

/// Runs the interval leaderboard and interval counter reset.
pub async fn run_interval_loop<C: ChatClient>(engine: Engine<C>, period: Duration) {
    info!("interval tick every {:?}", period);
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Err(e) = engine.interval_tick().await {
            warn!("interval tick failed: {}", e);
        }
    }
}
