//! Scheduler-invoked entry points. The server's interval loops call these;
//! tests call them directly.

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use bounty_types::models::LeaderMetric;

use crate::chat::ChatClient;
use crate::ledger::BatchReport;
use crate::{Engine, Result};

impl<C: ChatClient> Engine<C> {
    /// Daily tickover: post today's leaderboard to every channel, then
    /// reset the daily counters and apply decay and income. The three
    /// ledger passes run sequentially — decay and income are cumulative
    /// on the same balance field.
    pub async fn daily_tick(&self) -> Result<()> {
        let channels = self.ledger.distinct_channels().await?;
        if channels.is_empty() {
            debug!("no channels for daily tick");
            return Ok(());
        }

        let posts = channels.iter().map(|channel| {
            self.ledger
                .post_leaderboard(channel, LeaderMetric::EarnedToday, "Today's Leaderboard")
        });
        for (channel, result) in channels.iter().zip(join_all(posts).await) {
            if let Err(e) = result {
                warn!("failed to post daily leaderboard to {}: {}", channel, e);
            }
        }

        self.ledger.reset_daily().await?;
        log_batch("decay", self.ledger.apply_decay(self.config.daily_decay).await?);
        log_batch("income", self.ledger.apply_income(self.config.daily_income).await?);
        Ok(())
    }

    /// Interval tickover: post the final leaderboard for the closing
    /// interval to every channel, then reset the interval counters.
    pub async fn interval_tick(&self) -> Result<()> {
        let channels = self.ledger.distinct_channels().await?;
        if channels.is_empty() {
            debug!("no channels for interval tick");
            return Ok(());
        }

        let posts = channels.iter().map(|channel| {
            self.ledger.post_leaderboard(
                channel,
                LeaderMetric::EarnedThisInterval,
                "Final Leaderboard Results",
            )
        });
        for (channel, result) in channels.iter().zip(join_all(posts).await) {
            if let Err(e) = result {
                warn!("failed to post interval leaderboard to {}: {}", channel, e);
            }
        }

        self.ledger.reset_interval().await?;
        Ok(())
    }
}

fn log_batch(what: &str, report: BatchReport) {
    if report.failures.is_empty() {
        info!("applied {} to {} accounts", what, report.applied);
    } else {
        warn!(
            "applied {} to {} of {} accounts ({} failures)",
            what,
            report.applied,
            report.attempted,
            report.failures.len()
        );
    }
}
