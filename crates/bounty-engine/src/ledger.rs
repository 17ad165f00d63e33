use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use bounty_store::Database;
use bounty_types::config::BountyConfig;
use bounty_types::models::{ChannelAccount, LeaderMetric};

use crate::chat::{ChatClient, OutboundMessage};
use crate::{EngineError, Result, blocks};

/// Outcome of a batch operation over all accounts. Per-account failures
/// never abort the batch; they are collected here so partial application
/// stays observable instead of vanishing into fire-and-forget fan-out.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub applied: usize,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub user_id: String,
    pub channel_id: String,
    pub error: String,
}

/// Sole owner of `ChannelAccount` mutation.
pub struct Ledger<C: ChatClient> {
    store: Arc<Database>,
    chat: Arc<C>,
    config: Arc<BountyConfig>,
}

impl<C: ChatClient> Clone for Ledger<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            chat: self.chat.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: ChatClient> Ledger<C> {
    pub fn new(store: Arc<Database>, chat: Arc<C>, config: Arc<BountyConfig>) -> Self {
        Self { store, chat, config }
    }

    pub(crate) fn chat(&self) -> &C {
        &self.chat
    }

    /// Existing account, or a fresh one seeded with the starting balance.
    /// The welcome DM goes out only on creation, never on later lookups,
    /// and a failure to deliver it does not fail the creation.
    pub async fn get_or_create(&self, user_id: &str, channel_id: &str) -> Result<ChannelAccount> {
        let (user, channel) = (user_id.to_owned(), channel_id.to_owned());
        let starting_balance = self.config.daily_income;
        let (account, created) = self
            .store
            .call(move |db| db.get_or_insert_account(&user, &channel, starting_balance))
            .await?;

        if created {
            info!("created channel account for {} in {}", user_id, channel_id);
            let welcome = format!(
                "Welcome to Bounties! You'll start off with {} point and can earn more by \
                 completing bounties. Use slash commands in the relevant channel to see more details:\n\
                 \t- _/bountyemotes_ to see the full list of emotes\n\
                 \t- _/bountyme_ to see your details\n\
                 \t- _/bountydaily_ to see the current leaderboard.\n\n\
                 Check out the following page for more info: {}",
                starting_balance, self.config.documentation_url,
            );
            if let Err(e) = self
                .chat
                .post_message(user_id, None, OutboundMessage::text(welcome))
                .await
            {
                warn!("failed to send welcome message to {}: {}", user_id, e);
            }
        }

        Ok(account)
    }

    /// Debit `amount` from the account. The balance guard runs inside the
    /// store update, so a concurrent spend can never overdraw; a zero-row
    /// update is disambiguated by re-read into not-found vs insufficient.
    pub async fn spend(&self, user_id: &str, channel_id: &str, amount: i64) -> Result<ChannelAccount> {
        let (user, channel) = (user_id.to_owned(), channel_id.to_owned());
        let outcome = self
            .store
            .call(move |db| {
                match db.try_spend(&user, &channel, amount)? {
                    Some(updated) => Ok(Ok(updated)),
                    // Guard matched nothing: look at the row to say why.
                    None => Ok(Err(db.get_account(&user, &channel)?)),
                }
            })
            .await?;

        match outcome {
            Ok(updated) => Ok(updated),
            Err(Some(account)) => Err(EngineError::InsufficientBalance {
                required: amount,
                available: account.balance,
            }),
            Err(None) => Err(EngineError::AccountNotFound {
                user_id: user_id.into(),
                channel_id: channel_id.into(),
            }),
        }
    }

    /// Credit `amount` to the account, creating it first if needed.
    pub async fn award(&self, user_id: &str, channel_id: &str, amount: i64) -> Result<ChannelAccount> {
        self.get_or_create(user_id, channel_id).await?;

        let (user, channel) = (user_id.to_owned(), channel_id.to_owned());
        self.store
            .call(move |db| db.credit(&user, &channel, amount))
            .await?
            .ok_or_else(|| EngineError::AccountNotFound {
                user_id: user_id.into(),
                channel_id: channel_id.into(),
            })
    }

    pub async fn reset_daily(&self) -> Result<usize> {
        let reset = self.store.call(|db| db.reset_daily_counters()).await?;
        info!("reset daily counters on {} accounts", reset);
        Ok(reset)
    }

    pub async fn reset_interval(&self) -> Result<usize> {
        let reset = self.store.call(|db| db.reset_interval_counters()).await?;
        info!("reset interval counters on {} accounts", reset);
        Ok(reset)
    }

    /// Clamp-at-zero decay across every account with a positive balance.
    pub async fn apply_decay(&self, decay_amount: i64) -> Result<BatchReport> {
        let keys = self.store.call(|db| db.positive_balance_keys()).await?;
        if keys.is_empty() {
            debug!("no channel accounts require decay");
            return Ok(BatchReport::default());
        }
        self.run_batch(keys, move |db, user, channel| {
            db.decay_account(user, channel, decay_amount).map(|_| ())
        })
        .await
    }

    /// Unconditional income for every account, zero balances included.
    pub async fn apply_income(&self, income_amount: i64) -> Result<BatchReport> {
        let keys = self.store.call(|db| db.all_account_keys()).await?;
        self.run_batch(keys, move |db, user, channel| {
            db.income_account(user, channel, income_amount).map(|_| ())
        })
        .await
    }

    /// Per-account fan-out: every update is dispatched, all are awaited,
    /// and individual failures land in the report rather than aborting
    /// the rest of the batch.
    async fn run_batch<F>(&self, keys: Vec<(String, String)>, op: F) -> Result<BatchReport>
    where
        F: Fn(&Database, &str, &str) -> bounty_store::Result<()> + Clone + Send + 'static,
    {
        let mut report = BatchReport {
            attempted: keys.len(),
            ..Default::default()
        };

        let updates = keys.into_iter().map(|(user, channel)| {
            let op = op.clone();
            let store = self.store.clone();
            async move {
                let (u, c) = (user.clone(), channel.clone());
                let result = store.call(move |db| op(db, &u, &c)).await;
                (user, channel, result)
            }
        });

        for (user_id, channel_id, result) in join_all(updates).await {
            match result {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!("batch update failed for {} in {}: {}", user_id, channel_id, e);
                    report.failures.push(BatchFailure {
                        user_id,
                        channel_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Channel leaderboard for one earned metric, capped by config.
    pub async fn leaders(&self, channel_id: &str, metric: LeaderMetric) -> Result<Vec<ChannelAccount>> {
        let channel = channel_id.to_owned();
        let limit = self.config.leaders_to_show;
        Ok(self
            .store
            .call(move |db| db.leaders(&channel, metric, limit))
            .await?)
    }

    pub async fn distinct_channels(&self) -> Result<Vec<String>> {
        Ok(self.store.call(|db| db.distinct_channels()).await?)
    }

    /// Render and post a channel leaderboard.
    pub async fn post_leaderboard(
        &self,
        channel_id: &str,
        metric: LeaderMetric,
        title: &str,
    ) -> Result<()> {
        let leaders = self.leaders(channel_id, metric).await?;
        let payload = OutboundMessage::blocks(blocks::leaderboard(title, &leaders, metric));
        self.chat
            .post_message(channel_id, None, payload)
            .await
            .map_err(EngineError::Chat)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ChatCall, test_engine};

    #[tokio::test]
    async fn welcome_is_sent_exactly_once() {
        let (engine, chat) = test_engine();

        let account = engine.ledger.get_or_create("U1", "C1").await.unwrap();
        assert_eq!(account.balance, 1); // seeded with daily income
        engine.ledger.get_or_create("U1", "C1").await.unwrap();

        let dms: Vec<_> = chat
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ChatCall::Post { channel, .. } if channel == "U1"))
            .collect();
        assert_eq!(dms.len(), 1);
    }

    #[tokio::test]
    async fn spend_distinguishes_missing_from_insufficient() {
        let (engine, _chat) = test_engine();

        let err = engine.ledger.spend("U1", "C1", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::AccountNotFound { .. }));

        engine.ledger.get_or_create("U1", "C1").await.unwrap();
        let err = engine.ledger.spend("U1", "C1", 99).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientBalance { required: 99, available: 1 }
        ));
    }

    #[tokio::test]
    async fn award_creates_account_when_missing() {
        let (engine, _chat) = test_engine();
        let account = engine.ledger.award("U1", "C1", 3).await.unwrap();
        // starting balance (1) + awarded 3
        assert_eq!(account.balance, 4);
        assert_eq!(account.earned_today, 3);
        assert_eq!(account.earned_all_time, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_spends_do_not_lose_updates() {
        let (engine, _chat) = test_engine();
        engine.ledger.get_or_create("U1", "C1").await.unwrap();
        engine.ledger.award("U1", "C1", 19).await.unwrap(); // balance 20

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let ledger = engine.ledger.clone();
                tokio::spawn(async move { ledger.spend("U1", "C1", 2).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let account = engine.ledger.get_or_create("U1", "C1").await.unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.spent_today, 20);
    }

    #[tokio::test]
    async fn decay_report_covers_positive_balances_only() {
        let (engine, _chat) = test_engine();
        engine.ledger.award("U1", "C1", 4).await.unwrap(); // balance 5
        engine.ledger.get_or_create("U2", "C1").await.unwrap();
        engine.ledger.spend("U2", "C1", 1).await.unwrap(); // balance 0

        let report = engine.ledger.apply_decay(2).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.applied, 1);
        assert!(report.failures.is_empty());

        assert_eq!(engine.ledger.get_or_create("U1", "C1").await.unwrap().balance, 3);
        assert_eq!(engine.ledger.get_or_create("U2", "C1").await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn decay_clamps_at_zero() {
        let (engine, _chat) = test_engine();
        engine.ledger.get_or_create("U1", "C1").await.unwrap(); // balance 1
        engine.ledger.apply_decay(2).await.unwrap();
        assert_eq!(engine.ledger.get_or_create("U1", "C1").await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn income_reaches_zero_balance_accounts() {
        let (engine, _chat) = test_engine();
        engine.ledger.get_or_create("U1", "C1").await.unwrap();
        engine.ledger.spend("U1", "C1", 1).await.unwrap(); // balance 0

        let report = engine.ledger.apply_income(3).await.unwrap();
        assert_eq!(report.applied, 1);
        let account = engine.ledger.get_or_create("U1", "C1").await.unwrap();
        assert_eq!(account.balance, 3);
        // Income is not an earn.
        assert_eq!(account.earned_today, 0);
    }
}
