use std::sync::Arc;

use tracing::{debug, info, warn};

use bounty_store::Database;
use bounty_types::config::BountyConfig;
use bounty_types::events::ConfirmSubmission;
use bounty_types::models::{BountyStatus, MessageBounty};

use crate::chat::{ChatClient, OutboundMessage};
use crate::ledger::Ledger;
use crate::notices::Notices;
use crate::{EngineError, Result, blocks};

/// Result of an explicit award confirmation. Validation problems are
/// outcomes, not errors — the confirmer gets the card back with guidance
/// and nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Bounty moved to awarded and the recipient was credited.
    Awarded { recipient: String, amount: i64 },
    /// Bounty was already awarded; repeated confirmations are safe and
    /// keep returning the same recipient.
    AlreadyAwarded { recipient: String, amount: i64 },
    /// The submission was rejected; `candidate` re-fills the card.
    Validation {
        error: String,
        amount: i64,
        candidate: Option<String>,
    },
}

/// Owns the `MessageBounty` lifecycle: pending → awarded, one way, once.
pub struct Bounties<C: ChatClient> {
    store: Arc<Database>,
    config: Arc<BountyConfig>,
    ledger: Ledger<C>,
    notices: Notices<C>,
}

impl<C: ChatClient> Clone for Bounties<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            ledger: self.ledger.clone(),
            notices: self.notices.clone(),
        }
    }
}

impl<C: ChatClient> Bounties<C> {
    pub fn new(
        store: Arc<Database>,
        config: Arc<BountyConfig>,
        ledger: Ledger<C>,
        notices: Notices<C>,
    ) -> Self {
        Self {
            store,
            config,
            ledger,
            notices,
        }
    }

    pub(crate) async fn get_bounty(&self, message_id: &str) -> Result<Option<MessageBounty>> {
        let message = message_id.to_owned();
        Ok(self.store.call(move |db| db.get_bounty(&message)).await?)
    }

    /// Increase the bounty on a message by the reaction's configured
    /// value, debiting the booster. Creates the bounty on first boost.
    pub async fn boost(
        &self,
        user_id: &str,
        channel_id: &str,
        message_id: &str,
        reaction: &str,
    ) -> Result<()> {
        let value = self
            .config
            .boost_value(reaction)
            .ok_or_else(|| EngineError::UnknownReaction(reaction.into()))?;

        let account = self.ledger.get_or_create(user_id, channel_id).await?;
        if account.balance < value {
            self.notices
                .send_removable(
                    user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!(
                        "Heads up <@{user_id}>! Your balance isn't high enough to award :{reaction}:."
                    ),
                )
                .await?;
            return Ok(());
        }

        let (message, channel, user) = (
            message_id.to_owned(),
            channel_id.to_owned(),
            user_id.to_owned(),
        );
        let (bounty, _created) = self
            .store
            .call(move |db| db.get_or_insert_bounty(&message, &channel, &user))
            .await?;

        if bounty.status == BountyStatus::Awarded {
            let recipient = bounty.awarded_to.unwrap_or_default();
            self.notices
                .send_removable(
                    user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!(
                        "Heads up <@{user_id}>! This bounty has already been awarded to <@{recipient}>."
                    ),
                )
                .await?;
            return Ok(());
        }

        // Debit first; the guarded spend re-checks the balance, so a
        // concurrent boost racing us simply turns into the notice path.
        match self.ledger.spend(user_id, channel_id, value).await {
            Ok(_) => {}
            Err(EngineError::InsufficientBalance { .. }) => {
                self.notices
                    .send_removable(
                        user_id,
                        Some(reaction),
                        message_id,
                        channel_id,
                        &format!(
                            "Heads up <@{user_id}>! Your balance isn't high enough to award :{reaction}:."
                        ),
                    )
                    .await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let message = message_id.to_owned();
        let boosted = self
            .store
            .call(move |db| db.boost_bounty(&message, value))
            .await?;

        let Some(boosted) = boosted else {
            // Awarded between our status check and the boost. The debit
            // had no effect to fund, so give it back.
            warn!(
                "bounty {} awarded mid-boost; refunding {} to {}",
                message_id, value, user_id
            );
            let (user, channel) = (user_id.to_owned(), channel_id.to_owned());
            self.store
                .call(move |db| db.refund_spend(&user, &channel, value))
                .await?;
            self.notices
                .send_removable(
                    user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!("Heads up <@{user_id}>! This bounty has already been awarded."),
                )
                .await?;
            return Ok(());
        };

        self.chat()
            .post_message(
                channel_id,
                Some(message_id),
                OutboundMessage::text(format!(
                    "<@{user_id}> has boosted the bounty to {}.",
                    boosted.current_bounty
                )),
            )
            .await
            .map_err(EngineError::Chat)?;
        Ok(())
    }

    /// Record the acting user as the advisory claim candidate. Binding
    /// only happens at confirmation.
    pub async fn soft_claim(
        &self,
        user_id: &str,
        channel_id: &str,
        message_id: &str,
        reaction: &str,
    ) -> Result<()> {
        let claimable = match self.get_bounty(message_id).await? {
            Some(bounty) => bounty.status == BountyStatus::Pending,
            None => false,
        };
        if !claimable {
            self.notices
                .send_removable(
                    user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!("Heads up <@{user_id}>! This bounty is not able to be claimed."),
                )
                .await?;
            return Ok(());
        }

        let (message, user) = (message_id.to_owned(), user_id.to_owned());
        if !self
            .store
            .call(move |db| db.set_claim_candidate(&message, &user))
            .await?
        {
            // Awarded since the check above.
            debug!("bounty {} no longer pending when claiming", message_id);
            return Ok(());
        }

        self.chat()
            .post_message(
                channel_id,
                Some(message_id),
                OutboundMessage::text(format!("<@{user_id}> is ready to claim the bounty.")),
            )
            .await
            .map_err(EngineError::Chat)?;
        Ok(())
    }

    /// The owner added the release reaction: send them the confirmation
    /// card, pre-filled with the current claim candidate.
    pub async fn prepare_confirmation(
        &self,
        message_id: &str,
        current_user_id: &str,
        reaction: &str,
        channel_id: &str,
    ) -> Result<()> {
        let Some(bounty) = self.get_bounty(message_id).await? else {
            // People reuse the release emote on unrelated messages.
            debug!(
                "no bounty for {} when preparing award by {}",
                message_id, current_user_id
            );
            return Ok(());
        };

        if bounty.status != BountyStatus::Pending {
            let recipient = bounty.awarded_to.unwrap_or_default();
            self.notices
                .send_removable(
                    current_user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!(
                        "Heads up <@{current_user_id}>! This bounty has already been awarded to <@{recipient}>."
                    ),
                )
                .await?;
            return Ok(());
        }

        if bounty.owner_id != current_user_id {
            self.notices
                .send_removable(
                    current_user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!(
                        "Heads up <@{current_user_id}>! This bounty can only be awarded by <@{}>.",
                        bounty.owner_id
                    ),
                )
                .await?;
            return Ok(());
        }

        if bounty.claim_candidate.as_deref() == Some(current_user_id) {
            self.notices
                .send_removable(
                    current_user_id,
                    Some(reaction),
                    message_id,
                    channel_id,
                    &format!("Heads up <@{current_user_id}>! You cannot award a bounty to yourself."),
                )
                .await?;
            return Ok(());
        }

        let card = blocks::award_card(
            bounty.current_bounty,
            bounty.claim_candidate.as_deref(),
            message_id,
        );
        self.chat()
            .post_ephemeral(
                channel_id,
                current_user_id,
                Some(message_id),
                OutboundMessage::blocks(card),
            )
            .await
            .map_err(EngineError::Chat)?;
        Ok(())
    }

    /// The one operation that moves value. Status flips to awarded
    /// *before* the credit, conditionally on still being pending, so two
    /// concurrent confirmations can never both credit: the loser observes
    /// the flip and returns the idempotent already-awarded outcome.
    ///
    /// A crash between flip and credit leaves an awarded-but-uncredited
    /// bounty; that is detectable by reconciling awarded bounties against
    /// earned counters and is accepted in preference to any double-credit
    /// risk (see DESIGN.md).
    pub async fn confirm_award(&self, submission: &ConfirmSubmission) -> Result<ConfirmOutcome> {
        let bounty = self
            .get_bounty(&submission.message_id)
            .await?
            // Hard error: this path only exists behind the explicit
            // confirmation card, never from ambient reactions.
            .ok_or_else(|| EngineError::BountyNotFound(submission.message_id.clone()))?;

        if bounty.status == BountyStatus::Awarded {
            return Ok(ConfirmOutcome::AlreadyAwarded {
                recipient: bounty.awarded_to.unwrap_or_default(),
                amount: bounty.current_bounty,
            });
        }

        let Some(target) = submission.target_user_id.as_deref() else {
            return Ok(ConfirmOutcome::Validation {
                error: "You need to pick a user to award the bounty.".into(),
                amount: bounty.current_bounty,
                candidate: bounty.claim_candidate.clone(),
            });
        };

        if bounty.owner_id != submission.current_user_id {
            return Ok(ConfirmOutcome::Validation {
                error: format!("This bounty can only be awarded by <@{}>.", bounty.owner_id),
                amount: bounty.current_bounty,
                candidate: Some(target.to_owned()),
            });
        }

        if target == submission.current_user_id {
            return Ok(ConfirmOutcome::Validation {
                error: "You cannot award a bounty to yourself. Please select a different user."
                    .into(),
                amount: bounty.current_bounty,
                candidate: Some(target.to_owned()),
            });
        }

        let (message, channel, recipient) = (
            submission.message_id.clone(),
            submission.channel_id.clone(),
            target.to_owned(),
        );
        let won = self
            .store
            .call(move |db| db.flip_to_awarded(&message, &channel, &recipient))
            .await?;

        // Credit the amount the flip settled at, not the pre-flip read: a
        // boost landing between the two would otherwise leave an awarded
        // bounty recording more than was ever paid out.
        let Some(settled) = won else {
            // Lost a concurrent confirmation; report what actually stuck.
            let settled = self
                .get_bounty(&submission.message_id)
                .await?
                .ok_or_else(|| EngineError::BountyNotFound(submission.message_id.clone()))?;
            return Ok(ConfirmOutcome::AlreadyAwarded {
                recipient: settled.awarded_to.unwrap_or_default(),
                amount: settled.current_bounty,
            });
        };

        self.ledger
            .award(target, &submission.channel_id, settled.current_bounty)
            .await?;

        info!(
            "bounty {} awarded to {} for {}",
            submission.message_id, target, settled.current_bounty
        );

        self.chat()
            .post_message(
                &submission.channel_id,
                Some(&submission.message_id),
                OutboundMessage::text(format!(
                    "<@{}> has awarded the bounty of {} to <@{target}>.",
                    submission.current_user_id, settled.current_bounty
                )),
            )
            .await
            .map_err(EngineError::Chat)?;

        Ok(ConfirmOutcome::Awarded {
            recipient: target.to_owned(),
            amount: settled.current_bounty,
        })
    }

    fn chat(&self) -> &C {
        self.ledger.chat()
    }
}
