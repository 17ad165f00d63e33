use std::sync::Arc;

use tracing::debug;

use bounty_types::config::BountyConfig;
use bounty_types::events::ReactionEvent;

use crate::Result;
use crate::bounty::Bounties;
use crate::chat::ChatClient;
use crate::notices::Notices;

/// Classifies inbound reaction events and routes them to the state
/// machine or to compensating cleanup. Most reactions in a workspace have
/// nothing to do with bounties, so "not ours" is the quiet common case.
pub struct Dispatcher<C: ChatClient> {
    config: Arc<BountyConfig>,
    bounties: Bounties<C>,
    notices: Notices<C>,
}

impl<C: ChatClient> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            bounties: self.bounties.clone(),
            notices: self.notices.clone(),
        }
    }
}

impl<C: ChatClient> Dispatcher<C> {
    pub fn new(config: Arc<BountyConfig>, bounties: Bounties<C>, notices: Notices<C>) -> Self {
        Self {
            config,
            bounties,
            notices,
        }
    }

    fn relevant(event: &ReactionEvent) -> bool {
        if event.item_type != "message" {
            debug!("skipping reaction on {} item type", event.item_type);
            return false;
        }
        if event.reaction.is_empty() {
            debug!("skipping event with no reaction");
            return false;
        }
        true
    }

    pub async fn reaction_added(&self, event: &ReactionEvent) -> Result<()> {
        if !Self::relevant(event) {
            return Ok(());
        }

        if self.config.is_boost(&event.reaction) {
            return self
                .bounties
                .boost(&event.user_id, &event.channel_id, &event.message_id, &event.reaction)
                .await;
        }

        if event.reaction == self.config.claim_reaction {
            return self
                .bounties
                .soft_claim(&event.user_id, &event.channel_id, &event.message_id, &event.reaction)
                .await;
        }

        if event.reaction == self.config.release_reaction {
            return self
                .bounties
                .prepare_confirmation(
                    &event.message_id,
                    &event.user_id,
                    &event.reaction,
                    &event.channel_id,
                )
                .await;
        }

        debug!("ignoring unrelated reaction :{}:", event.reaction);
        Ok(())
    }

    /// Removing a reaction retracts any notice it produced.
    pub async fn reaction_removed(&self, event: &ReactionEvent) -> Result<()> {
        if !Self::relevant(event) {
            return Ok(());
        }
        self.notices
            .retract_if_exists(
                &event.user_id,
                &event.reaction,
                &event.message_id,
                &event.channel_id,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ChatCall, test_engine};

    fn event(reaction: &str, item_type: &str) -> ReactionEvent {
        ReactionEvent {
            user_id: "U1".into(),
            reaction: reaction.into(),
            item_type: item_type.into(),
            message_id: "M1".into(),
            channel_id: "C1".into(),
        }
    }

    #[tokio::test]
    async fn unrelated_reactions_are_ignored() {
        let (engine, chat) = test_engine();
        engine
            .dispatcher
            .reaction_added(&event("eyes", "message"))
            .await
            .unwrap();
        assert!(chat.calls().is_empty());
        assert!(engine.bounties.get_bounty("M1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_message_items_are_ignored() {
        let (engine, chat) = test_engine();
        engine
            .dispatcher
            .reaction_added(&event("coin", "file"))
            .await
            .unwrap();
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn boost_reaction_routes_to_state_machine() {
        let (engine, _chat) = test_engine();
        engine.ledger.award("U1", "C1", 5).await.unwrap();
        engine
            .dispatcher
            .reaction_added(&event("coin", "message"))
            .await
            .unwrap();
        let bounty = engine.bounties.get_bounty("M1").await.unwrap().unwrap();
        assert_eq!(bounty.current_bounty, 1);
    }

    #[tokio::test]
    async fn removal_without_notice_is_a_noop() {
        let (engine, chat) = test_engine();
        engine
            .dispatcher
            .reaction_removed(&event("coin", "message"))
            .await
            .unwrap();
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn removal_retracts_the_matching_notice() {
        let (engine, chat) = test_engine();
        // Balance of 1 cannot fund a moneybag boost: a removable notice
        // goes out.
        engine
            .dispatcher
            .reaction_added(&event("moneybag", "message"))
            .await
            .unwrap();
        assert!(chat.calls().iter().any(|c| matches!(c, ChatCall::Post { .. })));

        engine
            .dispatcher
            .reaction_removed(&event("moneybag", "message"))
            .await
            .unwrap();
        assert!(chat.calls().iter().any(|c| matches!(c, ChatCall::Delete { .. })));
    }
}
