use std::sync::Arc;

use tracing::{debug, warn};

use bounty_store::Database;

use crate::chat::{ChatClient, OutboundMessage};
use crate::{EngineError, Result};

/// Tracks removable bot notices so that withdrawing the triggering
/// reaction retracts the message they produced. Sole owner of `BotNotice`
/// mutation.
pub struct Notices<C: ChatClient> {
    store: Arc<Database>,
    chat: Arc<C>,
}

impl<C: ChatClient> Clone for Notices<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            chat: self.chat.clone(),
        }
    }
}

impl<C: ChatClient> Notices<C> {
    pub fn new(store: Arc<Database>, chat: Arc<C>) -> Self {
        Self { store, chat }
    }

    /// Post a threaded warning tied to `(user, reaction, message, channel)`
    /// and record it for later retraction. Without a reaction there is
    /// nothing to tie the lifetime to, so the text goes out as a plain DM
    /// and nothing is recorded.
    pub async fn send_removable(
        &self,
        target_user_id: &str,
        reaction: Option<&str>,
        message_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<()> {
        let Some(reaction) = reaction else {
            self.chat
                .post_message(target_user_id, None, OutboundMessage::text(text))
                .await
                .map_err(EngineError::Chat)?;
            return Ok(());
        };

        let body = format!(
            "{text}\n\n_Removing the :{reaction}: emote will delete this message._"
        );
        let sent = self
            .chat
            .post_message(channel_id, Some(message_id), OutboundMessage::text(body))
            .await
            .map_err(EngineError::Chat)?;

        let (user, reaction, message, channel) = (
            target_user_id.to_owned(),
            reaction.to_owned(),
            message_id.to_owned(),
            channel_id.to_owned(),
        );
        self.store
            .call(move |db| db.insert_notice(&user, &reaction, &message, &channel, &sent.ts))
            .await?;
        Ok(())
    }

    /// Delete any notices matching the key and best-effort retract the
    /// chat messages they point at. Retraction is advisory cleanup: chat
    /// failures are logged and never propagated, and no match is a no-op.
    pub async fn retract_if_exists(
        &self,
        target_user_id: &str,
        reaction: &str,
        message_id: &str,
        channel_id: &str,
    ) -> Result<()> {
        let (user, reaction_owned, message, channel) = (
            target_user_id.to_owned(),
            reaction.to_owned(),
            message_id.to_owned(),
            channel_id.to_owned(),
        );
        let deleted = self
            .store
            .call(move |db| db.delete_notices(&user, &reaction_owned, &message, &channel))
            .await?;

        if deleted.is_empty() {
            debug!(
                "no notices to retract for {} :{}: on {}",
                target_user_id, reaction, message_id
            );
            return Ok(());
        }

        for notice in deleted {
            if let Err(e) = self
                .chat
                .delete_message(&notice.channel_id, &notice.sent_message_id)
                .await
            {
                warn!(
                    "failed to retract notice {} in {}: {}",
                    notice.sent_message_id, notice.channel_id, e
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{ChatCall, test_engine};

    #[tokio::test]
    async fn removable_notice_is_recorded_and_retracted() {
        let (engine, chat) = test_engine();

        engine
            .notices
            .send_removable("U1", Some("coin"), "M1", "C1", "Heads up <@U1>!")
            .await
            .unwrap();

        // Threaded into the triggering message with the retraction hint.
        let calls = chat.calls();
        let ts = match &calls[0] {
            ChatCall::Post { channel, thread_ts, text, ts, .. } => {
                assert_eq!(channel, "C1");
                assert_eq!(thread_ts.as_deref(), Some("M1"));
                assert!(text.as_deref().unwrap().contains(":coin:"));
                ts.clone()
            }
            other => panic!("unexpected call: {other:?}"),
        };

        engine
            .notices
            .retract_if_exists("U1", "coin", "M1", "C1")
            .await
            .unwrap();
        assert!(chat.calls().iter().any(
            |c| matches!(c, ChatCall::Delete { channel, ts: deleted } if channel == "C1" && *deleted == ts)
        ));
    }

    #[tokio::test]
    async fn retract_missing_is_noop() {
        let (engine, chat) = test_engine();
        engine
            .notices
            .retract_if_exists("U1", "coin", "M1", "C1")
            .await
            .unwrap();
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn notice_without_reaction_is_a_plain_dm() {
        let (engine, chat) = test_engine();
        engine
            .notices
            .send_removable("U1", None, "M1", "C1", "hello")
            .await
            .unwrap();

        let calls = chat.calls();
        assert!(
            matches!(&calls[0], ChatCall::Post { channel, thread_ts, .. } if channel == "U1" && thread_ts.is_none())
        );

        // Nothing recorded, so nothing to retract.
        engine
            .notices
            .retract_if_exists("U1", "coin", "M1", "C1")
            .await
            .unwrap();
        assert_eq!(chat.calls().len(), 1);
    }
}
