use std::future::Future;

use serde_json::Value;

/// Handle to a message posted in chat (the platform's ts), kept so the
/// notice tracker can retract it later.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub ts: String,
}

/// Body of an outbound chat call: plain text, Block Kit payload, or both.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub text: Option<String>,
    pub blocks: Option<Value>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            blocks: None,
        }
    }

    pub fn blocks(blocks: Value) -> Self {
        Self {
            text: None,
            blocks: Some(blocks),
        }
    }
}

/// Outbound chat surface. The server wires in the real Slack Web API
/// client; tests inject a recording mock.
pub trait ChatClient: Send + Sync + 'static {
    /// Post to a channel, optionally threaded. Passing a user id as
    /// `channel_id` opens a DM, the same way the Slack API does.
    fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: OutboundMessage,
    ) -> impl Future<Output = anyhow::Result<SentMessage>> + Send;

    /// Post a message only `user_id` can see.
    fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        thread_ts: Option<&str>,
        message: OutboundMessage,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn delete_message(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
