use serde_json::{Value, json};

use bounty_engine::chat::{ChatClient, OutboundMessage, SentMessage};

/// Slack Web API client. One instance is shared by the engine (outbound
/// messages) and the interaction handler (`response_url` replies).
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }

    async fn api_call(&self, method: &str, body: Value) -> anyhow::Result<Value> {
        let response: Value = self
            .http
            .post(format!("https://slack.com/api/{method}"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Slack reports application errors in-band with HTTP 200.
        if response["ok"].as_bool() != Some(true) {
            anyhow::bail!(
                "slack {method} failed: {}",
                response["error"].as_str().unwrap_or("unknown error")
            );
        }
        Ok(response)
    }

    /// Reply to an interaction through its `response_url`, replacing the
    /// original ephemeral message.
    pub async fn respond(&self, response_url: &str, blocks: Value) -> anyhow::Result<()> {
        self.http
            .post(response_url)
            .json(&json!({
                "response_type": "ephemeral",
                "replace_original": true,
                "delete_original": false,
                "blocks": blocks,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl ChatClient for SlackClient {
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: OutboundMessage,
    ) -> anyhow::Result<SentMessage> {
        let mut body = json!({ "channel": channel_id });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        if let Some(text) = &message.text {
            body["text"] = json!(text);
        }
        if let Some(blocks) = &message.blocks {
            body["blocks"] = blocks.clone();
        }

        let response = self.api_call("chat.postMessage", body).await?;
        let ts = response["ts"]
            .as_str()
            .or_else(|| response["message"]["ts"].as_str())
            .unwrap_or_default()
            .to_owned();
        Ok(SentMessage { ts })
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        thread_ts: Option<&str>,
        message: OutboundMessage,
    ) -> anyhow::Result<()> {
        let mut body = json!({ "channel": channel_id, "user": user_id });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        if let Some(text) = &message.text {
            body["text"] = json!(text);
        }
        if let Some(blocks) = &message.blocks {
            body["blocks"] = blocks.clone();
        }

        self.api_call("chat.postEphemeral", body).await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, ts: &str) -> anyhow::Result<()> {
        self.api_call(
            "chat.delete",
            json!({ "channel": channel_id, "ts": ts, "as_user": false }),
        )
        .await?;
        Ok(())
    }
}
