use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use bounty_types::events::ReactionEvent;

use crate::AppState;

/// Top-level Events API envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Slack's one-time endpoint handshake.
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    ReactionAdded(ReactionPayload),
    ReactionRemoved(ReactionPayload),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct ReactionPayload {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub reaction: String,
    #[serde(default)]
    pub item: ReactionItem,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
}

impl ReactionPayload {
    fn into_event(self) -> ReactionEvent {
        ReactionEvent {
            user_id: self.user,
            reaction: self.reaction,
            item_type: self.item.kind,
            message_id: self.item.ts,
            channel_id: self.item.channel,
        }
    }
}

/// Webhook entry point. Always acks with 200 once the event has been
/// handled — Slack retries non-200s and a retry would replay side
/// effects, so handler failures are logged instead of surfaced.
pub async fn handle_event(
    State(state): State<AppState>,
    Json(envelope): Json<EventEnvelope>,
) -> impl IntoResponse {
    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback { event } => {
            match event {
                SlackEvent::ReactionAdded(payload) => {
                    let event = payload.into_event();
                    if let Err(e) = state.engine.dispatcher.reaction_added(&event).await {
                        error!("reaction_added failed for {}: {}", event.message_id, e);
                    }
                }
                SlackEvent::ReactionRemoved(payload) => {
                    let event = payload.into_event();
                    if let Err(e) = state.engine.dispatcher.reaction_removed(&event).await {
                        error!("reaction_removed failed for {}: {}", event.message_id, e);
                    }
                }
                SlackEvent::Other => debug!("ignoring unhandled event type"),
            }
            StatusCode::OK.into_response()
        }
        EventEnvelope::Other => StatusCode::OK.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_added_payload_parses() {
        let raw = r#"{
            "type": "event_callback",
            "event": {
                "type": "reaction_added",
                "user": "U1",
                "reaction": "coin",
                "item": { "type": "message", "channel": "C1", "ts": "1700000000.000100" }
            }
        }"#;
        let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();
        let EventEnvelope::EventCallback { event: SlackEvent::ReactionAdded(payload) } = envelope
        else {
            panic!("wrong variant");
        };
        let event = payload.into_event();
        assert_eq!(event.user_id, "U1");
        assert_eq!(event.reaction, "coin");
        assert_eq!(event.item_type, "message");
        assert_eq!(event.message_id, "1700000000.000100");
        assert_eq!(event.channel_id, "C1");
    }

    #[test]
    fn unknown_event_types_fall_through() {
        let raw = r#"{
            "type": "event_callback",
            "event": { "type": "app_mention", "user": "U1" }
        }"#;
        let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            envelope,
            EventEnvelope::EventCallback { event: SlackEvent::Other }
        ));

        let raw = r#"{ "type": "app_rate_limited" }"#;
        assert!(matches!(
            serde_json::from_str::<EventEnvelope>(raw).unwrap(),
            EventEnvelope::Other
        ));
    }

    #[test]
    fn url_verification_parses() {
        let raw = r#"{ "type": "url_verification", "challenge": "abc123" }"#;
        assert!(matches!(
            serde_json::from_str::<EventEnvelope>(raw).unwrap(),
            EventEnvelope::UrlVerification { challenge } if challenge == "abc123"
        ));
    }
}
