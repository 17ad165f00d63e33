use axum::extract::{Form, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use bounty_engine::blocks;
use bounty_engine::bounty::ConfirmOutcome;
use bounty_types::events::ConfirmSubmission;

use crate::AppState;

/// Interactivity payloads arrive form-encoded with a single `payload`
/// field holding the JSON body.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    response_url: String,
    user: Id,
    channel: Id,
    #[serde(default)]
    actions: Vec<Action>,
    #[serde(default)]
    state: Value,
}

#[derive(Debug, Deserialize)]
struct Id {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Action {
    #[serde(default)]
    block_id: String,
    #[serde(default)]
    value: String,
}

impl InteractionPayload {
    /// The confirm button carries the bounty's message id as its value.
    fn confirmed_message_id(&self) -> Option<&str> {
        self.actions
            .iter()
            .find(|a| a.block_id == "award_bounty_confirm")
            .map(|a| a.value.as_str())
    }

    /// The user picked in the award card's select, if any.
    fn selected_user(&self) -> Option<String> {
        self.state["values"]["award_user"]["user_to_award"]["selected_user"]
            .as_str()
            .map(str::to_owned)
    }
}

pub async fn handle_interaction(
    State(state): State<AppState>,
    Form(form): Form<InteractionForm>,
) -> StatusCode {
    let payload: InteractionPayload = match serde_json::from_str(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("undecodable interaction payload: {}", e);
            return StatusCode::OK;
        }
    };

    // Interactions other than the confirm button (e.g. changing the
    // user-select) need nothing beyond the ack.
    let Some(message_id) = payload.confirmed_message_id().map(str::to_owned) else {
        return StatusCode::OK;
    };

    // Swap the card for a loader while the award settles.
    if let Err(e) = state.slack.respond(&payload.response_url, blocks::loader()).await {
        warn!("loader update failed for {}: {}", message_id, e);
    }

    let submission = ConfirmSubmission {
        message_id: message_id.clone(),
        channel_id: payload.channel.id.clone(),
        target_user_id: payload.selected_user(),
        current_user_id: payload.user.id.clone(),
    };

    let blocks = match state.engine.bounties.confirm_award(&submission).await {
        Ok(ConfirmOutcome::Awarded { recipient, amount }) => blocks::award_success(&format!(
            "{amount} point bounty awarded to <@{recipient}>"
        )),
        Ok(ConfirmOutcome::AlreadyAwarded { recipient, .. }) => blocks::award_success(&format!(
            "This bounty has already been awarded to <@{recipient}>."
        )),
        Ok(ConfirmOutcome::Validation {
            error,
            amount,
            candidate,
        }) => blocks::award_validation(amount, candidate.as_deref(), &message_id, &error),
        Err(e) => {
            error!("confirm_award failed for {}: {}", message_id, e);
            blocks::award_validation(
                0,
                None,
                &message_id,
                "Something went wrong awarding the bounty. Please try again.",
            )
        }
    };

    if let Err(e) = state.slack.respond(&payload.response_url, blocks).await {
        error!("response_url update failed for {}: {}", message_id, e);
    }

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_extracts_confirm_and_selection() {
        let raw = r#"{
            "response_url": "https://hooks.slack.test/r1",
            "user": { "id": "U1" },
            "channel": { "id": "C1" },
            "actions": [
                { "block_id": "award_bounty_confirm", "action_id": "confirm", "value": "1700000000.000100" }
            ],
            "state": {
                "values": {
                    "award_user": {
                        "user_to_award": { "type": "users_select", "selected_user": "U2" }
                    }
                }
            }
        }"#;
        let payload: InteractionPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.confirmed_message_id(), Some("1700000000.000100"));
        assert_eq!(payload.selected_user(), Some("U2".into()));
    }

    #[test]
    fn select_change_has_no_confirmed_message() {
        let raw = r#"{
            "response_url": "https://hooks.slack.test/r1",
            "user": { "id": "U1" },
            "channel": { "id": "C1" },
            "actions": [
                { "block_id": "award_user", "action_id": "user_to_award", "value": "" }
            ],
            "state": {}
        }"#;
        let payload: InteractionPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.confirmed_message_id(), None);
        assert_eq!(payload.selected_user(), None);
    }
}
