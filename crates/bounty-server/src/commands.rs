use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use bounty_engine::blocks;
use bounty_types::models::LeaderMetric;

use crate::AppState;

/// Slash command payload. Slack delivers these as form-encoded bodies;
/// only the fields the commands actually use are kept.
#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    pub channel_id: String,
    pub user_id: String,
}

/// Handles `/bountyme`, `/bountyemotes`, `/bountyconfig` and
/// `/bountydaily`. All replies are ephemeral, so the response is sent
/// inline in the 200 body.
pub async fn handle_command(
    State(state): State<AppState>,
    axum::extract::Form(cmd): axum::extract::Form<SlashCommand>,
) -> Json<Value> {
    let blocks = match cmd.command.as_str() {
        "/bountyme" => state
            .engine
            .ledger
            .get_or_create(&cmd.user_id, &cmd.channel_id)
            .await
            .map(|account| blocks::status_card(&account, &state.engine.config.claim_reaction)),
        "/bountyemotes" => Ok(blocks::emotes_card(&state.engine.config)),
        "/bountyconfig" => Ok(blocks::config_card(&state.engine.config)),
        "/bountydaily" => state
            .engine
            .ledger
            .leaders(&cmd.channel_id, LeaderMetric::EarnedToday)
            .await
            .map(|leaders| {
                blocks::leaderboard("Today's Leaderboard", &leaders, LeaderMetric::EarnedToday)
            }),
        other => {
            return ephemeral_text(&format!("Unknown command: {other}"));
        }
    };

    match blocks {
        Ok(blocks) => Json(json!({ "response_type": "ephemeral", "blocks": blocks })),
        Err(e) => {
            error!("{} failed for {}: {}", cmd.command, cmd.user_id, e);
            ephemeral_text("Something went wrong handling that command.")
        }
    }
}

fn ephemeral_text(text: &str) -> Json<Value> {
    Json(json!({ "response_type": "ephemeral", "text": text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_command_form_parses() {
        let body = "command=%2Fbountyme&channel_id=C1&user_id=U1&team_id=T1&text=";
        let cmd: SlashCommand = serde_urlencoded::from_str(body).unwrap();
        assert_eq!(cmd.command, "/bountyme");
        assert_eq!(cmd.channel_id, "C1");
        assert_eq!(cmd.user_id, "U1");
    }
}
