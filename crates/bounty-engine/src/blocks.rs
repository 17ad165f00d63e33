//! Block Kit payload builders. Pure functions from domain values to the
//! JSON the chat platform renders; layouts follow the original cards.

use serde_json::{Value, json};

use bounty_types::config::BountyConfig;
use bounty_types::models::{ChannelAccount, LeaderMetric};

/// The interactive award card: a user-select pre-filled with the claim
/// candidate and a confirm button carrying the message id.
pub fn award_card(amount: i64, candidate: Option<&str>, message_id: &str) -> Value {
    let mut accessory = json!({
        "action_id": "user_to_award",
        "type": "users_select",
        "placeholder": { "type": "plain_text", "text": "Select a user" },
    });
    if let Some(candidate) = candidate {
        accessory["initial_user"] = json!(candidate);
    }

    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": "Award Bounty", "emoji": true },
        },
        {
            "type": "section",
            "block_id": "award_user",
            "text": {
                "type": "mrkdwn",
                "text": format!("Award the {amount} point bounty to:"),
            },
            "accessory": accessory,
        },
        {
            "type": "actions",
            // Maps to the interaction endpoint.
            "block_id": "award_bounty_confirm",
            "elements": [
                {
                    "type": "button",
                    "text": { "type": "plain_text", "emoji": true, "text": "Confirm" },
                    "value": message_id,
                    "style": "primary",
                }
            ],
        },
    ])
}

pub fn award_success(message: &str) -> Value {
    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": "Award Bounty", "emoji": true },
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!(":white_check_mark: {message}") },
        },
        { "type": "divider" },
    ])
}

/// The award card again, with the validation error appended.
pub fn award_validation(
    amount: i64,
    candidate: Option<&str>,
    message_id: &str,
    error: &str,
) -> Value {
    let Value::Array(mut blocks) = award_card(amount, candidate, message_id) else {
        unreachable!("award_card always builds an array");
    };
    blocks.push(json!({ "type": "divider" }));
    blocks.push(json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": format!(":warning: _*{error}*_") },
    }));
    blocks.push(json!({ "type": "divider" }));
    Value::Array(blocks)
}

/// Placeholder shown while a confirmation is being processed.
pub fn loader() -> Value {
    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": "Award Bounty", "emoji": true },
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": ":hourglass_flowing_sand:" },
        },
        { "type": "divider" },
    ])
}

pub fn leaderboard(title: &str, leaders: &[ChannelAccount], metric: LeaderMetric) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": title },
        }),
        json!({ "type": "divider" }),
    ];

    if leaders.is_empty() {
        blocks.push(json!({
            "type": "section",
            "fields": [{ "type": "mrkdwn", "text": "_No bounties claimed yet_" }],
        }));
    } else {
        for (i, account) in leaders.iter().enumerate() {
            blocks.push(json!({
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("{}) <@{}>", i + 1, account.user_id) },
                    { "type": "mrkdwn", "text": format!("{} _points_", metric.value_of(account)) },
                ],
            }));
        }
    }

    Value::Array(blocks)
}

/// The `/bountyme` status card.
pub fn status_card(account: &ChannelAccount, claim_reaction: &str) -> Value {
    let cell = |v: i64| {
        json!({
            "type": "plain_text",
            "text": if v > 0 { v.to_string() } else { "-".into() },
        })
    };
    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": format!("Your Bounty: :{claim_reaction}:") },
        },
        { "type": "divider" },
        {
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": "*Current Balance*" },
                cell(account.balance),
            ],
        },
        {
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": "*Spent Today*" },
                cell(account.spent_today),
                { "type": "mrkdwn", "text": "*Spent this Interval*" },
                cell(account.spent_this_interval),
                { "type": "mrkdwn", "text": "*Spent All Time*" },
                cell(account.spent_all_time),
            ],
        },
        { "type": "divider" },
        {
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": "Earned Today" },
                cell(account.earned_today),
                { "type": "mrkdwn", "text": "Earned this Interval" },
                cell(account.earned_this_interval),
                { "type": "mrkdwn", "text": "Earned All Time" },
                cell(account.earned_all_time),
            ],
        },
    ])
}

/// The `/bountyemotes` boost tier listing.
pub fn emotes_card(config: &BountyConfig) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": "Bounty Emotes" },
        }),
        json!({ "type": "divider" }),
    ];
    for tier in &config.boost_reactions {
        blocks.push(json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Boost by {}*", tier.value) },
                { "type": "mrkdwn", "text": format!(":{}:", tier.emote) },
            ],
        }));
    }
    blocks.push(json!({ "type": "divider" }));
    blocks.push(json!({
        "type": "section",
        "fields": [
            { "type": "mrkdwn", "text": "*Claim a task*" },
            { "type": "mrkdwn", "text": format!(":{}:", config.claim_reaction) },
            { "type": "mrkdwn", "text": "*Release the bounty*" },
            { "type": "mrkdwn", "text": format!(":{}:", config.release_reaction) },
        ],
    }));
    Value::Array(blocks)
}

/// The `/bountyconfig` dump of the active configuration.
pub fn config_card(config: &BountyConfig) -> Value {
    let pretty = serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".into());
    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": "Bounty Configuration" },
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("```{pretty}```") },
        },
        { "type": "divider" },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn award_card_prefills_candidate() {
        let card = award_card(3, Some("U2"), "M1");
        let rendered = card.to_string();
        assert!(rendered.contains("\"initial_user\":\"U2\""));
        assert!(rendered.contains("Award the 3 point bounty to:"));
        assert!(rendered.contains("\"value\":\"M1\""));

        let without = award_card(3, None, "M1");
        assert!(!without.to_string().contains("initial_user"));
    }

    #[test]
    fn validation_appends_the_error() {
        let card = award_validation(3, None, "M1", "You need to pick a user.");
        let rendered = card.to_string();
        assert!(rendered.contains(":warning:"));
        assert!(rendered.contains("You need to pick a user."));
    }

    #[test]
    fn empty_leaderboard_gets_placeholder() {
        let board = leaderboard("Today's Leaderboard", &[], LeaderMetric::EarnedToday);
        assert!(board.to_string().contains("No bounties claimed yet"));
    }
}
