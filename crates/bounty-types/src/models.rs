use serde::{Deserialize, Serialize};

/// Per-user, per-channel point balance and spend/earn counters.
///
/// Identity is `(user_id, channel_id)`; the surrogate `id` only exists so
/// rows have a primary key. `balance` is never persisted negative — every
/// debit is guarded at the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    pub balance: i64,
    pub spent_today: i64,
    pub spent_this_interval: i64,
    pub spent_all_time: i64,
    pub earned_today: i64,
    pub earned_this_interval: i64,
    pub earned_all_time: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BountyStatus {
    Pending,
    Awarded,
}

impl BountyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Awarded => "awarded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "awarded" => Some(Self::Awarded),
            _ => None,
        }
    }
}

/// A point bounty pledged against one message. One bounty per message.
///
/// `claim_candidate` is advisory and mutable while pending; `awarded_to`
/// is written exactly once by the pending→awarded status flip and never
/// changes afterwards, and neither does `current_bounty`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBounty {
    pub message_id: String,
    pub channel_id: String,
    /// First user to boost the message; the only one who may release it.
    pub owner_id: String,
    pub current_bounty: i64,
    pub status: BountyStatus,
    pub claim_candidate: Option<String>,
    pub awarded_to: Option<String>,
    pub created_at: String,
}

/// Compensating-action log entry for a removable bot notice.
///
/// Keyed by (target user, reaction, message, channel) so that removing the
/// triggering reaction can find and retract the sent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotNotice {
    pub id: String,
    pub target_user_id: String,
    pub reaction: String,
    pub message_id: String,
    pub channel_id: String,
    /// Chat-platform handle (Slack ts) of the sent notice.
    pub sent_message_id: String,
    pub created_at: String,
}

/// Which earned counter a leaderboard ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderMetric {
    EarnedToday,
    EarnedThisInterval,
    EarnedAllTime,
}

impl LeaderMetric {
    pub fn value_of(&self, account: &ChannelAccount) -> i64 {
        match self {
            Self::EarnedToday => account.earned_today,
            Self::EarnedThisInterval => account.earned_this_interval,
            Self::EarnedAllTime => account.earned_all_time,
        }
    }
}
