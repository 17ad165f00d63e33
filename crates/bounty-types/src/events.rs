use serde::{Deserialize, Serialize};

/// A reaction added to / removed from an item, normalized from the chat
/// platform's webhook shape. `item_type` is kept verbatim — the dispatcher
/// only acts on `"message"` items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub user_id: String,
    pub reaction: String,
    pub item_type: String,
    pub message_id: String,
    pub channel_id: String,
}

/// An interactive confirmation submission from the award-bounty card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmSubmission {
    pub message_id: String,
    pub channel_id: String,
    /// User picked in the card's user-select, if any.
    pub target_user_id: Option<String>,
    /// User who clicked confirm.
    pub current_user_id: String,
}
