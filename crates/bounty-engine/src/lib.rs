pub mod blocks;
pub mod bounty;
pub mod chat;
pub mod dispatch;
pub mod ledger;
pub mod notices;
pub mod ticks;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

use thiserror::Error;

use bounty_store::{Database, StoreError};
use bounty_types::config::BountyConfig;

use crate::bounty::Bounties;
use crate::chat::ChatClient;
use crate::dispatch::Dispatcher;
use crate::ledger::Ledger;
use crate::notices::Notices;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("channel account not found for {user_id} in {channel_id}")]
    AccountNotFound { user_id: String, channel_id: String },

    #[error("bounty not found for message {0}")]
    BountyNotFound(String),

    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("reaction :{0}: is not a configured boost")]
    UnknownReaction(String),

    #[error("chat call failed: {0}")]
    Chat(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// All core components wired over one store, one chat client and one
/// immutable configuration value.
pub struct Engine<C: ChatClient> {
    pub ledger: Ledger<C>,
    pub bounties: Bounties<C>,
    pub notices: Notices<C>,
    pub dispatcher: Dispatcher<C>,
    pub config: Arc<BountyConfig>,
}

impl<C: ChatClient> Engine<C> {
    pub fn new(store: Arc<Database>, chat: Arc<C>, config: Arc<BountyConfig>) -> Self {
        let notices = Notices::new(store.clone(), chat.clone());
        let ledger = Ledger::new(store.clone(), chat.clone(), config.clone());
        let bounties = Bounties::new(
            store,
            config.clone(),
            ledger.clone(),
            notices.clone(),
        );
        let dispatcher = Dispatcher::new(config.clone(), bounties.clone(), notices.clone());
        Self {
            ledger,
            bounties,
            notices,
            dispatcher,
            config,
        }
    }
}

impl<C: ChatClient> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            bounties: self.bounties.clone(),
            notices: self.notices.clone(),
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        }
    }
}
