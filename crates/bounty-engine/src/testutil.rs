//! Recording chat mock and engine factory shared by the unit tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use bounty_store::Database;
use bounty_types::config::BountyConfig;

use crate::Engine;
use crate::chat::{ChatClient, OutboundMessage, SentMessage};

#[derive(Debug, Clone)]
pub enum ChatCall {
    Post {
        channel: String,
        thread_ts: Option<String>,
        text: Option<String>,
        blocks: Option<Value>,
        ts: String,
    },
    Ephemeral {
        channel: String,
        user: String,
        thread_ts: Option<String>,
        text: Option<String>,
        blocks: Option<Value>,
    },
    Delete {
        channel: String,
        ts: String,
    },
}

#[derive(Default)]
pub struct MockChat {
    calls: Mutex<Vec<ChatCall>>,
    counter: AtomicU64,
}

impl MockChat {
    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: ChatCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ChatClient for MockChat {
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: OutboundMessage,
    ) -> anyhow::Result<SentMessage> {
        let ts = format!("ts-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.record(ChatCall::Post {
            channel: channel_id.into(),
            thread_ts: thread_ts.map(String::from),
            text: message.text,
            blocks: message.blocks,
            ts: ts.clone(),
        });
        Ok(SentMessage { ts })
    }

    async fn post_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        thread_ts: Option<&str>,
        message: OutboundMessage,
    ) -> anyhow::Result<()> {
        self.record(ChatCall::Ephemeral {
            channel: channel_id.into(),
            user: user_id.into(),
            thread_ts: thread_ts.map(String::from),
            text: message.text,
            blocks: message.blocks,
        });
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, ts: &str) -> anyhow::Result<()> {
        self.record(ChatCall::Delete {
            channel: channel_id.into(),
            ts: ts.into(),
        });
        Ok(())
    }
}

pub fn test_engine() -> (Engine<MockChat>, Arc<MockChat>) {
    let store = Arc::new(Database::open_in_memory().expect("in-memory store"));
    let chat = Arc::new(MockChat::default());
    let config = Arc::new(BountyConfig::default());
    (Engine::new(store, chat.clone(), config), chat)
}
