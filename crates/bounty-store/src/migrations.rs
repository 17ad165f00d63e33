use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS channel_accounts (
            id                   TEXT PRIMARY KEY,
            user_id              TEXT NOT NULL,
            channel_id           TEXT NOT NULL,
            balance              INTEGER NOT NULL DEFAULT 0,
            spent_today          INTEGER NOT NULL DEFAULT 0,
            spent_this_interval  INTEGER NOT NULL DEFAULT 0,
            spent_all_time       INTEGER NOT NULL DEFAULT 0,
            earned_today         INTEGER NOT NULL DEFAULT 0,
            earned_this_interval INTEGER NOT NULL DEFAULT 0,
            earned_all_time      INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, channel_id)
        );

        CREATE INDEX IF NOT EXISTS idx_accounts_channel
            ON channel_accounts(channel_id);

        CREATE TABLE IF NOT EXISTS message_bounties (
            message_id       TEXT PRIMARY KEY,
            channel_id       TEXT NOT NULL,
            owner_id         TEXT NOT NULL,
            current_bounty   INTEGER NOT NULL DEFAULT 0,
            status           TEXT NOT NULL DEFAULT 'pending',
            claim_candidate  TEXT,
            awarded_to       TEXT,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS bot_notices (
            id               TEXT PRIMARY KEY,
            target_user_id   TEXT NOT NULL,
            reaction         TEXT NOT NULL,
            message_id       TEXT NOT NULL,
            channel_id       TEXT NOT NULL,
            sent_message_id  TEXT NOT NULL,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notices_key
            ON bot_notices(target_user_id, reaction, message_id, channel_id);
        ",
    )?;

    info!("Bounty store migrations complete");
    Ok(())
}
