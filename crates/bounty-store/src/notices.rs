use uuid::Uuid;

use bounty_types::models::BotNotice;

use crate::{Database, Result, now_rfc3339};

impl Database {
    pub fn insert_notice(
        &self,
        target_user_id: &str,
        reaction: &str,
        message_id: &str,
        channel_id: &str,
        sent_message_id: &str,
    ) -> Result<BotNotice> {
        self.with_conn(|conn| {
            let id = Uuid::new_v4().to_string();
            let created_at = now_rfc3339();
            conn.execute(
                "INSERT INTO bot_notices
                     (id, target_user_id, reaction, message_id, channel_id, sent_message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    target_user_id,
                    reaction,
                    message_id,
                    channel_id,
                    sent_message_id,
                    created_at,
                ],
            )?;
            Ok(BotNotice {
                id,
                target_user_id: target_user_id.into(),
                reaction: reaction.into(),
                message_id: message_id.into(),
                channel_id: channel_id.into(),
                sent_message_id: sent_message_id.into(),
                created_at,
            })
        })
    }

    /// Delete every notice matching the compensating-action key and return
    /// the removed rows so the caller can retract the sent messages.
    /// No match is a valid outcome, not an error.
    pub fn delete_notices(
        &self,
        target_user_id: &str,
        reaction: &str,
        message_id: &str,
        channel_id: &str,
    ) -> Result<Vec<BotNotice>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, target_user_id, reaction, message_id, channel_id,
                        sent_message_id, created_at
                 FROM bot_notices
                 WHERE target_user_id = ?1 AND reaction = ?2
                   AND message_id = ?3 AND channel_id = ?4",
            )?;
            let matched = stmt
                .query_map(
                    rusqlite::params![target_user_id, reaction, message_id, channel_id],
                    |row| {
                        Ok(BotNotice {
                            id: row.get(0)?,
                            target_user_id: row.get(1)?,
                            reaction: row.get(2)?,
                            message_id: row.get(3)?,
                            channel_id: row.get(4)?,
                            sent_message_id: row.get(5)?,
                            created_at: row.get(6)?,
                        })
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for notice in &matched {
                conn.execute("DELETE FROM bot_notices WHERE id = ?1", [&notice.id])?;
            }

            Ok(matched)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_returns_matches_and_is_noop_without() {
        let db = Database::open_in_memory().unwrap();
        db.insert_notice("U1", "coin", "M1", "C1", "ts-1").unwrap();
        db.insert_notice("U1", "coin", "M1", "C1", "ts-2").unwrap();
        db.insert_notice("U2", "coin", "M1", "C1", "ts-3").unwrap();

        let deleted = db.delete_notices("U1", "coin", "M1", "C1").unwrap();
        let ts: Vec<_> = deleted.iter().map(|n| n.sent_message_id.as_str()).collect();
        assert_eq!(ts, vec!["ts-1", "ts-2"]);

        // Already gone — second pass matches nothing.
        assert!(db.delete_notices("U1", "coin", "M1", "C1").unwrap().is_empty());
        // Other user's notice untouched.
        assert_eq!(db.delete_notices("U2", "coin", "M1", "C1").unwrap().len(), 1);
    }
}
