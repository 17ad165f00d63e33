use rusqlite::{Connection, OptionalExtension};

use bounty_types::models::{BountyStatus, MessageBounty};

use crate::{Database, Result, StoreError, expect_one, now_rfc3339};

impl Database {
    pub fn get_bounty(&self, message_id: &str) -> Result<Option<MessageBounty>> {
        self.with_conn(|conn| query_bounty(conn, message_id))
    }

    /// Create a pending bounty at zero. The first booster becomes the owner.
    pub fn insert_bounty(
        &self,
        message_id: &str,
        channel_id: &str,
        owner_id: &str,
    ) -> Result<MessageBounty> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_bounties
                     (message_id, channel_id, owner_id, current_bounty, status, created_at)
                 VALUES (?1, ?2, ?3, 0, 'pending', ?4)",
                rusqlite::params![message_id, channel_id, owner_id, now_rfc3339()],
            )?;
            query_bounty(conn, message_id)?
                .ok_or(StoreError::Consistency { context: "insert_bounty", affected: 0 })
        })
    }

    /// Fetch the bounty for a message, creating a pending one owned by
    /// `owner_id` when absent. Check and insert share one lock hold.
    pub fn get_or_insert_bounty(
        &self,
        message_id: &str,
        channel_id: &str,
        owner_id: &str,
    ) -> Result<(MessageBounty, bool)> {
        self.with_conn(|conn| {
            if let Some(existing) = query_bounty(conn, message_id)? {
                return Ok((existing, false));
            }
            conn.execute(
                "INSERT INTO message_bounties
                     (message_id, channel_id, owner_id, current_bounty, status, created_at)
                 VALUES (?1, ?2, ?3, 0, 'pending', ?4)",
                rusqlite::params![message_id, channel_id, owner_id, now_rfc3339()],
            )?;
            let created = query_bounty(conn, message_id)?
                .ok_or(StoreError::Consistency { context: "get_or_insert_bounty", affected: 0 })?;
            Ok((created, true))
        })
    }

    /// Increment `current_bounty`, guarded on the bounty still being
    /// pending. Returns the updated bounty, or `None` when the guard
    /// matched nothing (missing or already awarded).
    pub fn boost_bounty(&self, message_id: &str, amount: i64) -> Result<Option<MessageBounty>> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE message_bounties SET current_bounty = current_bounty + ?2
                 WHERE message_id = ?1 AND status = 'pending'",
                rusqlite::params![message_id, amount],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            expect_one("boost_bounty", affected)?;
            query_bounty(conn, message_id)
        })
    }

    /// Record `user_id` as the advisory claim candidate. Pending-only;
    /// later claims overwrite earlier ones.
    pub fn set_claim_candidate(&self, message_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE message_bounties SET claim_candidate = ?2
                 WHERE message_id = ?1 AND status = 'pending'",
                rusqlite::params![message_id, user_id],
            )?;
            if affected == 0 {
                return Ok(false);
            }
            expect_one("set_claim_candidate", affected)?;
            Ok(true)
        })
    }

    /// The one-way pending → awarded flip, conditional on the row still
    /// being pending. Exactly one of any number of concurrent callers can
    /// win; everyone else matches zero rows and gets `None`. The winner
    /// gets the settled row, re-read under the same lock hold, so the
    /// returned `current_bounty` already includes any boost that landed
    /// before the flip and no boost can land after it.
    pub fn flip_to_awarded(
        &self,
        message_id: &str,
        channel_id: &str,
        target_user_id: &str,
    ) -> Result<Option<MessageBounty>> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE message_bounties SET status = 'awarded', awarded_to = ?3
                 WHERE message_id = ?1 AND channel_id = ?2 AND status = 'pending'",
                rusqlite::params![message_id, channel_id, target_user_id],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            expect_one("flip_to_awarded", affected)?;
            query_bounty(conn, message_id)?
                .ok_or(StoreError::Consistency { context: "flip_to_awarded", affected: 0 })
                .map(Some)
        })
    }
}

fn query_bounty(conn: &Connection, message_id: &str) -> Result<Option<MessageBounty>> {
    let mut stmt = conn.prepare(
        "SELECT message_id, channel_id, owner_id, current_bounty, status,
                claim_candidate, awarded_to, created_at
         FROM message_bounties WHERE message_id = ?1",
    )?;

    let bounty = stmt
        .query_row([message_id], |row| {
            let raw_status: String = row.get(4)?;
            let status = BountyStatus::parse(&raw_status).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("unknown bounty status: {raw_status}").into(),
                )
            })?;
            Ok(MessageBounty {
                message_id: row.get(0)?,
                channel_id: row.get(1)?,
                owner_id: row.get(2)?,
                current_bounty: row.get(3)?,
                status,
                claim_candidate: row.get(5)?,
                awarded_to: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(bounty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn boost_accumulates_while_pending() {
        let db = db();
        db.insert_bounty("M1", "C1", "U1").unwrap();

        let bounty = db.boost_bounty("M1", 3).unwrap().unwrap();
        assert_eq!(bounty.current_bounty, 3);
        assert_eq!(bounty.status, BountyStatus::Pending);

        let bounty = db.boost_bounty("M1", 2).unwrap().unwrap();
        assert_eq!(bounty.current_bounty, 5);

        assert!(db.boost_bounty("M9", 1).unwrap().is_none());
    }

    #[test]
    fn flip_wins_exactly_once() {
        let db = db();
        db.insert_bounty("M1", "C1", "U1").unwrap();
        db.boost_bounty("M1", 3).unwrap();

        let settled = db.flip_to_awarded("M1", "C1", "U2").unwrap().unwrap();
        assert_eq!(settled.status, BountyStatus::Awarded);
        assert_eq!(settled.awarded_to.as_deref(), Some("U2"));
        assert_eq!(settled.current_bounty, 3);
        // Second flip loses — the pending guard no longer matches.
        assert!(db.flip_to_awarded("M1", "C1", "U3").unwrap().is_none());

        let bounty = db.get_bounty("M1").unwrap().unwrap();
        assert_eq!(bounty.status, BountyStatus::Awarded);
        assert_eq!(bounty.awarded_to.as_deref(), Some("U2"));
        assert_eq!(bounty.current_bounty, 3);
    }

    #[test]
    fn awarded_bounty_rejects_boost_and_claim() {
        let db = db();
        db.insert_bounty("M1", "C1", "U1").unwrap();
        db.flip_to_awarded("M1", "C1", "U2").unwrap();

        assert!(db.boost_bounty("M1", 1).unwrap().is_none());
        assert!(!db.set_claim_candidate("M1", "U3").unwrap());

        let bounty = db.get_bounty("M1").unwrap().unwrap();
        assert_eq!(bounty.current_bounty, 0);
        assert_eq!(bounty.awarded_to.as_deref(), Some("U2"));
    }

    #[test]
    fn claim_candidate_is_overwritable() {
        let db = db();
        db.insert_bounty("M1", "C1", "U1").unwrap();
        assert!(db.set_claim_candidate("M1", "U2").unwrap());
        assert!(db.set_claim_candidate("M1", "U3").unwrap());
        let bounty = db.get_bounty("M1").unwrap().unwrap();
        assert_eq!(bounty.claim_candidate.as_deref(), Some("U3"));
        assert_eq!(bounty.awarded_to, None);
    }
}
