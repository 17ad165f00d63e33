use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use bounty_types::models::{ChannelAccount, LeaderMetric};

use crate::{Database, Result, StoreError, expect_one, now_rfc3339};

impl Database {
    pub fn get_account(&self, user_id: &str, channel_id: &str) -> Result<Option<ChannelAccount>> {
        self.with_conn(|conn| query_account(conn, user_id, channel_id))
    }

    pub fn insert_account(
        &self,
        user_id: &str,
        channel_id: &str,
        starting_balance: i64,
    ) -> Result<ChannelAccount> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channel_accounts (id, user_id, channel_id, balance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    channel_id,
                    starting_balance,
                    now_rfc3339(),
                ],
            )?;
            query_account(conn, user_id, channel_id)?
                .ok_or(StoreError::Consistency { context: "insert_account", affected: 0 })
        })
    }

    /// Fetch the account, inserting a fresh one when absent. The check and
    /// the insert run under one lock hold, so only one caller can ever see
    /// `created = true` for a given key.
    pub fn get_or_insert_account(
        &self,
        user_id: &str,
        channel_id: &str,
        starting_balance: i64,
    ) -> Result<(ChannelAccount, bool)> {
        self.with_conn(|conn| {
            if let Some(existing) = query_account(conn, user_id, channel_id)? {
                return Ok((existing, false));
            }
            conn.execute(
                "INSERT INTO channel_accounts (id, user_id, channel_id, balance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    channel_id,
                    starting_balance,
                    now_rfc3339(),
                ],
            )?;
            let created = query_account(conn, user_id, channel_id)?
                .ok_or(StoreError::Consistency { context: "get_or_insert_account", affected: 0 })?;
            Ok((created, true))
        })
    }

    /// Debit `amount` and bump the spent counters in one guarded update.
    ///
    /// The `balance >= amount` guard lives in the WHERE clause, so the
    /// balance can never go negative and a concurrent loser simply matches
    /// zero rows. Returns the updated account, or `None` when no row
    /// matched the guard (absent account or insufficient balance — the
    /// caller disambiguates by re-reading).
    pub fn try_spend(
        &self,
        user_id: &str,
        channel_id: &str,
        amount: i64,
    ) -> Result<Option<ChannelAccount>> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE channel_accounts SET
                     balance = balance - ?3,
                     spent_today = spent_today + ?3,
                     spent_this_interval = spent_this_interval + ?3,
                     spent_all_time = spent_all_time + ?3
                 WHERE user_id = ?1 AND channel_id = ?2 AND balance >= ?3",
                rusqlite::params![user_id, channel_id, amount],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            expect_one("try_spend", affected)?;
            query_account(conn, user_id, channel_id)
        })
    }

    /// Reverse a spend whose intended effect never happened (compensating
    /// action, e.g. the bounty got awarded between the debit and the
    /// boost). Counters clamp at zero in case a reset ran in between.
    pub fn refund_spend(&self, user_id: &str, channel_id: &str, amount: i64) -> Result<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE channel_accounts SET
                     balance = balance + ?3,
                     spent_today = MAX(spent_today - ?3, 0),
                     spent_this_interval = MAX(spent_this_interval - ?3, 0),
                     spent_all_time = MAX(spent_all_time - ?3, 0)
                 WHERE user_id = ?1 AND channel_id = ?2",
                rusqlite::params![user_id, channel_id, amount],
            )?;
            expect_one("refund_spend", affected)
        })
    }

    /// Credit `amount` and bump the earned counters in one guarded update.
    /// Returns `None` when the account does not exist.
    pub fn credit(
        &self,
        user_id: &str,
        channel_id: &str,
        amount: i64,
    ) -> Result<Option<ChannelAccount>> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE channel_accounts SET
                     balance = balance + ?3,
                     earned_today = earned_today + ?3,
                     earned_this_interval = earned_this_interval + ?3,
                     earned_all_time = earned_all_time + ?3
                 WHERE user_id = ?1 AND channel_id = ?2",
                rusqlite::params![user_id, channel_id, amount],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            expect_one("credit", affected)?;
            query_account(conn, user_id, channel_id)
        })
    }

    pub fn reset_daily_counters(&self) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE channel_accounts SET spent_today = 0, earned_today = 0",
                [],
            )?)
        })
    }

    pub fn reset_interval_counters(&self) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE channel_accounts SET spent_this_interval = 0, earned_this_interval = 0",
                [],
            )?)
        })
    }

    /// Keys of all accounts with a positive balance (decay targets).
    pub fn positive_balance_keys(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, channel_id FROM channel_accounts WHERE balance > 0",
            )?;
            let keys = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }

    pub fn all_account_keys(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, channel_id FROM channel_accounts")?;
            let keys = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }

    /// Clamp-at-zero decay for one account. The `balance > 0` guard makes
    /// the update a no-op if another task already drained the balance.
    pub fn decay_account(&self, user_id: &str, channel_id: &str, amount: i64) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE channel_accounts SET balance = MAX(balance - ?3, 0)
                 WHERE user_id = ?1 AND channel_id = ?2 AND balance > 0",
                rusqlite::params![user_id, channel_id, amount],
            )?)
        })
    }

    /// Unconditional income credit for one account (balance only — income
    /// is not "earned" and does not touch the earned counters).
    pub fn income_account(&self, user_id: &str, channel_id: &str, amount: i64) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE channel_accounts SET balance = balance + ?3
                 WHERE user_id = ?1 AND channel_id = ?2",
                rusqlite::params![user_id, channel_id, amount],
            )?)
        })
    }

    /// Up to `limit` accounts in the channel with `metric > 0`, descending
    /// by that metric; ties break on insertion order (rowid).
    pub fn leaders(
        &self,
        channel_id: &str,
        metric: LeaderMetric,
        limit: usize,
    ) -> Result<Vec<ChannelAccount>> {
        let column = match metric {
            LeaderMetric::EarnedToday => "earned_today",
            LeaderMetric::EarnedThisInterval => "earned_this_interval",
            LeaderMetric::EarnedAllTime => "earned_all_time",
        };
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} FROM channel_accounts
                 WHERE channel_id = ?1 AND {column} > 0
                 ORDER BY {column} DESC, rowid ASC
                 LIMIT ?2",
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![channel_id, limit as i64], map_account)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn distinct_channels(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT channel_id FROM channel_accounts GROUP BY channel_id ORDER BY MIN(rowid)",
            )?;
            let channels = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(channels)
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, channel_id, balance, spent_today, \
     spent_this_interval, spent_all_time, earned_today, earned_this_interval, \
     earned_all_time, created_at";

fn map_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelAccount> {
    Ok(ChannelAccount {
        id: row.get(0)?,
        user_id: row.get(1)?,
        channel_id: row.get(2)?,
        balance: row.get(3)?,
        spent_today: row.get(4)?,
        spent_this_interval: row.get(5)?,
        spent_all_time: row.get(6)?,
        earned_today: row.get(7)?,
        earned_this_interval: row.get(8)?,
        earned_all_time: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn query_account(
    conn: &Connection,
    user_id: &str,
    channel_id: &str,
) -> Result<Option<ChannelAccount>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM channel_accounts WHERE user_id = ?1 AND channel_id = ?2"
    );
    let account = conn
        .query_row(&sql, rusqlite::params![user_id, channel_id], map_account)
        .optional()?;
    Ok(account)
}
