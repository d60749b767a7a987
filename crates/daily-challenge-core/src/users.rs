//! Known participants and their linked LeetCode accounts.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::DatabaseError;
use crate::models::{User, UserId};

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let created_at: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

pub struct UserDirectory<'a> {
    conn: &'a Connection,
}

impl<'a> UserDirectory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or refresh the user's names. `created_at` is set once and kept.
    pub fn upsert(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO users (id, username, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name",
            params![
                user.id,
                user.username,
                user.first_name,
                user.last_name,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>, DatabaseError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, first_name, last_name, created_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Every known user in stable id order.
    pub fn roster(&self) -> Result<Vec<User>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, first_name, last_name, created_at FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

/// A user's registered LeetCode account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeetCodeProfile {
    pub user_id: UserId,
    pub leetcode_username: String,
}

pub struct LeetCodeProfiles<'a> {
    conn: &'a Connection,
}

impl<'a> LeetCodeProfiles<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Link `leetcode_username` to the user, replacing an earlier link.
    ///
    /// Fails if another user already registered the same LeetCode username.
    pub fn register(&self, user_id: UserId, leetcode_username: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO leetcode_profiles (user_id, leetcode_username, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET leetcode_username = excluded.leetcode_username",
            params![user_id, leetcode_username, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get(&self, user_id: UserId) -> Result<Option<LeetCodeProfile>, DatabaseError> {
        let profile = self
            .conn
            .query_row(
                "SELECT user_id, leetcode_username FROM leetcode_profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(LeetCodeProfile {
                        user_id: row.get(0)?,
                        leetcode_username: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    pub fn all(&self) -> Result<Vec<LeetCodeProfile>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, leetcode_username FROM leetcode_profiles ORDER BY user_id")?;
        let profiles = stmt
            .query_map([], |row| {
                Ok(LeetCodeProfile {
                    user_id: row.get(0)?,
                    leetcode_username: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }
}
