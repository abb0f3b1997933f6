use crate::models::FriendRequestOutcome;
use crate::queries::OptionalExt;
use crate::{Database, from_ms, now_ms};
use agora_types::models::{
    DEFAULT_COLOR, Friend, FriendRequest, FriendshipStatus, NotifyTarget,
};
use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    /// Open a pending request unless the unordered pair already has a
    /// pending or accepted row. Check and insert happen under one lock.
    pub fn send_friend_request(&self, requester: &str, addressee: &str) -> Result<FriendRequestOutcome> {
        self.with_conn(|conn| {
            let exists: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE username = ?1", [addressee], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(FriendRequestOutcome::UnknownUser);
            }

            match active_status(conn, requester, addressee)? {
                Some(FriendshipStatus::Accepted) => return Ok(FriendRequestOutcome::AlreadyFriends),
                Some(_) => return Ok(FriendRequestOutcome::DuplicateRequest),
                None => {}
            }

            let now = now_ms();
            conn.execute(
                "INSERT INTO friendships (id, requester, addressee, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
                rusqlite::params![Uuid::new_v4().to_string(), requester, addressee, now],
            )?;
            Ok(FriendRequestOutcome::Created)
        })
    }

    /// Accept the pending `requester -> addressee` row and seed default colors
    /// both ways. Returns false if no such pending row exists.
    pub fn accept_friend_request(&self, requester: &str, addressee: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE friendships SET status = 'accepted', updated_at = ?3
                 WHERE requester = ?1 AND addressee = ?2 AND status = 'pending'",
                rusqlite::params![requester, addressee, now_ms()],
            )?;
            if changed == 0 {
                return Ok(false);
            }

            for (owner, friend) in [(requester, addressee), (addressee, requester)] {
                tx.execute(
                    "INSERT OR IGNORE INTO friend_colors (owner, friend, color) VALUES (?1, ?2, ?3)",
                    rusqlite::params![owner, friend, DEFAULT_COLOR],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn reject_friend_request(&self, requester: &str, addressee: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE friendships SET status = 'rejected', updated_at = ?3
                 WHERE requester = ?1 AND addressee = ?2 AND status = 'pending'",
                rusqlite::params![requester, addressee, now_ms()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete the active row for the unordered pair and both color rows.
    pub fn remove_friend(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM friendships
                 WHERE ((requester = ?1 AND addressee = ?2) OR (requester = ?2 AND addressee = ?1))
                   AND status IN ('pending', 'accepted')",
                [a, b],
            )?;
            tx.execute(
                "DELETE FROM friend_colors
                 WHERE (owner = ?1 AND friend = ?2) OR (owner = ?2 AND friend = ?1)",
                [a, b],
            )?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    /// Upsert `viewer`'s color for `friend`. Returns false unless the two are friends.
    pub fn update_friend_color(&self, viewer: &str, friend: &str, color: &str) -> Result<bool> {
        self.with_conn(|conn| {
            if active_status(conn, viewer, friend)? != Some(FriendshipStatus::Accepted) {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO friend_colors (owner, friend, color) VALUES (?1, ?2, ?3)
                 ON CONFLICT(owner, friend) DO UPDATE SET color = excluded.color",
                [viewer, friend, color],
            )?;
            Ok(true)
        })
    }

    /// Accepted friends of `username`, each with `username`'s color for them.
    pub fn get_friends(&self, username: &str) -> Result<Vec<Friend>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT CASE WHEN f.requester = ?1 THEN f.addressee ELSE f.requester END AS other,
                        c.color, f.updated_at
                 FROM friendships f
                 LEFT JOIN friend_colors c
                   ON c.owner = ?1
                  AND c.friend = (CASE WHEN f.requester = ?1 THEN f.addressee ELSE f.requester END)
                 WHERE (f.requester = ?1 OR f.addressee = ?1) AND f.status = 'accepted'
                 ORDER BY other",
            )?;

            let friends = stmt
                .query_map([username], |row| {
                    Ok(Friend {
                        username: row.get(0)?,
                        status: FriendshipStatus::Accepted,
                        color: row
                            .get::<_, Option<String>>(1)?
                            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                        since: from_ms(row.get(2)?),
                        is_online: false,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(friends)
        })
    }

    /// Pending requests addressed to `username`.
    pub fn get_friend_requests(&self, username: &str) -> Result<Vec<FriendRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT requester, created_at FROM friendships
                 WHERE addressee = ?1 AND status = 'pending'
                 ORDER BY created_at",
            )?;

            let requests = stmt
                .query_map([username], |row| {
                    Ok(FriendRequest {
                        requester: row.get(0)?,
                        status: FriendshipStatus::Pending,
                        created_at: from_ms(row.get(1)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(requests)
        })
    }

    /// Accepted friends of `username` who opted into online alerts and have a phone number.
    pub fn friends_to_notify(&self, username: &str) -> Result<Vec<NotifyTarget>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.username, u.phone_number
                 FROM friendships f
                 JOIN users u
                   ON u.username = (CASE WHEN f.requester = ?1 THEN f.addressee ELSE f.requester END)
                 WHERE (f.requester = ?1 OR f.addressee = ?1)
                   AND f.status = 'accepted'
                   AND u.notify_on_friend_online = 1
                   AND u.phone_number IS NOT NULL AND u.phone_number <> ''",
            )?;

            let targets = stmt
                .query_map([username], |row| {
                    Ok(NotifyTarget {
                        username: row.get(0)?,
                        phone_number: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(targets)
        })
    }
}

/// Status of the pending/accepted row for the unordered pair, if any.
fn active_status(conn: &Connection, a: &str, b: &str) -> Result<Option<FriendshipStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM friendships
             WHERE ((requester = ?1 AND addressee = ?2) OR (requester = ?2 AND addressee = ?1))
               AND status IN ('pending', 'accepted')
             ORDER BY CASE status WHEN 'accepted' THEN 0 ELSE 1 END
             LIMIT 1",
            [a, b],
            |row| row.get(0),
        )
        .optional()?;

    Ok(status.as_deref().and_then(FriendshipStatus::parse))
}
