use crate::models::{ChatUserRow, JoinRecord, MessageRow};
use crate::{Database, from_ms, now_ms};
use agora_types::models::{
    Avatar, ChatMessage, ChatUser, MessageKind, NewMessage, Reactions, Role,
};
use agora_types::reactions;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, sender, text, timestamp, kind, recipient, is_private, is_voice, voice_data, voice_duration, reactions";

const CHAT_USER_COLUMNS: &str =
    "id, username, is_active, role, avatar, join_time, last_active, total_time_online";

impl Database {
    // -- Users --

    pub fn set_notification_settings(
        &self,
        username: &str,
        phone_number: Option<&str>,
        notify_on_friend_online: bool,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET phone_number = ?2, notify_on_friend_online = ?3 WHERE username = ?1",
                rusqlite::params![username, phone_number, notify_on_friend_online],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Chat users --

    /// Activate `username`, read the history it should see, and store its
    /// join notice, all in one transaction. History is read before the notice
    /// is written, so it never contains the joiner's own notice.
    pub fn join_chat(
        &self,
        username: &str,
        avatar: &Avatar,
        notice: &NewMessage,
        history_limit: u32,
    ) -> Result<JoinRecord> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let user = upsert_chat_user(&tx, username, avatar)?;
            let history = query_recent(&tx, history_limit)?;
            let notice = insert_message_row(&tx, notice)?;
            tx.commit()?;
            Ok(JoinRecord { user, history, notice })
        })
    }

    /// Close the presence row and store the leave notice together.
    pub fn leave_chat(&self, username: &str, notice: &NewMessage) -> Result<ChatMessage> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            record_activity_at(&tx, username, now_ms())?;
            tx.execute("UPDATE chat_users SET is_active = 0 WHERE username = ?1", [username])?;
            let notice = insert_message_row(&tx, notice)?;
            tx.commit()?;
            Ok(notice)
        })
    }

    pub fn get_chat_user(&self, username: &str) -> Result<Option<ChatUser>> {
        self.with_conn(|conn| query_chat_user(conn, username)?.map(chat_user_from_row).transpose())
    }

    /// Add the whole seconds elapsed since `last_active` to `total_time_online`.
    /// The sub-second remainder stays in `last_active` so repeated calls do not drift.
    pub fn record_activity(&self, username: &str) -> Result<()> {
        self.with_conn(|conn| record_activity_at(conn, username, now_ms()))
    }

    pub fn leaderboard(&self, limit: u32) -> Result<Vec<ChatUser>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CHAT_USER_COLUMNS} FROM chat_users
                 ORDER BY total_time_online DESC, username ASC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], chat_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(chat_user_from_row).collect()
        })
    }

    // -- Messages --

    /// Persist a message, assigning its id and timestamp.
    pub fn insert_message(&self, msg: &NewMessage) -> Result<ChatMessage> {
        self.with_conn(|conn| insert_message_row(conn, msg))
    }

    /// Most recent public messages, oldest first.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| query_recent(conn, limit))
    }

    /// Private messages exchanged between `a` and `b`, oldest first.
    pub fn private_thread(&self, a: &str, b: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE is_private = 1
               AND ((sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1))
             ORDER BY seq DESC LIMIT ?3"
        );
        self.with_conn(|conn| collect_messages(conn, &sql, rusqlite::params![a, b, limit]))
    }

    // -- Reactions --

    /// `None` if the message does not exist.
    pub fn get_reactions(&self, message_id: Uuid) -> Result<Option<Reactions>> {
        self.with_conn(|conn| query_reactions(conn, message_id))
    }

    pub fn add_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>> {
        self.update_reactions(message_id, |map| reactions::add(map, username, emoji))
    }

    pub fn remove_reaction(&self, message_id: Uuid, username: &str, emoji: &str) -> Result<Option<Reactions>> {
        self.update_reactions(message_id, |map| reactions::remove(map, username, emoji))
    }

    fn update_reactions<F>(&self, message_id: Uuid, apply: F) -> Result<Option<Reactions>>
    where
        F: FnOnce(&mut Reactions) -> bool,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut map) = query_reactions(&tx, message_id)? else {
                return Ok(None);
            };
            if apply(&mut map) {
                tx.execute(
                    "UPDATE chat_messages SET reactions = ?2 WHERE id = ?1",
                    rusqlite::params![message_id.to_string(), serde_json::to_string(&map)?],
                )?;
            }
            tx.commit()?;
            Ok(Some(map))
        })
    }
}

fn ensure_user_row(conn: &Connection, username: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![Uuid::new_v4().to_string(), username, now_ms()],
    )?;
    Ok(())
}

fn upsert_chat_user(conn: &Connection, username: &str, avatar: &Avatar) -> Result<ChatUser> {
    ensure_user_row(conn, username)?;

    let now = now_ms();
    conn.execute(
        "INSERT INTO chat_users (id, username, is_active, avatar, join_time, last_active)
         VALUES (?1, ?2, 1, ?3, ?4, ?4)
         ON CONFLICT(username) DO UPDATE SET
            is_active = 1, avatar = excluded.avatar,
            join_time = excluded.join_time, last_active = excluded.last_active",
        rusqlite::params![Uuid::new_v4().to_string(), username, serde_json::to_string(avatar)?, now],
    )?;

    let row = query_chat_user(conn, username)?
        .ok_or_else(|| anyhow!("chat user vanished after upsert: {}", username))?;
    chat_user_from_row(row)
}

fn insert_message_row(conn: &Connection, msg: &NewMessage) -> Result<ChatMessage> {
    let id = Uuid::new_v4();
    let timestamp = now_ms();
    let (voice_data, voice_duration) = match &msg.voice {
        Some(v) => (Some(v.data.as_str()), Some(v.duration_seconds)),
        None => (None, None),
    };
    let kind = match msg.kind {
        MessageKind::User => "user",
        MessageKind::System => "system",
    };

    conn.execute(
        "INSERT INTO chat_messages
            (id, sender, text, timestamp, kind, recipient, is_private, is_voice, voice_data, voice_duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            id.to_string(),
            msg.sender,
            msg.text,
            timestamp,
            kind,
            msg.recipient,
            msg.recipient.is_some(),
            msg.voice.is_some(),
            voice_data,
            voice_duration,
        ],
    )?;

    Ok(ChatMessage {
        id,
        sender: msg.sender.clone(),
        text: msg.text.clone(),
        timestamp: from_ms(timestamp),
        kind: msg.kind,
        recipient: msg.recipient.clone(),
        is_private: msg.recipient.is_some(),
        is_voice: msg.voice.is_some(),
        voice_data: voice_data.map(str::to_string),
        voice_duration,
        reactions: Reactions::new(),
    })
}

fn query_recent(conn: &Connection, limit: u32) -> Result<Vec<ChatMessage>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM chat_messages
         WHERE is_private = 0 ORDER BY seq DESC LIMIT ?1"
    );
    collect_messages(conn, &sql, rusqlite::params![limit])
}

fn record_activity_at(conn: &Connection, username: &str, now: i64) -> Result<()> {
    let last_active: Option<i64> = conn
        .query_row(
            "SELECT last_active FROM chat_users WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .optional()?;

    let Some(last_active) = last_active else {
        return Err(anyhow!("No chat user: {}", username));
    };

    let elapsed_secs = (now - last_active).max(0) / 1000;
    conn.execute(
        "UPDATE chat_users
         SET total_time_online = total_time_online + ?2, last_active = ?3
         WHERE username = ?1",
        rusqlite::params![username, elapsed_secs, last_active.max(0) + elapsed_secs * 1000],
    )?;
    Ok(())
}

fn chat_user_row(row: &Row<'_>) -> rusqlite::Result<ChatUserRow> {
    Ok(ChatUserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        is_active: row.get(2)?,
        role: row.get(3)?,
        avatar: row.get(4)?,
        join_time: row.get(5)?,
        last_active: row.get(6)?,
        total_time_online: row.get(7)?,
    })
}

fn query_chat_user(conn: &Connection, username: &str) -> Result<Option<ChatUserRow>> {
    let sql = format!("SELECT {CHAT_USER_COLUMNS} FROM chat_users WHERE username = ?1");
    conn.query_row(&sql, [username], chat_user_row).optional()
}

fn chat_user_from_row(row: ChatUserRow) -> Result<ChatUser> {
    Ok(ChatUser {
        id: row.id.parse()?,
        avatar: serde_json::from_str(&row.avatar)
            .unwrap_or_else(|_| Avatar::default_for(&row.username)),
        username: row.username,
        is_active: row.is_active,
        role: Role::parse(&row.role),
        join_time: from_ms(row.join_time),
        last_active: from_ms(row.last_active),
        total_time_online: row.total_time_online,
    })
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender: row.get(1)?,
        text: row.get(2)?,
        timestamp: row.get(3)?,
        kind: row.get(4)?,
        recipient: row.get(5)?,
        is_private: row.get(6)?,
        is_voice: row.get(7)?,
        voice_data: row.get(8)?,
        voice_duration: row.get(9)?,
        reactions: row.get(10)?,
    })
}

fn collect_messages(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Queried newest first so LIMIT keeps the latest; hand back oldest first.
    rows.into_iter().rev().map(message_from_row).collect()
}

fn message_from_row(row: MessageRow) -> Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.id.parse()?,
        sender: row.sender,
        text: row.text,
        timestamp: from_ms(row.timestamp),
        kind: match row.kind.as_str() {
            "system" => MessageKind::System,
            _ => MessageKind::User,
        },
        recipient: row.recipient,
        is_private: row.is_private,
        is_voice: row.is_voice,
        voice_data: row.voice_data,
        voice_duration: row.voice_duration,
        reactions: serde_json::from_str(&row.reactions)?,
    })
}

fn query_reactions(conn: &Connection, message_id: Uuid) -> Result<Option<Reactions>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT reactions FROM chat_messages WHERE id = ?1",
            [message_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    raw.map(|json| serde_json::from_str(&json).map_err(Into::into))
        .transpose()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
