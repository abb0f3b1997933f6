use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                      TEXT PRIMARY KEY,
            username                TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash           TEXT NOT NULL DEFAULT '',
            phone_number            TEXT,
            notify_on_friend_online INTEGER NOT NULL DEFAULT 0,
            created_at              INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_users (
            id                  TEXT PRIMARY KEY,
            username            TEXT NOT NULL UNIQUE COLLATE NOCASE,
            is_active           INTEGER NOT NULL DEFAULT 0,
            role                TEXT NOT NULL DEFAULT 'user',
            avatar              TEXT NOT NULL,
            join_time           INTEGER NOT NULL,
            last_active         INTEGER NOT NULL,
            total_time_online   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_chat_users_time
            ON chat_users(total_time_online DESC);

        CREATE TABLE IF NOT EXISTS chat_messages (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            sender          TEXT NOT NULL COLLATE NOCASE,
            text            TEXT NOT NULL,
            timestamp       INTEGER NOT NULL,
            kind            TEXT NOT NULL,
            recipient       TEXT COLLATE NOCASE,
            is_private      INTEGER NOT NULL DEFAULT 0,
            is_voice        INTEGER NOT NULL DEFAULT 0,
            voice_data      TEXT,
            voice_duration  REAL,
            reactions       TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_private
            ON chat_messages(is_private, seq);

        CREATE TABLE IF NOT EXISTS friendships (
            id          TEXT PRIMARY KEY,
            requester   TEXT NOT NULL COLLATE NOCASE,
            addressee   TEXT NOT NULL COLLATE NOCASE,
            status      TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_friendships_requester ON friendships(requester);
        CREATE INDEX IF NOT EXISTS idx_friendships_addressee ON friendships(addressee);

        CREATE TABLE IF NOT EXISTS friend_colors (
            owner   TEXT NOT NULL COLLATE NOCASE,
            friend  TEXT NOT NULL COLLATE NOCASE,
            color   TEXT NOT NULL,
            PRIMARY KEY (owner, friend)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
