//! Voice table schema.

use sqlx::SqlitePool;

use crate::error::Result;

/// Create the voice tables. Called at startup; safe to call repeatedly.
pub async fn init(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS voice_channels (
            id               TEXT    PRIMARY KEY,
            community_id     TEXT    NOT NULL,
            name             TEXT    NOT NULL,
            max_participants INTEGER NOT NULL,
            room             TEXT    NOT NULL UNIQUE,
            created_at       INTEGER NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS post_voice_channels (
            id         TEXT    PRIMARY KEY,
            post_id    TEXT    NOT NULL UNIQUE,
            max_slots  INTEGER NOT NULL,
            room       TEXT    NOT NULL UNIQUE,
            is_active  INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;
    // One membership table per channel kind; (channel, user) is unique so a
    // repeated join can never create a second row.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS voice_channel_participants (
            id         TEXT    PRIMARY KEY,
            channel_id TEXT    NOT NULL,
            user_id    TEXT    NOT NULL,
            joined_at  INTEGER NOT NULL,
            UNIQUE(channel_id, user_id)
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS post_voice_participants (
            id         TEXT    PRIMARY KEY,
            channel_id TEXT    NOT NULL,
            user_id    TEXT    NOT NULL,
            joined_at  INTEGER NOT NULL,
            UNIQUE(channel_id, user_id)
        )"#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
