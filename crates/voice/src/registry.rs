//! Channel registry: creation and lookup of channel records.

use {sqlx::SqlitePool, tracing::error};

use crate::{
    error::{Error, Result},
    scope::{CommunityScope, PostScope, room_name},
    types::{CommunityChannelSummary, PostVoiceChannel, VoiceChannel},
};

/// Owns channel records for both scopes. Membership rows are out of its
/// reach; those belong to the tracker.
pub struct ChannelRegistry {
    pool: SqlitePool,
}

impl ChannelRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a community voice channel. Community membership of the caller
    /// is the HTTP layer's concern, not checked here.
    pub async fn create_community_channel(
        &self,
        community_id: &str,
        name: &str,
        max_participants: i64,
    ) -> Result<VoiceChannel> {
        if name.trim().is_empty() {
            return Err(Error::invalid_input("channel name must not be empty"));
        }
        if max_participants <= 0 {
            return Err(Error::invalid_input("maxParticipants must be positive"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let channel = VoiceChannel {
            room: room_name::<CommunityScope>(&id),
            id,
            community_id: community_id.into(),
            name: name.trim().into(),
            max_participants,
            created_at: chrono::Utc::now().timestamp(),
        };
        sqlx::query(
            r#"INSERT INTO voice_channels (id, community_id, name, max_participants, room, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&channel.id)
        .bind(&channel.community_id)
        .bind(&channel.name)
        .bind(channel.max_participants)
        .bind(&channel.room)
        .bind(channel.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique(e, || {
            error!(room = %channel.room, "room name collision on community channel creation");
            Error::invariant(format!("room name already in use: {}", channel.room))
        }))?;
        Ok(channel)
    }

    /// Channels of a community with live occupancy, oldest first.
    pub async fn list_community_channels(
        &self,
        community_id: &str,
    ) -> Result<Vec<CommunityChannelSummary>> {
        let channels = sqlx::query_as::<_, VoiceChannel>(
            "SELECT * FROM voice_channels WHERE community_id = ? ORDER BY created_at, id",
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(channels.len());
        for channel in channels {
            let participant_count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM voice_channel_participants WHERE channel_id = ?",
            )
            .bind(&channel.id)
            .fetch_one(&self.pool)
            .await?;
            summaries.push(CommunityChannelSummary {
                channel,
                participant_count,
            });
        }
        Ok(summaries)
    }

    pub async fn get_community_channel(&self, channel_id: &str) -> Result<Option<VoiceChannel>> {
        let row = sqlx::query_as::<_, VoiceChannel>("SELECT * FROM voice_channels WHERE id = ?")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Create the voice channel for a post. At most one channel may ever
    /// exist per post; the unique constraint on `post_id` enforces it and a
    /// duplicate surfaces as [`Error::InvariantViolation`].
    pub async fn create_post_channel(
        &self,
        post_id: &str,
        max_slots: i64,
    ) -> Result<PostVoiceChannel> {
        if max_slots <= 0 {
            return Err(Error::invalid_input("maxSlots must be positive"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let channel = PostVoiceChannel {
            room: room_name::<PostScope>(&id),
            id,
            post_id: post_id.into(),
            max_slots,
            is_active: true,
            created_at: chrono::Utc::now().timestamp(),
        };
        sqlx::query(
            r#"INSERT INTO post_voice_channels (id, post_id, max_slots, room, is_active, created_at)
               VALUES (?, ?, ?, ?, 1, ?)"#,
        )
        .bind(&channel.id)
        .bind(&channel.post_id)
        .bind(channel.max_slots)
        .bind(&channel.room)
        .bind(channel.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Self::map_unique(e, || {
                Error::invariant(format!("post already has a voice channel: {post_id}"))
            })
        })?;
        Ok(channel)
    }

    pub async fn get_post_channel(&self, post_id: &str) -> Result<Option<PostVoiceChannel>> {
        let row = sqlx::query_as::<_, PostVoiceChannel>(
            "SELECT * FROM post_voice_channels WHERE post_id = ?",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Deactivate a post's channel (e.g. when the post is removed). The
    /// record and its history survive; joins stop succeeding.
    pub async fn deactivate_post_channel(&self, post_id: &str) -> Result<()> {
        sqlx::query("UPDATE post_voice_channels SET is_active = 0 WHERE post_id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn map_unique(e: sqlx::Error, invariant: impl FnOnce() -> Error) -> Error {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => invariant(),
            _ => Error::Sqlx(e),
        }
    }
}
