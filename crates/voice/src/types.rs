//! Channel and membership record types.
//!
//! Serialized field names are camelCase to match the web client
//! (`maxParticipants`, `participantCount`, `livekitRoom`, …).

use serde::Serialize;

/// Community voice channel (durable).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VoiceChannel {
    pub id: String,
    pub community_id: String,
    pub name: String,
    pub max_participants: i64,
    /// External media room name. Assigned at creation, immutable,
    /// globally unique.
    #[serde(rename = "livekitRoom")]
    pub room: String,
    pub created_at: i64,
}

/// Post voice channel (ephemeral, one per post).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostVoiceChannel {
    pub id: String,
    pub post_id: String,
    pub max_slots: i64,
    #[serde(rename = "livekitRoom")]
    pub room: String,
    pub is_active: bool,
    pub created_at: i64,
}

/// A participant row joined with the display fields the presence UI needs.
/// Username and avatar are the only user data that crosses into this
/// subsystem.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    pub user_id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub joined_at: i64,
}

/// Community channel with its live occupancy, for channel lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityChannelSummary {
    #[serde(flatten)]
    pub channel: VoiceChannel,
    pub participant_count: i64,
}

/// Post channel with its live presence list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostChannelOverview {
    #[serde(flatten)]
    pub channel: PostVoiceChannel,
    pub participants: Vec<ParticipantProfile>,
    pub participant_count: i64,
}
