//! Channel scopes.
//!
//! Community and post voice channels are structurally identical; what varies
//! is the owning entity, which tables hold the rows, which column carries
//! the capacity limit, and whether the channel can be deactivated. A scope
//! captures those differences as associated constants so the registry,
//! tracker, and gate are written once.

/// Compile-time description of one channel kind.
pub trait ChannelScope: Send + Sync + Unpin + 'static {
    /// Kind tag used in room names (`nexus-<kind>-<channel id>`).
    const KIND: &'static str;
    /// Table holding the channel records.
    const CHANNEL_TABLE: &'static str;
    /// Table holding the membership rows.
    const PARTICIPANT_TABLE: &'static str;
    /// Column with the maximum participant count.
    const CAPACITY_COLUMN: &'static str;
    /// SQL expression evaluating to 1 when the channel accepts joins.
    const ACTIVE_EXPR: &'static str;
}

/// Durable channels owned by a community.
pub struct CommunityScope;

impl ChannelScope for CommunityScope {
    const ACTIVE_EXPR: &'static str = "1";
    const CAPACITY_COLUMN: &'static str = "max_participants";
    const CHANNEL_TABLE: &'static str = "voice_channels";
    const KIND: &'static str = "community";
    const PARTICIPANT_TABLE: &'static str = "voice_channel_participants";
}

/// Ephemeral channels owned by a single post; deactivatable without deletion.
pub struct PostScope;

impl ChannelScope for PostScope {
    const ACTIVE_EXPR: &'static str = "is_active";
    const CAPACITY_COLUMN: &'static str = "max_slots";
    const CHANNEL_TABLE: &'static str = "post_voice_channels";
    const KIND: &'static str = "post";
    const PARTICIPANT_TABLE: &'static str = "post_voice_participants";
}

/// Room name for a channel: kind plus the channel's own UUID, so names are
/// globally unique and never reused for a different logical channel.
#[must_use]
pub fn room_name<S: ChannelScope>(channel_id: &str) -> String {
    format!("nexus-{}-{}", S::KIND, channel_id)
}
