//! Voice-channel membership and capacity management.
//!
//! Community voice channels (durable, created explicitly) and post voice
//! channels (ephemeral, at most one per post) share one generic core,
//! parameterized over [`scope::ChannelScope`]:
//!
//! 1. [`registry::ChannelRegistry`] creates and looks up channel records and
//!    assigns each one an immutable, globally unique LiveKit room name.
//! 2. [`membership::MembershipTracker`] is the only writer of participant
//!    rows: idempotent join, harmless leave, live occupancy.
//! 3. [`gating::CapacityGate`] decides whether a seat is available.
//! 4. [`token::CredentialIssuer`] mints a room-scoped, time-boxed join
//!    credential for the external media transport.
//!
//! [`service::VoiceService`] ties the four together in the fixed join order:
//! configuration check, channel lookup, capacity-checked membership write,
//! credential mint (with rollback of a freshly created row on mint failure).

pub mod error;
pub mod gating;
pub mod membership;
pub mod registry;
pub mod schema;
pub mod scope;
pub mod service;
pub mod token;
pub mod types;

pub use {
    error::{Error, Result},
    gating::{Admission, CapacityGate},
    membership::{JoinOutcome, MembershipTracker},
    registry::ChannelRegistry,
    schema::init as init_schema,
    scope::{ChannelScope, CommunityScope, PostScope},
    service::{JoinIdentity, VoiceService},
    token::{CredentialIssuer, IssuedCredential, LiveKitIssuer, TOKEN_TTL_SECS},
    types::{
        CommunityChannelSummary, ParticipantProfile, PostChannelOverview, PostVoiceChannel,
        VoiceChannel,
    },
};
