use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Channel does not exist (or is no longer active).
    #[error("voice channel not found: {channel_id}")]
    ChannelNotFound { channel_id: String },

    /// Channel is at capacity.
    #[error("voice channel is full: {channel_id}")]
    ChannelFull { channel_id: String },

    /// The media service has no API credentials; voice is disabled.
    #[error("media service is not configured")]
    Unconfigured,

    /// Credential minting failed; the client may retry.
    #[error("credential issuance failed: {context}")]
    CredentialIssuance {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A uniqueness invariant was violated (duplicate post channel, room
    /// name collision). Indicates a bug or race; logged loudly upstream.
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn channel_not_found(channel_id: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn channel_full(channel_id: impl Into<String>) -> Self {
        Self::ChannelFull {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn credential_issuance(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::CredentialIssuance {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn credential_issuance_msg(context: impl Into<String>) -> Self {
        Self::CredentialIssuance {
            context: context.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
