//! Config schema types (server, database, LiveKit media service).

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub livekit: LiveKitConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL. `mode=rwc` creates the file on first start.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:nexus.db?mode=rwc".into(),
        }
    }
}

/// LiveKit media-service configuration.
///
/// All fields optional; without an API key and secret the deployment runs
/// with voice disabled and every join request is rejected up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveKitConfig {
    /// API key (from LIVEKIT_API_KEY env or config).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret",
        deserialize_with = "deserialize_option_secret"
    )]
    pub api_key: Option<Secret<String>>,

    /// API secret (from LIVEKIT_API_SECRET env or config).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret",
        deserialize_with = "deserialize_option_secret"
    )]
    pub api_secret: Option<Secret<String>>,

    /// WebSocket endpoint clients connect to.
    pub url: String,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            url: "wss://your-livekit-server.livekit.cloud".into(),
        }
    }
}

impl LiveKitConfig {
    /// Both key and secret present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

// ── Secret serialization helpers ───────────────────────────────────────────

fn serialize_option_secret<S>(
    value: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use secrecy::ExposeSecret;
    match value {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_option_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(Secret::new))
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn test_defaults() {
        let config = NexusConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.database.url, "sqlite:nexus.db?mode=rwc");
        assert!(!config.livekit.is_configured());
        assert!(config.livekit.url.starts_with("wss://"));
    }

    #[test]
    fn test_livekit_configured_requires_both_credentials() {
        let mut livekit = LiveKitConfig {
            api_key: Some(Secret::new("key".into())),
            ..Default::default()
        };
        assert!(!livekit.is_configured());

        livekit.api_secret = Some(Secret::new("secret".into()));
        assert!(livekit.is_configured());
    }

    #[test]
    fn test_toml_roundtrip() {
        let raw = r#"
            [server]
            port = 9000

            [livekit]
            api_key = "APIabc"
            api_secret = "shh"
            url = "wss://nexus.livekit.cloud"
        "#;
        let config: NexusConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert!(config.livekit.is_configured());
        assert_eq!(
            config.livekit.api_key.as_ref().unwrap().expose_secret(),
            "APIabc"
        );

        let serialized = toml::to_string(&config).unwrap();
        let parsed: NexusConfig = toml::from_str(&serialized).unwrap();
        assert!(parsed.livekit.is_configured());
    }
}
