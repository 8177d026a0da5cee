//! LiveKit join-credential issuance.
//!
//! A credential is an HS256-signed JWT granting publish, subscribe, and data
//! rights to exactly one identity in exactly one room, valid for about two
//! hours. The issuer never touches the media data plane; clients take the
//! token and connect to the configured LiveKit endpoint themselves.

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD},
    hmac::{Hmac, Mac},
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    sha2::Sha256,
};

use crate::error::{Error, Result};

/// Credential lifetime in seconds.
pub const TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Tolerance for clock skew between this server and LiveKit, in seconds.
const NBF_LEEWAY_SECS: i64 = 10;

/// A minted credential plus everything the client needs to connect.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub token: String,
    pub url: String,
    pub room: String,
}

/// Mints scoped join credentials for the external media service.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Whether the deployment has media credentials at all. Checked before
    /// any membership mutation so a misconfigured deployment never leaves
    /// ghost participant rows.
    fn is_configured(&self) -> bool;

    /// Endpoint clients connect to with an issued token.
    fn connection_url(&self) -> &str;

    async fn issue(
        &self,
        room: &str,
        identity: &str,
        display_name: &str,
    ) -> Result<IssuedCredential>;
}

/// LiveKit access-token issuer. Signs tokens locally with the API secret.
#[derive(Clone)]
pub struct LiveKitIssuer {
    api_key: Option<Secret<String>>,
    api_secret: Option<Secret<String>>,
    url: String,
}

impl std::fmt::Debug for LiveKitIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveKitIssuer")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

impl LiveKitIssuer {
    #[must_use]
    pub fn new(
        api_key: Option<Secret<String>>,
        api_secret: Option<Secret<String>>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            api_secret,
            url: url.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &nexus_config::LiveKitConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl CredentialIssuer for LiveKitIssuer {
    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    fn connection_url(&self) -> &str {
        &self.url
    }

    async fn issue(
        &self,
        room: &str,
        identity: &str,
        display_name: &str,
    ) -> Result<IssuedCredential> {
        let (Some(api_key), Some(api_secret)) = (&self.api_key, &self.api_secret) else {
            return Err(Error::Unconfigured);
        };

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: api_key.expose_secret(),
            sub: identity,
            name: display_name,
            nbf: now - NBF_LEEWAY_SECS,
            exp: now + TOKEN_TTL_SECS,
            video: VideoGrant {
                room,
                room_join: true,
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
            },
        };
        let token = sign_hs256(&claims, api_secret.expose_secret())?;
        Ok(IssuedCredential {
            token,
            url: self.url.clone(),
            room: room.to_string(),
        })
    }
}

// ── JWT building blocks ────────────────────────────────────────────────────

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    name: &'a str,
    nbf: i64,
    exp: i64,
    video: VideoGrant<'a>,
}

/// LiveKit video grant. Scoped to a single room; never broader.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant<'a> {
    room: &'a str,
    room_join: bool,
    can_publish: bool,
    can_subscribe: bool,
    can_publish_data: bool,
}

fn sign_hs256<T: Serialize>(claims: &T, secret: &str) -> Result<String> {
    let header = serde_json::to_vec(&Header {
        alg: "HS256",
        typ: "JWT",
    })
    .map_err(|e| Error::credential_issuance("encode token header", e))?;
    let payload = serde_json::to_vec(claims)
        .map_err(|e| Error::credential_issuance("encode token claims", e))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::credential_issuance("build signing key", e))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}
