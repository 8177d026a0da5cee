//! `/api` route handlers.

use {
    axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use {
    nexus_directory::{NewPost, Post},
    nexus_voice::{CommunityScope, JoinIdentity, PostScope, PostVoiceChannel},
};

use crate::{error::ApiError, extract::CallerId, server::AppState};

/// Slots given to a post voice channel when the author enables voice without
/// choosing a size.
const DEFAULT_POST_VOICE_SLOTS: i64 = 4;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/communities/{id}/voice-channels",
            get(list_community_channels).post(create_community_channel),
        )
        .route("/voice-channels/{id}/join", post(join_community_channel))
        .route("/voice-channels/{id}/leave", post(leave_community_channel))
        .route("/posts", post(create_post))
        .route(
            "/posts/{id}/voice-channel",
            get(get_post_channel).post(create_post_channel),
        )
        .route("/post-voice-channels/{id}/join", post(join_post_channel))
        .route("/post-voice-channels/{id}/leave", post(leave_post_channel))
        .route("/voice/leave-all", post(leave_all))
        .route("/livekit/config", get(livekit_config))
}

// ── Community voice channels ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChannelRequest {
    name: String,
    max_participants: i64,
}

async fn create_community_channel(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    caller: CallerId,
    Json(body): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.directory.is_member(&community_id, &caller.0).await? {
        return Err(ApiError::forbidden(
            "only community members can create voice channels",
        ));
    }
    let channel = state
        .voice
        .registry()
        .create_community_channel(&community_id, &body.name, body.max_participants)
        .await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn list_community_channels(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let channels = state.voice.list_community_channels(&community_id).await?;
    Ok(Json(channels))
}

async fn join_community_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    caller: CallerId,
) -> Result<impl IntoResponse, ApiError> {
    let identity = resolve_identity(&state, &caller).await?;
    let credential = state
        .voice
        .join::<CommunityScope>(&channel_id, &identity)
        .await?;
    Ok(Json(credential))
}

async fn leave_community_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    caller: CallerId,
) -> Result<impl IntoResponse, ApiError> {
    state
        .voice
        .leave::<CommunityScope>(&channel_id, &caller.0)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Posts and post voice channels ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    community_id: String,
    content: String,
    #[serde(default)]
    enable_voice: bool,
    max_slots: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPost {
    #[serde(flatten)]
    post: Post,
    voice_channel: Option<PostVoiceChannel>,
}

async fn create_post(
    State(state): State<AppState>,
    caller: CallerId,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state
        .directory
        .get_community(&body.community_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Community not found"));
    }

    let post = state
        .directory
        .create_post(NewPost {
            community_id: body.community_id,
            user_id: caller.0.clone(),
            content: body.content,
        })
        .await?;

    // Voice is a best-effort enhancement: the post is durable at this point
    // and stays even when channel creation fails.
    let voice_channel = if body.enable_voice {
        let slots = body.max_slots.unwrap_or(DEFAULT_POST_VOICE_SLOTS);
        match state.voice.registry().create_post_channel(&post.id, slots).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "voice channel creation failed for new post");
                None
            },
        }
    } else {
        None
    };

    Ok((
        StatusCode::CREATED,
        Json(CreatedPost {
            post,
            voice_channel,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostChannelRequest {
    max_slots: i64,
}

async fn create_post_channel(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    caller: CallerId,
    Json(body): Json<CreatePostChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .directory
        .get_post(&post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    if post.user_id != caller.0 {
        return Err(ApiError::forbidden(
            "only the post author can enable voice",
        ));
    }
    let channel = state
        .voice
        .registry()
        .create_post_channel(&post_id, body.max_slots)
        .await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn get_post_channel(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Absence is a normal case (voice disabled); serialized as `null`.
    let overview = state.voice.post_channel_overview(&post_id).await?;
    Ok(Json(overview))
}

async fn join_post_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    caller: CallerId,
) -> Result<impl IntoResponse, ApiError> {
    let identity = resolve_identity(&state, &caller).await?;
    let credential = state.voice.join::<PostScope>(&channel_id, &identity).await?;
    Ok(Json(credential))
}

async fn leave_post_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    caller: CallerId,
) -> Result<impl IntoResponse, ApiError> {
    state.voice.leave::<PostScope>(&channel_id, &caller.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave_all(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<impl IntoResponse, ApiError> {
    state.voice.leave_all(&caller.0).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Media service config ────────────────────────────────────────────────────

async fn livekit_config(State(state): State<AppState>) -> impl IntoResponse {
    let issuer = state.voice.issuer();
    Json(serde_json::json!({
        "configured": issuer.is_configured(),
        "url": issuer.connection_url(),
    }))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Resolve the caller's display identity for credential minting.
async fn resolve_identity(state: &AppState, caller: &CallerId) -> Result<JoinIdentity, ApiError> {
    let user = state
        .directory
        .get_user(&caller.0)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(JoinIdentity {
        user_id: user.id,
        display_name: user.username,
    })
}
