//! Identity and social-graph projection consumed by the voice subsystem.
//!
//! Users, communities, and posts are owned by the wider platform; the voice
//! core only needs a narrow view of them: who a user is (display fields,
//! never credentials), whether a user belongs to a community, and which post
//! a voice channel hangs off. The [`Directory`] trait is that boundary; the
//! sqlite implementation keeps the projection in the same database the voice
//! tables live in so presence queries can join against `users`.

pub mod store_sqlite;

pub use store_sqlite::SqliteDirectory;

use {anyhow::Result, async_trait::async_trait, serde::Serialize};

/// Public user projection. Display fields only; the platform's credential
/// store never crosses this boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created_at: i64,
}

/// Community record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: String,
    pub name: String,
    pub game: String,
    pub created_at: i64,
}

/// Post record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub community_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: i64,
}

/// Fields for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub community_id: String,
    pub user_id: String,
    pub content: String,
}

/// Read/write access to the social-graph projection.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn upsert_user(&self, user: &User) -> Result<()>;

    async fn get_community(&self, id: &str) -> Result<Option<Community>>;
    async fn create_community(&self, name: &str, game: &str) -> Result<Community>;
    async fn add_member(&self, community_id: &str, user_id: &str) -> Result<()>;
    async fn is_member(&self, community_id: &str, user_id: &str) -> Result<bool>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>>;
    async fn create_post(&self, post: NewPost) -> Result<Post>;
}
