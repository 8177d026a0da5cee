//! SQLite-backed directory projection using sqlx.

use {anyhow::Result, async_trait::async_trait, sqlx::SqlitePool};

use crate::{Community, Directory, NewPost, Post, User};

/// Internal row types for sqlx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    avatar: Option<String>,
    bio: Option<String>,
    created_at: i64,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            avatar: r.avatar,
            bio: r.bio,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommunityRow {
    id: String,
    name: String,
    game: String,
    created_at: i64,
}

impl From<CommunityRow> for Community {
    fn from(r: CommunityRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            game: r.game,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    community_id: String,
    user_id: String,
    content: String,
    created_at: i64,
}

impl From<PostRow> for Post {
    fn from(r: PostRow) -> Self {
        Self {
            id: r.id,
            community_id: r.community_id,
            user_id: r.user_id,
            content: r.content,
            created_at: r.created_at,
        }
    }
}

/// SQLite-backed directory store.
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the projection tables.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id         TEXT    PRIMARY KEY,
                username   TEXT    NOT NULL UNIQUE,
                avatar     TEXT,
                bio        TEXT,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS communities (
                id         TEXT    PRIMARY KEY,
                name       TEXT    NOT NULL,
                game       TEXT    NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS community_members (
                id           TEXT    PRIMARY KEY,
                community_id TEXT    NOT NULL,
                user_id      TEXT    NOT NULL,
                joined_at    INTEGER NOT NULL,
                UNIQUE(community_id, user_id)
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS posts (
                id           TEXT    PRIMARY KEY,
                community_id TEXT    NOT NULL,
                user_id      TEXT    NOT NULL,
                content      TEXT    NOT NULL,
                created_at   INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users (id, username, avatar, bio, created_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 avatar = excluded.avatar,
                 bio = excluded.bio"#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_community(&self, id: &str) -> Result<Option<Community>> {
        let row = sqlx::query_as::<_, CommunityRow>("SELECT * FROM communities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn create_community(&self, name: &str, game: &str) -> Result<Community> {
        let community = Community {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            game: game.into(),
            created_at: now(),
        };
        sqlx::query("INSERT INTO communities (id, name, game, created_at) VALUES (?, ?, ?, ?)")
            .bind(&community.id)
            .bind(&community.name)
            .bind(&community.game)
            .bind(community.created_at)
            .execute(&self.pool)
            .await?;
        Ok(community)
    }

    async fn add_member(&self, community_id: &str, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO community_members (id, community_id, user_id, joined_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(community_id, user_id) DO NOTHING"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(community_id)
        .bind(user_id)
        .bind(now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_member(&self, community_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM community_members WHERE community_id = ? AND user_id = ?",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            community_id: post.community_id,
            user_id: post.user_id,
            content: post.content,
            created_at: now(),
        };
        sqlx::query(
            "INSERT INTO posts (id, community_id, user_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&post.id)
        .bind(&post.community_id)
        .bind(&post.user_id)
        .bind(&post.content)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;
        Ok(post)
    }
}
