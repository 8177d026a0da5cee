//! Membership tracking: the only writer of participant rows.

use std::marker::PhantomData;

use sqlx::SqlitePool;

use crate::{
    error::{Error, Result},
    gating::{Admission, CapacityGate},
    scope::ChannelScope,
    types::ParticipantProfile,
};

/// Result of a join request that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new membership row was created by this request.
    Joined,
    /// The user was already a member; nothing changed.
    AlreadyJoined,
}

/// Tracks which users currently occupy which channels of one scope.
pub struct MembershipTracker<S: ChannelScope> {
    pool: SqlitePool,
    _scope: PhantomData<S>,
}

impl<S: ChannelScope> MembershipTracker<S> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _scope: PhantomData,
        }
    }

    /// Capacity-checked, idempotent join.
    ///
    /// The gate check and the insert run in one transaction. SQLite admits a
    /// single writer at a time, so the recount-and-insert commits atomically
    /// and two users racing for the last seat cannot both get it; the
    /// `UNIQUE(channel_id, user_id)` index is the backstop, and a violation
    /// there is reported as [`JoinOutcome::AlreadyJoined`].
    pub async fn join(&self, channel_id: &str, user_id: &str) -> Result<JoinOutcome> {
        let mut tx = self.pool.begin().await?;
        match CapacityGate::<S>::check(&mut tx, channel_id, user_id).await? {
            Admission::AlreadyMember => return Ok(JoinOutcome::AlreadyJoined),
            Admission::SeatAvailable => {},
        }

        let insert_sql = format!(
            "INSERT INTO {table} (id, channel_id, user_id, joined_at) VALUES (?, ?, ?, ?)",
            table = S::PARTICIPANT_TABLE,
        );
        let inserted = sqlx::query(&insert_sql)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(channel_id)
            .bind(user_id)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await;
        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(JoinOutcome::Joined)
            },
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(JoinOutcome::AlreadyJoined)
            },
            Err(e) => Err(Error::Sqlx(e)),
        }
    }

    /// Remove a membership row. Leaving a channel one is not in is harmless.
    pub async fn leave(&self, channel_id: &str, user_id: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {table} WHERE channel_id = ? AND user_id = ?",
            table = S::PARTICIPANT_TABLE,
        );
        sqlx::query(&sql)
            .bind(channel_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove the user from every channel of this scope. Returns the number
    /// of memberships dropped.
    pub async fn leave_all(&self, user_id: &str) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {table} WHERE user_id = ?",
            table = S::PARTICIPANT_TABLE,
        );
        let result = sqlx::query(&sql).bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Live occupancy, recomputed from the membership table on every call.
    pub async fn occupancy(&self, channel_id: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {table} WHERE channel_id = ?",
            table = S::PARTICIPANT_TABLE,
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(channel_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Presence list with display fields, in join order. Single query, so
    /// the result is consistent with [`Self::occupancy`] at the same
    /// instant.
    pub async fn list_participants(&self, channel_id: &str) -> Result<Vec<ParticipantProfile>> {
        let sql = format!(
            r#"SELECT p.user_id, u.username, u.avatar, p.joined_at
               FROM {table} p
               INNER JOIN users u ON u.id = p.user_id
               WHERE p.channel_id = ?
               ORDER BY p.joined_at, p.id"#,
            table = S::PARTICIPANT_TABLE,
        );
        let rows = sqlx::query_as::<_, ParticipantProfile>(&sql)
            .bind(channel_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            registry::ChannelRegistry,
            scope::{CommunityScope, PostScope},
        },
        nexus_directory::{Directory, SqliteDirectory, User},
    };

    async fn make_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::init(&pool).await.unwrap();
        SqliteDirectory::init(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str) {
        let dir = SqliteDirectory::new(pool.clone());
        dir.upsert_user(&User {
            id: id.into(),
            username: format!("user-{id}"),
            avatar: None,
            bio: None,
            created_at: 1000,
        })
        .await
        .unwrap();
    }

    async fn community_channel(pool: &SqlitePool, max: i64) -> String {
        let registry = ChannelRegistry::new(pool.clone());
        registry
            .create_community_channel("c1", "General Voice", max)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let pool = make_pool().await;
        let channel = community_channel(&pool, 4).await;
        let tracker = MembershipTracker::<CommunityScope>::new(pool);

        assert_eq!(
            tracker.join(&channel, "alice").await.unwrap(),
            JoinOutcome::Joined
        );
        assert_eq!(
            tracker.join(&channel, "alice").await.unwrap(),
            JoinOutcome::AlreadyJoined
        );
        assert_eq!(tracker.occupancy(&channel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capacity_enforced() {
        let pool = make_pool().await;
        let channel = community_channel(&pool, 2).await;
        let tracker = MembershipTracker::<CommunityScope>::new(pool);

        tracker.join(&channel, "alice").await.unwrap();
        tracker.join(&channel, "bob").await.unwrap();
        assert_eq!(tracker.occupancy(&channel).await.unwrap(), 2);

        let err = tracker.join(&channel, "carol").await.unwrap_err();
        assert!(matches!(err, Error::ChannelFull { .. }));
        assert_eq!(tracker.occupancy(&channel).await.unwrap(), 2);

        // A member already inside still "joins" fine at capacity.
        assert_eq!(
            tracker.join(&channel, "alice").await.unwrap(),
            JoinOutcome::AlreadyJoined
        );
    }

    #[tokio::test]
    async fn test_join_unknown_channel() {
        let pool = make_pool().await;
        let tracker = MembershipTracker::<CommunityScope>::new(pool);
        let err = tracker.join("nope", "alice").await.unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_leave_is_harmless_when_absent() {
        let pool = make_pool().await;
        let channel = community_channel(&pool, 2).await;
        let tracker = MembershipTracker::<CommunityScope>::new(pool);

        tracker.join(&channel, "alice").await.unwrap();
        tracker.leave(&channel, "ghost").await.unwrap();
        assert_eq!(tracker.occupancy(&channel).await.unwrap(), 1);

        tracker.leave(&channel, "alice").await.unwrap();
        tracker.leave(&channel, "alice").await.unwrap();
        assert_eq!(tracker.occupancy(&channel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_leave_all_drops_every_membership() {
        let pool = make_pool().await;
        let ch1 = community_channel(&pool, 4).await;
        let ch2 = community_channel(&pool, 4).await;
        let tracker = MembershipTracker::<CommunityScope>::new(pool);

        tracker.join(&ch1, "alice").await.unwrap();
        tracker.join(&ch2, "alice").await.unwrap();
        tracker.join(&ch2, "bob").await.unwrap();

        assert_eq!(tracker.leave_all("alice").await.unwrap(), 2);
        assert_eq!(tracker.occupancy(&ch1).await.unwrap(), 0);
        assert_eq!(tracker.occupancy(&ch2).await.unwrap(), 1);
        assert_eq!(tracker.leave_all("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_occupancy_matches_participant_list() {
        let pool = make_pool().await;
        let channel = community_channel(&pool, 4).await;
        seed_user(&pool, "alice").await;
        seed_user(&pool, "bob").await;
        let tracker = MembershipTracker::<CommunityScope>::new(pool);

        for user in ["alice", "bob"] {
            tracker.join(&channel, user).await.unwrap();
            let participants = tracker.list_participants(&channel).await.unwrap();
            assert_eq!(
                tracker.occupancy(&channel).await.unwrap(),
                participants.len() as i64
            );
        }

        let participants = tracker.list_participants(&channel).await.unwrap();
        let names: Vec<&str> = participants.iter().map(|p| p.username.as_str()).collect();
        assert!(names.contains(&"user-alice"));
        assert!(names.contains(&"user-bob"));
    }

    #[tokio::test]
    async fn test_inactive_post_channel_rejects_joins() {
        let pool = make_pool().await;
        let registry = ChannelRegistry::new(pool.clone());
        let channel = registry.create_post_channel("p1", 4).await.unwrap();
        let tracker = MembershipTracker::<PostScope>::new(pool);

        tracker.join(&channel.id, "alice").await.unwrap();
        registry.deactivate_post_channel("p1").await.unwrap();

        let err = tracker.join(&channel.id, "bob").await.unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound { .. }));
    }
}
