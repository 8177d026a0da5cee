//! Capacity gate: the single authority for "is there room".

use std::marker::PhantomData;

use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{Error, Result},
    scope::ChannelScope,
};

/// Gate verdict for a join request that is allowed to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The user already occupies the channel; a re-join is a no-op.
    AlreadyMember,
    /// A seat is free for a new member.
    SeatAvailable,
}

/// Checks occupancy against a channel's capacity limit.
///
/// A user who is already inside is always admitted, so idempotent re-joins
/// are not defeated by a full room. The check runs either against the pool
/// (advisory read) or on a caller-supplied connection so the membership
/// tracker can execute the identical check inside its join transaction.
pub struct CapacityGate<S: ChannelScope> {
    pool: SqlitePool,
    _scope: PhantomData<S>,
}

impl<S: ChannelScope> CapacityGate<S> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _scope: PhantomData,
        }
    }

    /// Advisory read against the authoritative store.
    pub async fn can_join(&self, channel_id: &str, user_id: &str) -> Result<Admission> {
        let mut conn = self.pool.acquire().await?;
        Self::check(&mut conn, channel_id, user_id).await
    }

    /// Run the gate on an existing connection (e.g. inside a transaction).
    pub(crate) async fn check(
        conn: &mut SqliteConnection,
        channel_id: &str,
        user_id: &str,
    ) -> Result<Admission> {
        let head_sql = format!(
            "SELECT {capacity}, {active} FROM {table} WHERE id = ?",
            capacity = S::CAPACITY_COLUMN,
            active = S::ACTIVE_EXPR,
            table = S::CHANNEL_TABLE,
        );
        let head: Option<(i64, i64)> = sqlx::query_as(&head_sql)
            .bind(channel_id)
            .fetch_optional(&mut *conn)
            .await?;
        let (capacity, active) = head.ok_or_else(|| Error::channel_not_found(channel_id))?;
        if active == 0 {
            // A deactivated channel is gone as far as joins are concerned.
            return Err(Error::channel_not_found(channel_id));
        }

        let member_sql = format!(
            "SELECT COUNT(*) FROM {table} WHERE channel_id = ? AND user_id = ?",
            table = S::PARTICIPANT_TABLE,
        );
        let member: i64 = sqlx::query_scalar(&member_sql)
            .bind(channel_id)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
        if member > 0 {
            return Ok(Admission::AlreadyMember);
        }

        let occupancy_sql = format!(
            "SELECT COUNT(*) FROM {table} WHERE channel_id = ?",
            table = S::PARTICIPANT_TABLE,
        );
        let occupancy: i64 = sqlx::query_scalar(&occupancy_sql)
            .bind(channel_id)
            .fetch_one(&mut *conn)
            .await?;
        if occupancy >= capacity {
            return Err(Error::channel_full(channel_id));
        }
        Ok(Admission::SeatAvailable)
    }
}
