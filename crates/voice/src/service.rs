//! Join/leave orchestration.

use std::{sync::Arc, time::Duration};

use {sqlx::SqlitePool, tracing::warn};

use crate::{
    error::{Error, Result},
    membership::{JoinOutcome, MembershipTracker},
    registry::ChannelRegistry,
    scope::{ChannelScope, CommunityScope, PostScope},
    token::{CredentialIssuer, IssuedCredential},
    types::{CommunityChannelSummary, PostChannelOverview},
};

/// Upper bound on one credential-minting call. Issuance past this surfaces
/// as a typed failure instead of a hung request.
pub const ISSUE_TIMEOUT: Duration = Duration::from_secs(10);

/// The caller's identity, threaded explicitly from the HTTP layer; the core
/// never reads ambient state.
#[derive(Debug, Clone)]
pub struct JoinIdentity {
    pub user_id: String,
    pub display_name: String,
}

/// Facade over registry, tracker, gate, and issuer.
///
/// The join sequence is fixed: configuration check, channel lookup,
/// capacity-checked membership write (one transaction), credential mint. A
/// mint failure rolls back a membership row created by the same request; a
/// member who was already inside keeps their seat.
pub struct VoiceService {
    pool: SqlitePool,
    registry: ChannelRegistry,
    issuer: Arc<dyn CredentialIssuer>,
}

impl VoiceService {
    pub fn new(pool: SqlitePool, issuer: Arc<dyn CredentialIssuer>) -> Self {
        Self {
            registry: ChannelRegistry::new(pool.clone()),
            pool,
            issuer,
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn issuer(&self) -> &dyn CredentialIssuer {
        self.issuer.as_ref()
    }

    fn tracker<S: ChannelScope>(&self) -> MembershipTracker<S> {
        MembershipTracker::new(self.pool.clone())
    }

    /// Join a channel and mint a connection credential.
    pub async fn join<S: ChannelScope>(
        &self,
        channel_id: &str,
        identity: &JoinIdentity,
    ) -> Result<IssuedCredential> {
        // Fail closed before touching membership: an unconfigured deployment
        // must never accumulate participants who cannot connect.
        if !self.issuer.is_configured() {
            return Err(Error::Unconfigured);
        }

        let room = self
            .joinable_room::<S>(channel_id)
            .await?
            .ok_or_else(|| Error::channel_not_found(channel_id))?;

        let tracker = self.tracker::<S>();
        let outcome = tracker.join(channel_id, &identity.user_id).await?;

        let minted = tokio::time::timeout(
            ISSUE_TIMEOUT,
            self.issuer
                .issue(&room, &identity.user_id, &identity.display_name),
        )
        .await;
        let result = match minted {
            Ok(result) => result,
            Err(_) => Err(Error::credential_issuance_msg(
                "media service timed out minting a token",
            )),
        };

        match result {
            Ok(credential) => Ok(credential),
            Err(e) => {
                if outcome == JoinOutcome::Joined {
                    // This request claimed the seat; give it back rather than
                    // leave a ghost who never received a token.
                    if let Err(leave_err) = tracker.leave(channel_id, &identity.user_id).await {
                        warn!(
                            channel_id,
                            user_id = %identity.user_id,
                            error = %leave_err,
                            "failed to roll back membership after mint failure"
                        );
                    }
                }
                Err(e)
            },
        }
    }

    pub async fn leave<S: ChannelScope>(&self, channel_id: &str, user_id: &str) -> Result<()> {
        self.tracker::<S>().leave(channel_id, user_id).await
    }

    /// Drop every membership of the user, both channel kinds.
    pub async fn leave_all(&self, user_id: &str) -> Result<u64> {
        let community = self.tracker::<CommunityScope>().leave_all(user_id).await?;
        let post = self.tracker::<PostScope>().leave_all(user_id).await?;
        Ok(community + post)
    }

    pub async fn list_community_channels(
        &self,
        community_id: &str,
    ) -> Result<Vec<CommunityChannelSummary>> {
        self.registry.list_community_channels(community_id).await
    }

    /// A post's channel with its presence list, or `None` when the post has
    /// voice disabled.
    pub async fn post_channel_overview(
        &self,
        post_id: &str,
    ) -> Result<Option<PostChannelOverview>> {
        let Some(channel) = self.registry.get_post_channel(post_id).await? else {
            return Ok(None);
        };
        let participants = self
            .tracker::<PostScope>()
            .list_participants(&channel.id)
            .await?;
        Ok(Some(PostChannelOverview {
            participant_count: participants.len() as i64,
            participants,
            channel,
        }))
    }

    /// Room name of a channel that currently accepts joins.
    async fn joinable_room<S: ChannelScope>(&self, channel_id: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT room FROM {table} WHERE id = ? AND {active} = 1",
            table = S::CHANNEL_TABLE,
            active = S::ACTIVE_EXPR,
        );
        let room: Option<String> = sqlx::query_scalar(&sql)
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(room)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {
        std::sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        async_trait::async_trait,
    };

    use {
        super::*,
        nexus_directory::{Directory, SqliteDirectory, User},
    };

    /// Issuer double: configurable, optionally failing, call-counting.
    struct FakeIssuer {
        configured: bool,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeIssuer {
        fn configured() -> Self {
            Self {
                configured: true,
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        fn unconfigured() -> Self {
            Self {
                configured: false,
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialIssuer for FakeIssuer {
        fn is_configured(&self) -> bool {
            self.configured
        }

        fn connection_url(&self) -> &str {
            "wss://fake.livekit"
        }

        async fn issue(
            &self,
            room: &str,
            identity: &str,
            _display_name: &str,
        ) -> Result<IssuedCredential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::credential_issuance_msg("forced failure"));
            }
            Ok(IssuedCredential {
                token: format!("token-{identity}"),
                url: "wss://fake.livekit".into(),
                room: room.into(),
            })
        }
    }

    async fn make_service(issuer: Arc<FakeIssuer>) -> (VoiceService, SqlitePool) {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::schema::init(&pool).await.unwrap();
        SqliteDirectory::init(&pool).await.unwrap();
        (VoiceService::new(pool.clone(), issuer), pool)
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

    fn identity(user_id: &str) -> JoinIdentity {
        JoinIdentity {
            user_id: user_id.into(),
            display_name: format!("user-{user_id}"),
        }
    }

    #[tokio::test]
    async fn test_join_mints_room_scoped_credential() {
        let issuer = Arc::new(FakeIssuer::configured());
        let (service, _pool) = make_service(Arc::clone(&issuer)).await;
        let channel = service
            .registry()
            .create_community_channel("c1", "General", 5)
            .await
            .unwrap();

        let credential = service
            .join::<CommunityScope>(&channel.id, &identity("alice"))
            .await
            .unwrap();
        assert_eq!(credential.room, channel.room);
        assert_eq!(credential.token, "token-alice");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_join_leaves_no_ghost_rows() {
        let (service, pool) = make_service(Arc::new(FakeIssuer::unconfigured())).await;
        let channel = service
            .registry()
            .create_community_channel("c1", "General", 5)
            .await
            .unwrap();

        let err = service
            .join::<CommunityScope>(&channel.id, &identity("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unconfigured));

        let tracker = MembershipTracker::<CommunityScope>::new(pool);
        assert_eq!(tracker.occupancy(&channel.id).await.unwrap(), 0);
        assert!(tracker.list_participants(&channel.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mint_failure_rolls_back_fresh_membership() {
        let issuer = Arc::new(FakeIssuer::configured());
        let (service, pool) = make_service(Arc::clone(&issuer)).await;
        let channel = service
            .registry()
            .create_community_channel("c1", "General", 5)
            .await
            .unwrap();

        issuer.fail.store(true, Ordering::SeqCst);
        let err = service
            .join::<CommunityScope>(&channel.id, &identity("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CredentialIssuance { .. }));

        let tracker = MembershipTracker::<CommunityScope>::new(pool);
        assert_eq!(tracker.occupancy(&channel.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mint_failure_keeps_existing_membership() {
        let issuer = Arc::new(FakeIssuer::configured());
        let (service, pool) = make_service(Arc::clone(&issuer)).await;
        let channel = service
            .registry()
            .create_community_channel("c1", "General", 5)
            .await
            .unwrap();

        service
            .join::<CommunityScope>(&channel.id, &identity("alice"))
            .await
            .unwrap();

        // A re-join whose mint fails must not kick the member out.
        issuer.fail.store(true, Ordering::SeqCst);
        service
            .join::<CommunityScope>(&channel.id, &identity("alice"))
            .await
            .unwrap_err();

        let tracker = MembershipTracker::<CommunityScope>::new(pool);
        assert_eq!(tracker.occupancy(&channel.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_capacity_scenario_two_seats() {
        let (service, _pool) = make_service(Arc::new(FakeIssuer::configured())).await;
        let channel = service
            .registry()
            .create_community_channel("c1", "Duo", 2)
            .await
            .unwrap();

        service
            .join::<CommunityScope>(&channel.id, &identity("alice"))
            .await
            .unwrap();
        service
            .join::<CommunityScope>(&channel.id, &identity("bob"))
            .await
            .unwrap();

        let err = service
            .join::<CommunityScope>(&channel.id, &identity("carol"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelFull { .. }));

        let list = service.list_community_channels("c1").await.unwrap();
        assert_eq!(list[0].participant_count, 2);
    }

    #[tokio::test]
    async fn test_post_channel_overview() {
        let (service, pool) = make_service(Arc::new(FakeIssuer::configured())).await;
        seed_user(&pool, "alice").await;

        assert!(service.post_channel_overview("p1").await.unwrap().is_none());

        let channel = service
            .registry()
            .create_post_channel("p1", 4)
            .await
            .unwrap();
        let overview = service.post_channel_overview("p1").await.unwrap().unwrap();
        assert_eq!(overview.channel.max_slots, 4);
        assert_eq!(overview.participant_count, 0);
        assert!(overview.channel.is_active);

        service
            .join::<PostScope>(&channel.id, &identity("alice"))
            .await
            .unwrap();
        let overview = service.post_channel_overview("p1").await.unwrap().unwrap();
        assert_eq!(overview.participant_count, 1);
        assert_eq!(overview.participants[0].username, "user-alice");
    }

    #[tokio::test]
    async fn test_join_deactivated_post_channel_is_not_found() {
        let (service, _pool) = make_service(Arc::new(FakeIssuer::configured())).await;
        let channel = service
            .registry()
            .create_post_channel("p1", 4)
            .await
            .unwrap();
        service
            .registry()
            .deactivate_post_channel("p1")
            .await
            .unwrap();

        let err = service
            .join::<PostScope>(&channel.id, &identity("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound { .. }));
    }

    #[tokio::test]
    async fn test_leave_all_spans_both_scopes() {
        let (service, _pool) = make_service(Arc::new(FakeIssuer::configured())).await;
        let community = service
            .registry()
            .create_community_channel("c1", "General", 5)
            .await
            .unwrap();
        let post = service
            .registry()
            .create_post_channel("p1", 5)
            .await
            .unwrap();

        service
            .join::<CommunityScope>(&community.id, &identity("alice"))
            .await
            .unwrap();
        service
            .join::<PostScope>(&post.id, &identity("alice"))
            .await
            .unwrap();

        assert_eq!(service.leave_all("alice").await.unwrap(), 2);
        assert_eq!(service.leave_all("alice").await.unwrap(), 0);
    }
}
