//! Read-only facts owned by other services: subscription tier, blocks,
//! moderation flags and conversation-opening exceptions.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::db::store::StoreResult;
use crate::models::{PairKey, SubscriptionTier, UserId};

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn tier(&self, user: UserId) -> StoreResult<SubscriptionTier>;

    /// Directional: has `blocker` blocked `blocked`?
    async fn has_blocked(&self, blocker: UserId, blocked: UserId) -> StoreResult<bool>;

    async fn is_abuse_flagged(&self, user: UserId) -> StoreResult<bool>;

    async fn has_conversation_exception(&self, pair: PairKey) -> StoreResult<bool>;
}

/// Reads the collaborator-owned tables directly.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberDirectory for PgDirectory {
    async fn tier(&self, user: UserId) -> StoreResult<SubscriptionTier> {
        let tier = sqlx::query_scalar::<_, String>(
            "SELECT tier FROM member_subscriptions WHERE user_id = $1 AND (ends_at IS NULL OR ends_at > NOW())",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        // No active subscription row means the free tier; unknown labels too.
        Ok(tier
            .and_then(|t| t.parse().ok())
            .unwrap_or(SubscriptionTier::Free))
    }

    async fn has_blocked(&self, blocker: UserId, blocked: UserId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM member_blocks WHERE blocker_id = $1 AND blocked_id = $2)",
        )
        .bind(blocker)
        .bind(blocked)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn is_abuse_flagged(&self, user: UserId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM abuse_flags WHERE user_id = $1)",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn has_conversation_exception(&self, pair: PairKey) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM conversation_exceptions WHERE user_low = $1 AND user_high = $2)",
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

/// In-memory directory for tests and local runs.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    tiers: Mutex<HashMap<UserId, SubscriptionTier>>,
    blocks: Mutex<HashSet<(UserId, UserId)>>,
    flagged: Mutex<HashSet<UserId>>,
    exceptions: Mutex<HashSet<PairKey>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_tier(&self, user: UserId, tier: SubscriptionTier) {
        self.tiers.lock().await.insert(user, tier);
    }

    pub async fn block(&self, blocker: UserId, blocked: UserId) {
        self.blocks.lock().await.insert((blocker, blocked));
    }

    pub async fn unblock(&self, blocker: UserId, blocked: UserId) {
        self.blocks.lock().await.remove(&(blocker, blocked));
    }

    pub async fn flag_abuse(&self, user: UserId) {
        self.flagged.lock().await.insert(user);
    }

    pub async fn grant_exception(&self, a: UserId, b: UserId) {
        self.exceptions.lock().await.insert(PairKey::new(a, b));
    }
}

#[async_trait]
impl MemberDirectory for StaticDirectory {
    async fn tier(&self, user: UserId) -> StoreResult<SubscriptionTier> {
        Ok(self
            .tiers
            .lock()
            .await
            .get(&user)
            .copied()
            .unwrap_or(SubscriptionTier::Free))
    }

    async fn has_blocked(&self, blocker: UserId, blocked: UserId) -> StoreResult<bool> {
        Ok(self.blocks.lock().await.contains(&(blocker, blocked)))
    }

    async fn is_abuse_flagged(&self, user: UserId) -> StoreResult<bool> {
        Ok(self.flagged.lock().await.contains(&user))
    }

    async fn has_conversation_exception(&self, pair: PairKey) -> StoreResult<bool> {
        Ok(self.exceptions.lock().await.contains(&pair))
    }
}

/// Memoizes directory answers for the lifetime of one request or one
/// listing. Never shared across requests, so a tier change is visible to
/// the very next call.
pub struct RequestScope<'a> {
    directory: &'a dyn MemberDirectory,
    tiers: Mutex<HashMap<UserId, SubscriptionTier>>,
    flags: Mutex<HashMap<UserId, bool>>,
}

impl<'a> RequestScope<'a> {
    pub fn new(directory: &'a dyn MemberDirectory) -> Self {
        Self {
            directory,
            tiers: Mutex::new(HashMap::new()),
            flags: Mutex::new(HashMap::new()),
        }
    }

    pub async fn tier(&self, user: UserId) -> StoreResult<SubscriptionTier> {
        if let Some(tier) = self.tiers.lock().await.get(&user) {
            return Ok(*tier);
        }
        let tier = self.directory.tier(user).await?;
        self.tiers.lock().await.insert(user, tier);
        Ok(tier)
    }

    pub async fn is_abuse_flagged(&self, user: UserId) -> StoreResult<bool> {
        if let Some(flag) = self.flags.lock().await.get(&user) {
            return Ok(*flag);
        }
        let flag = self.directory.is_abuse_flagged(user).await?;
        self.flags.lock().await.insert(user, flag);
        Ok(flag)
    }

    /// Symmetric: either side blocking the other counts.
    pub async fn blocked_either_way(&self, a: UserId, b: UserId) -> StoreResult<bool> {
        Ok(self.directory.has_blocked(a, b).await? || self.directory.has_blocked(b, a).await?)
    }

    pub async fn has_conversation_exception(&self, pair: PairKey) -> StoreResult<bool> {
        self.directory.has_conversation_exception(pair).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingDirectory {
        inner: StaticDirectory,
        tier_lookups: AtomicU32,
    }

    #[async_trait]
    impl MemberDirectory for CountingDirectory {
        async fn tier(&self, user: UserId) -> StoreResult<SubscriptionTier> {
            self.tier_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.tier(user).await
        }
        async fn has_blocked(&self, blocker: UserId, blocked: UserId) -> StoreResult<bool> {
            self.inner.has_blocked(blocker, blocked).await
        }
        async fn is_abuse_flagged(&self, user: UserId) -> StoreResult<bool> {
            self.inner.is_abuse_flagged(user).await
        }
        async fn has_conversation_exception(&self, pair: PairKey) -> StoreResult<bool> {
            self.inner.has_conversation_exception(pair).await
        }
    }

    #[tokio::test]
    async fn test_scope_caches_within_request_only() {
        let directory = CountingDirectory {
            inner: StaticDirectory::new(),
            tier_lookups: AtomicU32::new(0),
        };
        directory.inner.set_tier(UserId(1), SubscriptionTier::Elite).await;

        let scope = RequestScope::new(&directory);
        assert_eq!(scope.tier(UserId(1)).await.unwrap(), SubscriptionTier::Elite);
        assert_eq!(scope.tier(UserId(1)).await.unwrap(), SubscriptionTier::Elite);
        assert_eq!(directory.tier_lookups.load(Ordering::SeqCst), 1);

        // A downgrade shows up in the next request's scope.
        directory.inner.set_tier(UserId(1), SubscriptionTier::Free).await;
        let next = RequestScope::new(&directory);
        assert_eq!(next.tier(UserId(1)).await.unwrap(), SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn test_blocks_are_symmetric_through_scope() {
        let directory = StaticDirectory::new();
        directory.block(UserId(2), UserId(1)).await;
        let scope = RequestScope::new(&directory);
        assert!(scope.blocked_either_way(UserId(1), UserId(2)).await.unwrap());
        assert!(!directory.has_blocked(UserId(1), UserId(2)).await.unwrap());
    }
}
