//! Reciprocal-interest and progressive-disclosure engine.
//!
//! Layering, leaves first: interest ledger, match resolver, echo offers,
//! visibility policy, chat gate, and the abuse shadow filter wrapping every
//! enumeration. Matches and reveal grants are always derived from stored
//! rows, never stored themselves.

pub mod chat_gate;
pub mod echo;
pub mod feed;
pub mod ledger;
pub mod matching;
pub mod retry;
pub mod shadow;
pub mod sweeper;
pub mod visibility;

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::{InterestStore, EchoStore, PgEchoStore, PgInterestStore};
use crate::models::{FeedEvent, FeedEventKind, UserId};
use crate::services::directory::{MemberDirectory, PgDirectory, RequestScope};
use crate::utils::{Clock, EngineSettings, SystemClock};

pub use chat_gate::ChatDecision;
pub use feed::{EventFeed, FeedDedup};
pub use ledger::InterestListing;
pub use retry::RetryPolicy;
pub use shadow::Counterparty;
pub use sweeper::SweepReport;
pub use visibility::{IdentityView, MaskReason, RevealBasis, VisibilityDecision};

pub struct Engine {
    interests: Arc<dyn InterestStore>,
    echoes: Arc<dyn EchoStore>,
    directory: Arc<dyn MemberDirectory>,
    clock: Arc<dyn Clock>,
    feed: EventFeed,
    retry: RetryPolicy,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        interests: Arc<dyn InterestStore>,
        echoes: Arc<dyn EchoStore>,
        directory: Arc<dyn MemberDirectory>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            interests,
            echoes,
            directory,
            clock,
            feed: EventFeed::new(settings.event_feed_capacity),
            retry: RetryPolicy::new(settings.store_retry_attempts, settings.store_retry_backoff_ms),
            settings,
        }
    }

    /// Production wiring: every seam on the same Postgres pool.
    pub fn with_postgres(pool: PgPool, settings: EngineSettings) -> Self {
        Self::new(
            Arc::new(PgInterestStore::new(pool.clone())),
            Arc::new(PgEchoStore::new(pool.clone())),
            Arc::new(PgDirectory::new(pool)),
            Arc::new(SystemClock),
            settings,
        )
    }

    pub fn feed(&self) -> &EventFeed {
        &self.feed
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn scope(&self) -> RequestScope<'_> {
        RequestScope::new(self.directory.as_ref())
    }

    /// Publishes one event to `recipient`, unless the shadow filter hides
    /// `actor` from them. Feed delivery is best-effort.
    async fn notify(&self, scope: &RequestScope<'_>, recipient: UserId, actor: UserId, kind: FeedEventKind) {
        match self.hides(scope, recipient, actor).await {
            Ok(true) => {
                debug!("Suppressed {:?} for {} (actor {} is shadowed)", kind, recipient, actor);
            }
            Ok(false) => {
                let event = FeedEvent::new(recipient, actor, kind, self.clock.now());
                self.feed.publish(event);
            }
            Err(e) => {
                warn!("Dropping feed event for {}: {}", recipient, e);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    //! End-to-end scenarios across the whole engine.

    use super::fixtures::harness;
    use crate::models::{SubscriptionTier, UserId};

    const A: UserId = UserId(1);
    const B: UserId = UserId(2);

    #[tokio::test]
    async fn test_free_user_hearting_elite_user() {
        let h = harness();
        h.tier(B, SubscriptionTier::Elite).await;
        h.engine.send_interest(A, B).await.unwrap();

        assert!(!h.engine.can_see_identity(A, B).await.unwrap());
        assert!(!h.engine.can_exchange_messages(A, B).await.unwrap());
        assert!(h.engine.can_see_identity(B, A).await.unwrap());
    }

    #[tokio::test]
    async fn test_mutual_interest_unlocks_everything_regardless_of_tier() {
        let h = harness();
        h.engine.send_interest(A, B).await.unwrap();
        h.engine.send_interest(B, A).await.unwrap();

        assert!(h.engine.is_match(A, B).await.unwrap());
        for (x, y) in [(A, B), (B, A)] {
            assert!(h.engine.can_see_identity(x, y).await.unwrap());
            assert!(h.engine.can_exchange_messages(x, y).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_echo_redemption_reveals_both_ways_once() {
        let h = harness();
        h.engine.send_interest(A, B).await.unwrap();
        let offer = h.engine.grant_offer(A, B).await.unwrap();

        h.engine.redeem(offer.id, B).await.unwrap();
        assert!(h.engine.can_see_identity(A, B).await.unwrap());
        assert!(h.engine.can_see_identity(B, A).await.unwrap());
        assert!(h.engine.redeem(offer.id, B).await.is_err());
    }

    #[tokio::test]
    async fn test_block_after_match_overrides_it() {
        let h = harness();
        h.engine.send_interest(A, B).await.unwrap();
        h.engine.send_interest(B, A).await.unwrap();
        assert!(h.engine.can_exchange_messages(A, B).await.unwrap());

        h.directory.block(A, B).await;
        assert!(!h.engine.can_exchange_messages(A, B).await.unwrap());
        assert!(!h.engine.can_exchange_messages(B, A).await.unwrap());
        assert!(!h.engine.can_see_identity(B, A).await.unwrap());
        // The match itself is still derivable from the edges.
        assert!(h.engine.is_match(A, B).await.unwrap());
    }
}
