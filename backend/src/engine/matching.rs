//! Match resolver. A match is never stored; it is recomputed from the two
//! directed edges on every call.

use super::Engine;
use crate::error::EngineResult;
use crate::models::{PairKey, UserId};

impl Engine {
    /// True iff both directed edges exist and neither is expired. Symmetric.
    pub async fn is_match(&self, a: UserId, b: UserId) -> EngineResult<bool> {
        if a == b {
            return Ok(false);
        }
        // Always read in canonical order so both callers take the same path.
        let pair = PairKey::new(a, b);
        let forward = self.retry.run(|| self.interests.find_edge(pair.low, pair.high)).await?;
        if !forward.is_some_and(|edge| edge.is_live()) {
            return Ok(false);
        }
        let backward = self.retry.run(|| self.interests.find_edge(pair.high, pair.low)).await?;
        Ok(backward.is_some_and(|edge| edge.is_live()))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::InterestStore;
    use crate::engine::fixtures::harness;
    use crate::models::UserId;
    use crate::utils::Clock;
    use chrono::Duration;

    const A: UserId = UserId(10);
    const B: UserId = UserId(3);

    #[tokio::test]
    async fn test_match_is_symmetric() {
        let h = harness();
        assert!(!h.engine.is_match(A, B).await.unwrap());
        h.engine.send_interest(A, B).await.unwrap();
        assert!(!h.engine.is_match(A, B).await.unwrap());
        assert!(!h.engine.is_match(B, A).await.unwrap());

        h.engine.send_interest(B, A).await.unwrap();
        assert!(h.engine.is_match(A, B).await.unwrap());
        assert!(h.engine.is_match(B, A).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_edge_breaks_match() {
        let h = harness();
        h.engine.send_interest(A, B).await.unwrap();
        h.clock.advance(Duration::days(2));
        // Only the unreciprocated edge is eligible for time expiry.
        h.store
            .expire_unreciprocated_before(h.clock.now())
            .await
            .unwrap();
        h.engine.send_interest(B, A).await.unwrap();
        assert!(!h.engine.is_match(A, B).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_never_matches_themselves() {
        let h = harness();
        assert!(!h.engine.is_match(A, A).await.unwrap());
    }
}
