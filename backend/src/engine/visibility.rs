//! Who may see whose identity. First matching rule wins; anything that is
//! not revealed is fully masked.

use serde::Serialize;

use super::Engine;
use crate::error::EngineResult;
use crate::models::{PairKey, UserId};
use crate::services::directory::RequestScope;

/// What granted a reveal (or a chat authorization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealBasis {
    SelfView,
    PaidTier,
    Match,
    RedeemedEcho,
    ConversationException,
}

/// Pair-level grants, tried in this order. Tier and block rules are
/// evaluated by the callers before these.
pub const PAIR_GRANTS: [RevealBasis; 3] = [
    RevealBasis::Match,
    RevealBasis::RedeemedEcho,
    RevealBasis::ConversationException,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskReason {
    Blocked,
    AbuseSuppressed,
    NotAuthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "basis", rename_all = "snake_case")]
pub enum VisibilityDecision {
    Revealed(RevealBasis),
    Masked(MaskReason),
}

/// How a counterparty is rendered. `Masked` carries no fields at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum IdentityView {
    Revealed { user_id: UserId },
    Masked,
}

impl VisibilityDecision {
    pub fn is_revealed(&self) -> bool {
        matches!(self, VisibilityDecision::Revealed(_))
    }

    pub fn view_of(&self, other: UserId) -> IdentityView {
        match self {
            VisibilityDecision::Revealed(_) => IdentityView::Revealed { user_id: other },
            VisibilityDecision::Masked(_) => IdentityView::Masked,
        }
    }
}

impl Engine {
    pub async fn can_see_identity(&self, viewer: UserId, other: UserId) -> EngineResult<bool> {
        Ok(self.decide_visibility(viewer, other).await?.is_revealed())
    }

    pub async fn decide_visibility(&self, viewer: UserId, other: UserId) -> EngineResult<VisibilityDecision> {
        let scope = self.scope();
        self.decide_in_scope(&scope, viewer, other).await
    }

    pub(crate) async fn decide_in_scope(
        &self,
        scope: &RequestScope<'_>,
        viewer: UserId,
        other: UserId,
    ) -> EngineResult<VisibilityDecision> {
        if viewer == other {
            return Ok(VisibilityDecision::Revealed(RevealBasis::SelfView));
        }
        if self.retry.run(|| scope.blocked_either_way(viewer, other)).await? {
            return Ok(VisibilityDecision::Masked(MaskReason::Blocked));
        }
        if self.retry.run(|| scope.is_abuse_flagged(other)).await? {
            return Ok(VisibilityDecision::Masked(MaskReason::AbuseSuppressed));
        }
        if self.retry.run(|| scope.tier(viewer)).await?.is_paid() {
            return Ok(VisibilityDecision::Revealed(RevealBasis::PaidTier));
        }
        Ok(match self.pair_grant(scope, viewer, other).await? {
            Some(basis) => VisibilityDecision::Revealed(basis),
            None => VisibilityDecision::Masked(MaskReason::NotAuthorized),
        })
    }

    /// Walks `PAIR_GRANTS` in order and returns the first that holds.
    pub(crate) async fn pair_grant(
        &self,
        scope: &RequestScope<'_>,
        a: UserId,
        b: UserId,
    ) -> EngineResult<Option<RevealBasis>> {
        let pair = PairKey::new(a, b);
        for basis in PAIR_GRANTS {
            let granted = match basis {
                RevealBasis::Match => self.is_match(a, b).await?,
                RevealBasis::RedeemedEcho => self.retry.run(|| self.echoes.has_redeemed_offer(pair)).await?,
                RevealBasis::ConversationException => {
                    self.retry.run(|| scope.has_conversation_exception(pair)).await?
                }
                RevealBasis::SelfView | RevealBasis::PaidTier => false,
            };
            if granted {
                return Ok(Some(basis));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::harness;
    use crate::models::SubscriptionTier;

    const A: UserId = UserId(1);
    const B: UserId = UserId(2);

    #[tokio::test]
    async fn test_free_viewer_without_grant_sees_mask() {
        let h = harness();
        let decision = h.engine.decide_visibility(A, B).await.unwrap();
        assert_eq!(decision, VisibilityDecision::Masked(MaskReason::NotAuthorized));
        assert_eq!(decision.view_of(B), IdentityView::Masked);
    }

    #[tokio::test]
    async fn test_paid_viewer_sees_identity() {
        let h = harness();
        h.tier(A, SubscriptionTier::Essential).await;
        assert_eq!(
            h.engine.decide_visibility(A, B).await.unwrap(),
            VisibilityDecision::Revealed(RevealBasis::PaidTier)
        );
        assert!(!h.engine.can_see_identity(B, A).await.unwrap());
    }

    #[tokio::test]
    async fn test_block_beats_paid_tier() {
        let h = harness();
        h.tier(A, SubscriptionTier::Elite).await;
        h.directory.block(B, A).await;
        assert_eq!(
            h.engine.decide_visibility(A, B).await.unwrap(),
            VisibilityDecision::Masked(MaskReason::Blocked)
        );
    }

    #[tokio::test]
    async fn test_abuse_flag_masks_flagged_user_from_others() {
        let h = harness();
        h.tier(A, SubscriptionTier::Elite).await;
        h.directory.flag_abuse(B).await;
        assert_eq!(
            h.engine.decide_visibility(A, B).await.unwrap(),
            VisibilityDecision::Masked(MaskReason::AbuseSuppressed)
        );
        assert!(h.engine.can_see_identity(B, B).await.unwrap());
    }

    #[tokio::test]
    async fn test_conversation_exception_is_last_resort_grant() {
        let h = harness();
        h.directory.grant_exception(B, A).await;
        assert_eq!(
            h.engine.decide_visibility(A, B).await.unwrap(),
            VisibilityDecision::Revealed(RevealBasis::ConversationException)
        );
    }

    #[tokio::test]
    async fn test_match_is_preferred_over_later_grants() {
        let h = harness();
        h.directory.grant_exception(A, B).await;
        h.engine.send_interest(A, B).await.unwrap();
        h.engine.send_interest(B, A).await.unwrap();
        assert_eq!(
            h.engine.decide_visibility(A, B).await.unwrap(),
            VisibilityDecision::Revealed(RevealBasis::Match)
        );
    }
}
