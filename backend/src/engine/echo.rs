//! Echo offers: `offered -> redeemed` or `offered -> expired`, nothing else.
//!
//! Expiry is decided at read time from `expires_at`; the sweep only brings
//! stored status in line with what readers already assume.

use tracing::info;

use super::Engine;
use crate::error::{ConflictKind, DenyReason, EngineError, EngineResult};
use crate::models::{EchoOffer, EchoStatus, FeedEventKind, OfferId, RevealResult, UserId};
use crate::services::directory::RequestScope;

impl Engine {
    /// Grants `to` a chance to reveal themselves back to `from`. Only valid
    /// while `from`'s interest in `to` is live and unreciprocated.
    pub async fn grant_offer(&self, from: UserId, to: UserId) -> EngineResult<EchoOffer> {
        if from == to {
            return Err(EngineError::PolicyDenied(DenyReason::SelfInteraction));
        }
        let scope = self.scope();
        if self.retry.run(|| scope.blocked_either_way(from, to)).await? {
            return Err(EngineError::PolicyDenied(DenyReason::Blocked));
        }

        let sent = self.retry.run(|| self.interests.find_edge(from, to)).await?;
        let reciprocated = self.retry.run(|| self.interests.find_edge(to, from)).await?;
        if !sent.is_some_and(|e| e.is_live()) || reciprocated.is_some_and(|e| e.is_live()) {
            return Err(EngineError::PolicyDenied(DenyReason::NotEligible));
        }

        let now = self.clock.now();
        if let Some(existing) = self.retry.run(|| self.echoes.find_offered(from, to)).await? {
            if !existing.is_lapsed(now) {
                return Err(EngineError::Conflict(ConflictKind::AlreadyOffered));
            }
            self.lapse(&scope, existing.id).await?;
        }

        let expires_at = now + self.settings.echo_offer_ttl;
        let Some(offer) = self
            .retry
            .run(|| self.echoes.insert_offer(from, to, now, expires_at))
            .await?
        else {
            return Err(EngineError::Conflict(ConflictKind::AlreadyOffered));
        };

        info!("📣 Echo offer {} granted to {} toward {} (expires {})", offer.id, to, from, expires_at);
        self.notify(&scope, to, from, FeedEventKind::EchoOffered { offer_id: offer.id }).await;
        Ok(offer)
    }

    /// Redeems an offer on behalf of its holder. Fails with `AlreadyExpired`
    /// once the deadline has passed, whether or not a sweep has run.
    pub async fn redeem(&self, offer_id: OfferId, acting: UserId) -> EngineResult<RevealResult> {
        let offer = self
            .retry
            .run(|| self.echoes.get_offer(offer_id))
            .await?
            .ok_or(EngineError::NotFound("echo offer"))?;
        if acting != offer.to_user_id {
            return Err(EngineError::PolicyDenied(DenyReason::NotParticipant));
        }
        let scope = self.scope();
        if self
            .retry
            .run(|| scope.blocked_either_way(offer.from_user_id, offer.to_user_id))
            .await?
        {
            return Err(EngineError::PolicyDenied(DenyReason::Blocked));
        }

        let now = self.clock.now();
        match offer.status {
            EchoStatus::Redeemed => return Err(EngineError::Conflict(ConflictKind::AlreadyRedeemed)),
            EchoStatus::Expired => return Err(EngineError::Conflict(ConflictKind::AlreadyExpired)),
            EchoStatus::Offered if offer.is_lapsed(now) => {
                self.lapse(&scope, offer_id).await?;
                return Err(EngineError::Conflict(ConflictKind::AlreadyExpired));
            }
            EchoStatus::Offered => {}
        }

        // The offer stands only while the interest it answers is still live.
        let backing = self
            .retry
            .run(|| self.interests.find_edge(offer.from_user_id, offer.to_user_id))
            .await?;
        if !backing.is_some_and(|e| e.is_live()) {
            self.lapse(&scope, offer_id).await?;
            return Err(EngineError::PolicyDenied(DenyReason::NotEligible));
        }

        // Conditional on status and deadline in a single store call; a lost
        // race is classified from a fresh read.
        let Some(redeemed) = self.retry.run(|| self.echoes.redeem_offer(offer_id, now)).await? else {
            let current = self.retry.run(|| self.echoes.get_offer(offer_id)).await?;
            return Err(match current.map(|o| o.status) {
                Some(EchoStatus::Redeemed) => EngineError::Conflict(ConflictKind::AlreadyRedeemed),
                Some(_) => EngineError::Conflict(ConflictKind::AlreadyExpired),
                None => EngineError::NotFound("echo offer"),
            });
        };

        info!("✨ Echo offer {} redeemed: {} and {} revealed to each other", offer_id, redeemed.from_user_id, redeemed.to_user_id);
        let kind = FeedEventKind::EchoRedeemed { offer_id };
        self.notify(&scope, redeemed.from_user_id, acting, kind.clone()).await;
        self.notify(&scope, acting, acting, kind).await;

        Ok(RevealResult {
            pair: redeemed.pair(),
            revealed_at: now,
            offer: redeemed,
        })
    }

    /// Offers involving `viewer`, newest first. Lapsed offers are reported as
    /// expired even before the sweep catches up.
    pub async fn list_offers(&self, viewer: UserId) -> EngineResult<Vec<EchoOffer>> {
        let scope = self.scope();
        let now = self.clock.now();
        let rows = self.retry.run(|| self.echoes.list_offers(viewer)).await?;
        let rows = self.drop_blocked(&scope, viewer, rows).await?;
        let rows = self.filter_in_scope(&scope, viewer, rows).await?;

        Ok(rows
            .into_iter()
            .map(|mut offer| {
                if offer.status == EchoStatus::Offered && offer.is_lapsed(now) {
                    offer.status = EchoStatus::Expired;
                }
                offer
            })
            .collect())
    }

    /// Bookkeeping pass: moves lapsed offers to `expired` and tells both
    /// parties. Returns the number of offers moved.
    pub async fn sweep_expired_offers(&self) -> EngineResult<usize> {
        let now = self.clock.now();
        let expired = self.retry.run(|| self.echoes.expire_lapsed_offers(now)).await?;
        let scope = self.scope();
        for offer in &expired {
            self.announce_expiry(&scope, offer).await;
        }
        if !expired.is_empty() {
            info!("🧹 Swept {} lapsed echo offers", expired.len());
        }
        Ok(expired.len())
    }

    async fn lapse(&self, scope: &RequestScope<'_>, offer_id: OfferId) -> EngineResult<()> {
        if let Some(offer) = self.retry.run(|| self.echoes.expire_offer(offer_id)).await? {
            info!("Echo offer {} lapsed on read", offer_id);
            self.announce_expiry(scope, &offer).await;
        }
        Ok(())
    }

    async fn announce_expiry(&self, scope: &RequestScope<'_>, offer: &EchoOffer) {
        let kind = FeedEventKind::EchoExpired { offer_id: offer.id };
        self.notify(scope, offer.to_user_id, offer.from_user_id, kind.clone()).await;
        self.notify(scope, offer.from_user_id, offer.to_user_id, kind).await;
    }
}
