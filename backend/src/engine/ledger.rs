//! Interest ledger: directed edges plus per-endpoint archive state.

use serde::Serialize;
use tracing::{info, warn};

use super::Engine;
use super::visibility::IdentityView;
use crate::error::{ConflictKind, DenyReason, EngineError, EngineResult};
use crate::models::{Direction, EdgeId, FeedEventKind, InterestEdge, UserId};

/// One row of a user's interest list, with the counterparty already
/// resolved to either their identity or a mask.
#[derive(Debug, Clone, Serialize)]
pub struct InterestListing {
    pub edge: InterestEdge,
    pub direction: Direction,
    pub counterparty: IdentityView,
}

impl Engine {
    /// Records that `from` is interested in `to`.
    pub async fn send_interest(&self, from: UserId, to: UserId) -> EngineResult<InterestEdge> {
        if from == to {
            return Err(EngineError::PolicyDenied(DenyReason::SelfInteraction));
        }
        let scope = self.scope();
        if self.retry.run(|| scope.blocked_either_way(from, to)).await? {
            info!("Interest {} -> {} refused: pair is blocked", from, to);
            return Err(EngineError::PolicyDenied(DenyReason::Blocked));
        }

        let now = self.clock.now();
        let Some(edge) = self.retry.run(|| self.interests.insert_edge(from, to, now)).await? else {
            return Err(EngineError::Conflict(ConflictKind::AlreadySent));
        };
        info!("💌 Interest {} -> {} recorded as edge {}", from, to, edge.id);

        // A plain heart back supersedes the echo opportunity it would have used.
        if let Some(offer) = self.retry.run(|| self.echoes.find_offered(to, from)).await? {
            let offer_id = offer.id;
            if let Some(consumed) = self.retry.run(|| self.echoes.expire_offer(offer_id)).await? {
                info!("Echo offer {} consumed by reciprocal interest {} -> {}", consumed.id, from, to);
                self.notify(&scope, to, from, FeedEventKind::EchoExpired { offer_id }).await;
                self.notify(&scope, from, to, FeedEventKind::EchoExpired { offer_id }).await;
            }
        }

        self.notify(&scope, to, from, FeedEventKind::InterestReceived { edge_id: edge.id }).await;

        if self.is_match(from, to).await? {
            info!("🎉 Match formed between {} and {}", from, to);
            self.notify(&scope, to, from, FeedEventKind::MatchFormed { with: from }).await;
            self.notify(&scope, from, to, FeedEventKind::MatchFormed { with: to }).await;
        }

        Ok(edge)
    }

    /// Hides the edge from `by` only. The other endpoint and match
    /// resolution are unaffected.
    pub async fn archive(&self, edge_id: EdgeId, by: UserId) -> EngineResult<InterestEdge> {
        self.set_archive_flag(edge_id, by, true).await
    }

    pub async fn restore(&self, edge_id: EdgeId, by: UserId) -> EngineResult<InterestEdge> {
        self.set_archive_flag(edge_id, by, false).await
    }

    /// Write the flag, read it back, and retry a bounded number of times if
    /// the write is not visible. Never reports success it has not observed.
    async fn set_archive_flag(&self, edge_id: EdgeId, by: UserId, archived: bool) -> EngineResult<InterestEdge> {
        let edge = self.load_edge(edge_id).await?;
        let endpoint = edge
            .endpoint_of(by)
            .ok_or(EngineError::PolicyDenied(DenyReason::NotParticipant))?;
        if edge.archived_by(endpoint) == archived {
            return Ok(edge);
        }

        let attempts = self.settings.archive_verify_attempts.max(1);
        for attempt in 1..=attempts {
            if !self.retry.run(|| self.interests.set_archived(edge_id, endpoint, archived)).await? {
                return Err(EngineError::NotFound("interest edge"));
            }
            match self.retry.run(|| self.interests.get_edge(edge_id)).await? {
                Some(current) if current.archived_by(endpoint) == archived => {
                    info!("Edge {} archived={} for {:?} {}", edge_id, archived, endpoint, by);
                    return Ok(current);
                }
                Some(_) => {
                    warn!("Archive write on edge {} not visible on read-back (attempt {}/{})", edge_id, attempt, attempts);
                }
                None => return Err(EngineError::NotFound("interest edge")),
            }
        }

        Err(EngineError::Uncertain {
            what: "archive flag",
            attempts,
        })
    }

    /// Removes the edge for both endpoints. Irreversible.
    pub async fn hard_delete(&self, edge_id: EdgeId, by: UserId) -> EngineResult<()> {
        let edge = self.load_edge(edge_id).await?;
        if edge.endpoint_of(by).is_none() {
            return Err(EngineError::PolicyDenied(DenyReason::NotParticipant));
        }
        if !self.retry.run(|| self.interests.delete_edge(edge_id)).await? {
            return Err(EngineError::NotFound("interest edge"));
        }
        info!("🗑️ Edge {} ({} -> {}) hard-deleted by {}", edge_id, edge.from_user_id, edge.to_user_id, by);

        let scope = self.scope();
        let other = if by == edge.from_user_id { edge.to_user_id } else { edge.from_user_id };
        self.notify(&scope, other, by, FeedEventKind::EdgeDeleted { edge_id }).await;
        self.notify(&scope, by, by, FeedEventKind::EdgeDeleted { edge_id }).await;
        Ok(())
    }

    /// Live edges in one direction for `viewer`. With `archived` set, only
    /// the edges the viewer archived; otherwise only those they did not.
    /// Blocked pairs and shadowed counterparties are dropped.
    pub async fn list_interests(
        &self,
        viewer: UserId,
        direction: Direction,
        archived: bool,
    ) -> EngineResult<Vec<InterestListing>> {
        let scope = self.scope();
        let rows: Vec<InterestEdge> = self
            .retry
            .run(|| self.interests.list_edges(viewer, direction))
            .await?
            .into_iter()
            .filter(|edge| edge.is_live() && edge.visible_to(viewer) != archived)
            .collect();

        let rows = self.drop_blocked(&scope, viewer, rows).await?;
        let rows = self.filter_in_scope(&scope, viewer, rows).await?;

        let mut listings = Vec::with_capacity(rows.len());
        for edge in rows {
            let other = if direction == Direction::Sent { edge.to_user_id } else { edge.from_user_id };
            let counterparty = self.decide_in_scope(&scope, viewer, other).await?.view_of(other);
            listings.push(InterestListing {
                edge,
                direction,
                counterparty,
            });
        }
        Ok(listings)
    }

    /// Time-based expiry of unreciprocated interest. Returns how many edges
    /// were expired; a no-op when no interest TTL is configured.
    pub async fn expire_stale_interests(&self) -> EngineResult<usize> {
        let Some(ttl) = self.settings.interest_ttl else {
            return Ok(0);
        };
        let cutoff = self.clock.now() - ttl;
        let expired = self
            .retry
            .run(|| self.interests.expire_unreciprocated_before(cutoff))
            .await?;
        if !expired.is_empty() {
            info!("🧹 Expired {} unreciprocated interest edges older than {}", expired.len(), cutoff);
        }
        Ok(expired.len())
    }

    async fn load_edge(&self, edge_id: EdgeId) -> EngineResult<InterestEdge> {
        self.retry
            .run(|| self.interests.get_edge(edge_id))
            .await?
            .ok_or(EngineError::NotFound("interest edge"))
    }
}
