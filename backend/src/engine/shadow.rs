//! Abuse shadow filter: a read-time projection, never a deletion.
//!
//! A flagged user sees everything they wrote as if it worked; everyone else
//! sees none of the rows whose counterparty is flagged.

use super::Engine;
use crate::error::EngineResult;
use crate::models::{EchoOffer, InterestEdge, ThreadRow, UserId};
use crate::services::directory::RequestScope;

/// Rows that name exactly one other user from the viewer's perspective.
/// `None` means the viewer is not a party to the row; such rows are never
/// shown to them.
pub trait Counterparty {
    fn counterparty(&self, viewer: UserId) -> Option<UserId>;
}

fn other_end(viewer: UserId, a: UserId, b: UserId) -> Option<UserId> {
    if viewer == a {
        Some(b)
    } else if viewer == b {
        Some(a)
    } else {
        None
    }
}

impl Counterparty for InterestEdge {
    fn counterparty(&self, viewer: UserId) -> Option<UserId> {
        other_end(viewer, self.from_user_id, self.to_user_id)
    }
}

impl Counterparty for EchoOffer {
    fn counterparty(&self, viewer: UserId) -> Option<UserId> {
        other_end(viewer, self.from_user_id, self.to_user_id)
    }
}

impl Counterparty for ThreadRow {
    fn counterparty(&self, viewer: UserId) -> Option<UserId> {
        let [a, b] = self.participants;
        other_end(viewer, a, b)
    }
}

/// Search results and other plain user lists.
impl Counterparty for UserId {
    fn counterparty(&self, _viewer: UserId) -> Option<UserId> {
        Some(*self)
    }
}

impl Engine {
    pub async fn filter_for_viewer<T: Counterparty + Send>(&self, viewer: UserId, rows: Vec<T>) -> EngineResult<Vec<T>> {
        let scope = self.scope();
        self.filter_in_scope(&scope, viewer, rows).await
    }

    pub(crate) async fn filter_in_scope<T: Counterparty + Send>(
        &self,
        scope: &RequestScope<'_>,
        viewer: UserId,
        rows: Vec<T>,
    ) -> EngineResult<Vec<T>> {
        let viewer_flagged = self.retry.run(|| scope.is_abuse_flagged(viewer)).await?;
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(other) = row.counterparty(viewer) else {
                continue;
            };
            if viewer_flagged || other == viewer || !self.retry.run(|| scope.is_abuse_flagged(other)).await? {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    /// Whether `counterpart` must be hidden from `viewer`.
    pub(crate) async fn hides(&self, scope: &RequestScope<'_>, viewer: UserId, counterpart: UserId) -> EngineResult<bool> {
        if viewer == counterpart || self.retry.run(|| scope.is_abuse_flagged(viewer)).await? {
            return Ok(false);
        }
        self.retry.run(|| scope.is_abuse_flagged(counterpart)).await
    }

    /// Blocks collapse a pair to "no interaction" in listings too.
    pub(crate) async fn drop_blocked<T: Counterparty + Send>(
        &self,
        scope: &RequestScope<'_>,
        viewer: UserId,
        rows: Vec<T>,
    ) -> EngineResult<Vec<T>> {
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(other) = row.counterparty(viewer) else {
                continue;
            };
            if !self.retry.run(|| scope.blocked_either_way(viewer, other)).await? {
                kept.push(row);
            }
        }
        Ok(kept)
    }
}
