//! In-process store used by tests and local runs without Postgres.
//!
//! Mirrors the guarantees of the Postgres store (unique live edge per
//! ordered pair, one `offered` offer per ordered pair, conditional
//! redemption) and can inject faults to exercise the retry paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{EchoStore, InterestStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    Direction, EchoOffer, EchoStatus, EdgeId, Endpoint, InterestEdge, OfferId, PairKey, UserId,
};

#[derive(Debug, Default)]
struct MemoryState {
    edges: HashMap<EdgeId, InterestEdge>,
    offers: HashMap<OfferId, EchoOffer>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_calls: AtomicU32,
    dropped_archive_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` store calls fail with `StoreError::Unavailable`.
    pub fn fail_next_calls(&self, n: u32) {
        self.failing_calls.store(n, Ordering::SeqCst);
    }

    /// The next `n` archive writes report success but change nothing.
    pub fn drop_next_archive_writes(&self, n: u32) {
        self.dropped_archive_writes.store(n, Ordering::SeqCst);
    }

    fn check_fault(&self) -> StoreResult<()> {
        if take_one(&self.failing_calls) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn newest_first<T, F: Fn(&T) -> DateTime<Utc>>(mut rows: Vec<T>, key: F) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl InterestStore for MemoryStore {
    async fn insert_edge(&self, from: UserId, to: UserId, now: DateTime<Utc>) -> StoreResult<Option<InterestEdge>> {
        self.check_fault()?;
        let mut state = self.state.lock().await;

        let existing = state
            .edges
            .values()
            .find(|e| e.from_user_id == from && e.to_user_id == to)
            .cloned();
        if let Some(existing) = existing {
            if existing.is_live() {
                return Ok(None);
            }
            state.edges.remove(&existing.id);
        }

        let edge = InterestEdge {
            id: Uuid::new_v4(),
            from_user_id: from,
            to_user_id: to,
            created_at: now,
            expired: false,
            sender_archived: false,
            receiver_archived: false,
        };
        state.edges.insert(edge.id, edge.clone());
        Ok(Some(edge))
    }

    async fn get_edge(&self, id: EdgeId) -> StoreResult<Option<InterestEdge>> {
        self.check_fault()?;
        Ok(self.state.lock().await.edges.get(&id).cloned())
    }

    async fn find_edge(&self, from: UserId, to: UserId) -> StoreResult<Option<InterestEdge>> {
        self.check_fault()?;
        let state = self.state.lock().await;
        Ok(state
            .edges
            .values()
            .find(|e| e.from_user_id == from && e.to_user_id == to)
            .cloned())
    }

    async fn set_archived(&self, id: EdgeId, endpoint: Endpoint, archived: bool) -> StoreResult<bool> {
        self.check_fault()?;
        let mut state = self.state.lock().await;
        let Some(edge) = state.edges.get_mut(&id) else {
            return Ok(false);
        };
        if take_one(&self.dropped_archive_writes) {
            return Ok(true);
        }
        match endpoint {
            Endpoint::Sender => edge.sender_archived = archived,
            Endpoint::Receiver => edge.receiver_archived = archived,
        }
        Ok(true)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<bool> {
        self.check_fault()?;
        Ok(self.state.lock().await.edges.remove(&id).is_some())
    }

    async fn list_edges(&self, user: UserId, direction: Direction) -> StoreResult<Vec<InterestEdge>> {
        self.check_fault()?;
        let state = self.state.lock().await;
        let rows: Vec<InterestEdge> = state
            .edges
            .values()
            .filter(|e| match direction {
                Direction::Sent => e.from_user_id == user,
                Direction::Received => e.to_user_id == user,
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |e: &InterestEdge| e.created_at))
    }

    async fn expire_unreciprocated_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<InterestEdge>> {
        self.check_fault()?;
        let mut state = self.state.lock().await;
        let doomed: Vec<EdgeId> = state
            .edges
            .values()
            .filter(|e| e.is_live() && e.created_at < cutoff)
            .filter(|e| {
                !state
                    .edges
                    .values()
                    .any(|r| r.from_user_id == e.to_user_id && r.to_user_id == e.from_user_id && r.is_live())
            })
            .map(|e| e.id)
            .collect();

        let mut changed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(edge) = state.edges.get_mut(&id) {
                edge.expired = true;
                changed.push(edge.clone());
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl EchoStore for MemoryStore {
    async fn insert_offer(
        &self,
        from: UserId,
        to: UserId,
        offered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<EchoOffer>> {
        self.check_fault()?;
        let mut state = self.state.lock().await;
        let taken = state.offers.values().any(|o| {
            o.from_user_id == from && o.to_user_id == to && o.status == EchoStatus::Offered
        });
        if taken {
            return Ok(None);
        }

        let offer = EchoOffer {
            id: Uuid::new_v4(),
            from_user_id: from,
            to_user_id: to,
            status: EchoStatus::Offered,
            offered_at,
            expires_at,
            redeemed_at: None,
        };
        state.offers.insert(offer.id, offer.clone());
        Ok(Some(offer))
    }

    async fn get_offer(&self, id: OfferId) -> StoreResult<Option<EchoOffer>> {
        self.check_fault()?;
        Ok(self.state.lock().await.offers.get(&id).cloned())
    }

    async fn find_offered(&self, from: UserId, to: UserId) -> StoreResult<Option<EchoOffer>> {
        self.check_fault()?;
        let state = self.state.lock().await;
        Ok(state
            .offers
            .values()
            .find(|o| o.from_user_id == from && o.to_user_id == to && o.status == EchoStatus::Offered)
            .cloned())
    }

    async fn redeem_offer(&self, id: OfferId, now: DateTime<Utc>) -> StoreResult<Option<EchoOffer>> {
        self.check_fault()?;
        let mut state = self.state.lock().await;
        match state.offers.get_mut(&id) {
            Some(offer) if offer.is_open(now) => {
                offer.status = EchoStatus::Redeemed;
                offer.redeemed_at = Some(now);
                Ok(Some(offer.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn expire_offer(&self, id: OfferId) -> StoreResult<Option<EchoOffer>> {
        self.check_fault()?;
        let mut state = self.state.lock().await;
        match state.offers.get_mut(&id) {
            Some(offer) if offer.status == EchoStatus::Offered => {
                offer.status = EchoStatus::Expired;
                Ok(Some(offer.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn has_redeemed_offer(&self, pair: PairKey) -> StoreResult<bool> {
        self.check_fault()?;
        let state = self.state.lock().await;
        Ok(state
            .offers
            .values()
            .any(|o| o.status == EchoStatus::Redeemed && o.pair() == pair))
    }

    async fn list_offers(&self, user: UserId) -> StoreResult<Vec<EchoOffer>> {
        self.check_fault()?;
        let state = self.state.lock().await;
        let rows: Vec<EchoOffer> = state.offers.values().filter(|o| o.involves(user)).cloned().collect();
        Ok(newest_first(rows, |o: &EchoOffer| o.offered_at))
    }

    async fn expire_lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<EchoOffer>> {
        self.check_fault()?;
        let mut state = self.state.lock().await;
        let mut changed = Vec::new();
        for offer in state.offers.values_mut() {
            if offer.status == EchoStatus::Offered && offer.is_lapsed(now) {
                offer.status = EchoStatus::Expired;
                changed.push(offer.clone());
            }
        }
        Ok(changed)
    }
}
