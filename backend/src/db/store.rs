use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    Direction, EchoOffer, EdgeId, Endpoint, InterestEdge, OfferId, PairKey, UserId,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable home of interest edges. Uniqueness per ordered pair is the
/// store's job, not the caller's.
#[async_trait]
pub trait InterestStore: Send + Sync {
    /// Inserts a live edge, superseding an expired one for the same ordered
    /// pair. Returns `None` when a live edge already exists.
    async fn insert_edge(&self, from: UserId, to: UserId, now: DateTime<Utc>) -> StoreResult<Option<InterestEdge>>;

    async fn get_edge(&self, id: EdgeId) -> StoreResult<Option<InterestEdge>>;

    async fn find_edge(&self, from: UserId, to: UserId) -> StoreResult<Option<InterestEdge>>;

    /// Single-row update of one endpoint's flag. Returns `false` if the edge
    /// does not exist.
    async fn set_archived(&self, id: EdgeId, endpoint: Endpoint, archived: bool) -> StoreResult<bool>;

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<bool>;

    /// Newest first.
    async fn list_edges(&self, user: UserId, direction: Direction) -> StoreResult<Vec<InterestEdge>>;

    /// Marks live edges created before `cutoff` as expired, skipping edges
    /// whose reverse is also live. Returns the rows it changed.
    async fn expire_unreciprocated_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<InterestEdge>>;
}

#[async_trait]
pub trait EchoStore: Send + Sync {
    /// Returns `None` when an `offered` row already exists for the ordered pair.
    async fn insert_offer(
        &self,
        from: UserId,
        to: UserId,
        offered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<EchoOffer>>;

    async fn get_offer(&self, id: OfferId) -> StoreResult<Option<EchoOffer>>;

    /// The `offered` row for the ordered pair, whether or not its deadline passed.
    async fn find_offered(&self, from: UserId, to: UserId) -> StoreResult<Option<EchoOffer>>;

    /// `offered -> redeemed`, only while `now < expires_at`. Returns `None`
    /// if the conditional update matched nothing.
    async fn redeem_offer(&self, id: OfferId, now: DateTime<Utc>) -> StoreResult<Option<EchoOffer>>;

    /// `offered -> expired`. Returns `None` if the offer was not `offered`.
    async fn expire_offer(&self, id: OfferId) -> StoreResult<Option<EchoOffer>>;

    async fn has_redeemed_offer(&self, pair: PairKey) -> StoreResult<bool>;

    async fn list_offers(&self, user: UserId) -> StoreResult<Vec<EchoOffer>>;

    /// Moves every lapsed `offered` row to `expired`.
    async fn expire_lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<EchoOffer>>;
}
