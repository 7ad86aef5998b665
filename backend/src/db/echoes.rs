use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{EchoStore, StoreResult};
use crate::models::{EchoOffer, OfferId, PairKey, UserId};

const OFFER_COLUMNS: &str =
    "id, from_user_id, to_user_id, status, offered_at, expires_at, redeemed_at";

#[derive(Debug, Clone)]
pub struct PgEchoStore {
    pool: PgPool,
}

impl PgEchoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EchoStore for PgEchoStore {
    async fn insert_offer(
        &self,
        from: UserId,
        to: UserId,
        offered_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Option<EchoOffer>> {
        let offer = sqlx::query_as::<_, EchoOffer>(&format!(
            r#"
            INSERT INTO echo_offers (id, from_user_id, to_user_id, status, offered_at, expires_at)
            VALUES ($1, $2, $3, 'offered', $4, $5)
            ON CONFLICT (from_user_id, to_user_id) WHERE status = 'offered' DO NOTHING
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(from)
        .bind(to)
        .bind(offered_at)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    async fn get_offer(&self, id: OfferId) -> StoreResult<Option<EchoOffer>> {
        let offer = sqlx::query_as::<_, EchoOffer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM echo_offers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    async fn find_offered(&self, from: UserId, to: UserId) -> StoreResult<Option<EchoOffer>> {
        let offer = sqlx::query_as::<_, EchoOffer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM echo_offers
            WHERE from_user_id = $1 AND to_user_id = $2 AND status = 'offered'
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    async fn redeem_offer(&self, id: OfferId, now: DateTime<Utc>) -> StoreResult<Option<EchoOffer>> {
        // Deadline is part of the predicate so a lapsed offer can never be
        // redeemed, swept or not.
        let offer = sqlx::query_as::<_, EchoOffer>(&format!(
            r#"
            UPDATE echo_offers
            SET status = 'redeemed', redeemed_at = $2
            WHERE id = $1 AND status = 'offered' AND expires_at > $2
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    async fn expire_offer(&self, id: OfferId) -> StoreResult<Option<EchoOffer>> {
        let offer = sqlx::query_as::<_, EchoOffer>(&format!(
            r#"
            UPDATE echo_offers
            SET status = 'expired'
            WHERE id = $1 AND status = 'offered'
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    async fn has_redeemed_offer(&self, pair: PairKey) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM echo_offers
                WHERE status = 'redeemed'
                AND ((from_user_id = $1 AND to_user_id = $2) OR (from_user_id = $2 AND to_user_id = $1))
            )
            "#,
        )
        .bind(pair.low)
        .bind(pair.high)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_offers(&self, user: UserId) -> StoreResult<Vec<EchoOffer>> {
        let offers = sqlx::query_as::<_, EchoOffer>(&format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM echo_offers
            WHERE from_user_id = $1 OR to_user_id = $1
            ORDER BY offered_at DESC
            "#
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(offers)
    }

    async fn expire_lapsed_offers(&self, now: DateTime<Utc>) -> StoreResult<Vec<EchoOffer>> {
        let offers = sqlx::query_as::<_, EchoOffer>(&format!(
            r#"
            UPDATE echo_offers
            SET status = 'expired'
            WHERE status = 'offered' AND expires_at <= $1
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(offers)
    }
}
