use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{InterestStore, StoreResult};
use crate::models::{Direction, EdgeId, Endpoint, InterestEdge, UserId};

const EDGE_COLUMNS: &str =
    "id, from_user_id, to_user_id, created_at, expired, sender_archived, receiver_archived";

/// Postgres-backed ledger of interest edges.
#[derive(Debug, Clone)]
pub struct PgInterestStore {
    pool: PgPool,
}

impl PgInterestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterestStore for PgInterestStore {
    async fn insert_edge(&self, from: UserId, to: UserId, now: DateTime<Utc>) -> StoreResult<Option<InterestEdge>> {
        // The unique index on (from_user_id, to_user_id) serializes concurrent
        // senders; only an expired row may be overwritten.
        let edge = sqlx::query_as::<_, InterestEdge>(&format!(
            r#"
            INSERT INTO interest_edges (id, from_user_id, to_user_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_user_id, to_user_id) DO UPDATE
            SET id = EXCLUDED.id,
                created_at = EXCLUDED.created_at,
                expired = FALSE,
                sender_archived = FALSE,
                receiver_archived = FALSE
            WHERE interest_edges.expired = TRUE
            RETURNING {EDGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(from)
        .bind(to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(edge)
    }

    async fn get_edge(&self, id: EdgeId) -> StoreResult<Option<InterestEdge>> {
        let edge = sqlx::query_as::<_, InterestEdge>(&format!(
            "SELECT {EDGE_COLUMNS} FROM interest_edges WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(edge)
    }

    async fn find_edge(&self, from: UserId, to: UserId) -> StoreResult<Option<InterestEdge>> {
        let edge = sqlx::query_as::<_, InterestEdge>(&format!(
            "SELECT {EDGE_COLUMNS} FROM interest_edges WHERE from_user_id = $1 AND to_user_id = $2"
        ))
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(edge)
    }

    async fn set_archived(&self, id: EdgeId, endpoint: Endpoint, archived: bool) -> StoreResult<bool> {
        let sql = match endpoint {
            Endpoint::Sender => "UPDATE interest_edges SET sender_archived = $2 WHERE id = $1",
            Endpoint::Receiver => "UPDATE interest_edges SET receiver_archived = $2 WHERE id = $1",
        };
        let result = sqlx::query(sql)
            .bind(id)
            .bind(archived)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM interest_edges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_edges(&self, user: UserId, direction: Direction) -> StoreResult<Vec<InterestEdge>> {
        let column = match direction {
            Direction::Sent => "from_user_id",
            Direction::Received => "to_user_id",
        };
        let edges = sqlx::query_as::<_, InterestEdge>(&format!(
            "SELECT {EDGE_COLUMNS} FROM interest_edges WHERE {column} = $1 ORDER BY created_at DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    async fn expire_unreciprocated_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<InterestEdge>> {
        let edges = sqlx::query_as::<_, InterestEdge>(
            r#"
            UPDATE interest_edges e
            SET expired = TRUE
            WHERE e.expired = FALSE
            AND e.created_at < $1
            AND NOT EXISTS (
                SELECT 1 FROM interest_edges r
                WHERE r.from_user_id = e.to_user_id
                AND r.to_user_id = e.from_user_id
                AND r.expired = FALSE
            )
            RETURNING e.id, e.from_user_id, e.to_user_id, e.created_at,
                      e.expired, e.sender_archived, e.receiver_archived
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }
}
