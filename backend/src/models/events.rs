use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::echoes::OfferId;
use super::interests::EdgeId;
use super::users::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEventKind {
    InterestReceived { edge_id: EdgeId },
    MatchFormed { with: UserId },
    EdgeDeleted { edge_id: EdgeId },
    EchoOffered { offer_id: OfferId },
    EchoRedeemed { offer_id: OfferId },
    EchoExpired { offer_id: OfferId },
}

/// One state transition as seen by one user. Delivery is at-least-once;
/// consumers de-duplicate on `event_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub event_id: Uuid,
    pub recipient: UserId,
    pub actor: UserId,
    pub kind: FeedEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl FeedEvent {
    pub fn new(recipient: UserId, actor: UserId, kind: FeedEventKind, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            recipient,
            actor,
            kind,
            occurred_at,
        }
    }
}
