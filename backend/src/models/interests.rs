use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::users::UserId;

pub type EdgeId = Uuid;

/// "`from_user_id` expressed interest in `to_user_id`".
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InterestEdge {
    pub id: EdgeId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
    pub sender_archived: bool,
    pub receiver_archived: bool,
}

/// Which end of an edge an actor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Sender,
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl InterestEdge {
    pub fn is_live(&self) -> bool {
        !self.expired
    }

    pub fn endpoint_of(&self, user: UserId) -> Option<Endpoint> {
        if user == self.from_user_id {
            Some(Endpoint::Sender)
        } else if user == self.to_user_id {
            Some(Endpoint::Receiver)
        } else {
            None
        }
    }

    pub fn archived_by(&self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Sender => self.sender_archived,
            Endpoint::Receiver => self.receiver_archived,
        }
    }

    /// Hidden from `user` only if `user` archived it themselves.
    pub fn visible_to(&self, user: UserId) -> bool {
        match self.endpoint_of(user) {
            Some(endpoint) => !self.archived_by(endpoint),
            None => false,
        }
    }
}
