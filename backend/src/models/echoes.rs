use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::users::{PairKey, UserId};

pub type OfferId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "echo_status", rename_all = "lowercase")]
pub enum EchoStatus {
    Offered,
    Redeemed,
    Expired,
}

/// A time-limited token letting `to_user_id` reveal themselves back to
/// `from_user_id`, who sent interest that was not reciprocated.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct EchoOffer {
    pub id: OfferId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub status: EchoStatus,
    pub offered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl EchoOffer {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.from_user_id, self.to_user_id)
    }

    /// Deadline check independent of the stored status, so a lapsed offer
    /// is treated as expired before any sweep has touched it.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == EchoStatus::Offered && !self.is_lapsed(now)
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.from_user_id == user || self.to_user_id == user
    }
}

/// Outcome of a successful redemption: identities are revealed both ways.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResult {
    pub offer: EchoOffer,
    pub pair: PairKey,
    pub revealed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lapsed_offer_is_not_open() {
        let now = Utc::now();
        let offer = EchoOffer {
            id: Uuid::new_v4(),
            from_user_id: UserId(1),
            to_user_id: UserId(2),
            status: EchoStatus::Offered,
            offered_at: now - Duration::hours(5),
            expires_at: now - Duration::seconds(1),
            redeemed_at: None,
        };
        assert!(offer.is_lapsed(now));
        assert!(!offer.is_open(now));
        assert!(offer.is_open(now - Duration::hours(1)));
    }
}
