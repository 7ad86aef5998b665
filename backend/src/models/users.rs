use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform-wide user identifier, issued by the account service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

/// Canonical key for an unordered pair of users: `(min, max)`.
///
/// Every pair-level lookup goes through this so that `(a, b)` and `(b, a)`
/// resolve to the same row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub low: UserId,
    pub high: UserId,
}

impl PairKey {
    pub fn new(a: UserId, b: UserId) -> Self {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Self { low, high }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Essential,
    Elite,
}

impl SubscriptionTier {
    pub fn is_paid(self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

impl FromStr for SubscriptionTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "essential" => Ok(SubscriptionTier::Essential),
            "elite" => Ok(SubscriptionTier::Elite),
            other => Err(anyhow::anyhow!("Unknown subscription tier: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        let a = UserId(42);
        let b = UserId(7);
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
        assert_eq!(PairKey::new(a, b).low, b);
        assert_eq!(PairKey::new(a, b).high, a);
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("Elite".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Elite);
        assert_eq!(" free ".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Free);
        assert!("platinum".parse::<SubscriptionTier>().is_err());
        assert!(SubscriptionTier::Essential.is_paid());
        assert!(!SubscriptionTier::Free.is_paid());
    }
}
