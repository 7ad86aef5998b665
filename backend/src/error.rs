use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures of the durable store or of a collaborator lookup. Always
/// treated as transient by the engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Blocked,
    AbuseSuppressed,
    TierInsufficient,
    NotParticipant,
    SelfInteraction,
    NotEligible,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::Blocked => "one of the users has blocked the other",
            DenyReason::AbuseSuppressed => "interaction is suppressed",
            DenyReason::TierInsufficient => "subscription tier does not allow this",
            DenyReason::NotParticipant => "caller is not a participant",
            DenyReason::SelfInteraction => "users cannot interact with themselves",
            DenyReason::NotEligible => "pair is not eligible",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    AlreadySent,
    AlreadyOffered,
    AlreadyRedeemed,
    AlreadyExpired,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConflictKind::AlreadySent => "interest was already sent",
            ConflictKind::AlreadyOffered => "an echo offer is already open for this pair",
            ConflictKind::AlreadyRedeemed => "echo offer was already redeemed",
            ConflictKind::AlreadyExpired => "echo offer has expired",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Terminal. Surfaced as "not permitted".
    #[error("not permitted: {0}")]
    PolicyDenied(DenyReason),

    /// Terminal. Surfaced as "already done".
    #[error("already done: {0}")]
    Conflict(ConflictKind),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage unavailable after {attempts} attempts: {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// A write was attempted but could not be confirmed.
    #[error("state of {what} is uncertain after {attempts} attempts")]
    Uncertain { what: &'static str, attempts: u32 },
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transient { .. } | EngineError::Uncertain { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::PolicyDenied(_) => "policy_denied",
            EngineError::Conflict(_) => "conflict",
            EngineError::NotFound(_) => "not_found",
            EngineError::Transient { .. } => "transient",
            EngineError::Uncertain { .. } => "uncertain",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_kinds_are_retryable() {
        assert!(!EngineError::PolicyDenied(DenyReason::Blocked).is_retryable());
        assert!(!EngineError::Conflict(ConflictKind::AlreadyRedeemed).is_retryable());
        assert!(!EngineError::NotFound("edge").is_retryable());
        assert!(EngineError::Uncertain { what: "archive", attempts: 3 }.is_retryable());
        let transient = EngineError::Transient {
            attempts: 3,
            source: StoreError::Unavailable("down".to_string()),
        };
        assert!(transient.is_retryable());
        assert_eq!(transient.kind(), "transient");
    }

    #[test]
    fn test_denial_and_conflict_read_differently() {
        let denied = EngineError::PolicyDenied(DenyReason::Blocked).to_string();
        let conflict = EngineError::Conflict(ConflictKind::AlreadySent).to_string();
        assert!(denied.starts_with("not permitted"));
        assert!(conflict.starts_with("already done"));
    }
}
