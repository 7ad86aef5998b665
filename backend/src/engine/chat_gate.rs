//! Whether two users may exchange messages. Mirrors the visibility rules
//! but is evaluated on its own: a free sender may be authorized to message
//! someone whose identity they still cannot see.

use serde::Serialize;
use tracing::debug;

use super::Engine;
use super::visibility::RevealBasis;
use crate::error::{DenyReason, EngineError, EngineResult};
use crate::models::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum ChatDecision {
    Allowed(RevealBasis),
    Denied(DenyReason),
}

impl ChatDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ChatDecision::Allowed(_))
    }
}

impl Engine {
    pub async fn can_exchange_messages(&self, sender: UserId, recipient: UserId) -> EngineResult<bool> {
        Ok(self.decide_chat(sender, recipient).await?.is_allowed())
    }

    /// Gate to consult right before handing a message to the messaging
    /// service. A denial is `PolicyDenied`, never a generic failure.
    pub async fn authorize_message(&self, sender: UserId, recipient: UserId) -> EngineResult<RevealBasis> {
        match self.decide_chat(sender, recipient).await? {
            ChatDecision::Allowed(basis) => Ok(basis),
            ChatDecision::Denied(reason) => {
                debug!("Message {} -> {} denied: {}", sender, recipient, reason);
                Err(EngineError::PolicyDenied(reason))
            }
        }
    }

    pub async fn decide_chat(&self, sender: UserId, recipient: UserId) -> EngineResult<ChatDecision> {
        if sender == recipient {
            return Ok(ChatDecision::Denied(DenyReason::SelfInteraction));
        }
        let scope = self.scope();
        if self.retry.run(|| scope.blocked_either_way(sender, recipient)).await? {
            return Ok(ChatDecision::Denied(DenyReason::Blocked));
        }
        if self.retry.run(|| scope.tier(sender)).await?.is_paid() {
            return Ok(ChatDecision::Allowed(RevealBasis::PaidTier));
        }
        Ok(match self.pair_grant(&scope, sender, recipient).await? {
            Some(basis) => ChatDecision::Allowed(basis),
            None => ChatDecision::Denied(DenyReason::TierInsufficient),
        })
    }
}
