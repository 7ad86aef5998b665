use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::UserId;

/// A conversation row owned by the messaging service. Only the participants
/// matter here; message bodies never reach this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRow {
    pub thread_id: Uuid,
    pub participants: [UserId; 2],
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}
