pub mod echoes;
pub mod events;
pub mod interests;
pub mod threads;
pub mod users;

pub use echoes::{EchoOffer, EchoStatus, OfferId, RevealResult};
pub use events::{FeedEvent, FeedEventKind};
pub use interests::{Direction, EdgeId, Endpoint, InterestEdge};
pub use threads::ThreadRow;
pub use users::{PairKey, SubscriptionTier, UserId};
