pub mod connection;
pub mod echoes;
pub mod interests;
pub mod memory;
pub mod migrations;
pub mod store;

pub use connection::{get_db_pool, DatabaseConfig};
pub use echoes::PgEchoStore;
pub use interests::PgInterestStore;
pub use memory::MemoryStore;
pub use store::{EchoStore, InterestStore, StoreResult};
