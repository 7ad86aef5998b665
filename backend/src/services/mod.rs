pub mod directory;

pub use directory::{MemberDirectory, PgDirectory, RequestScope, StaticDirectory};
