pub mod clock;
pub mod config;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, EngineSettings};
pub use logging::init_logging;
