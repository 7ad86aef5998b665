// =============================================================================
// Kindred Backend Constants
// =============================================================================
// Defaults for every tunable. Environment variables in `utils::config`
// override these.

// =============================================================================
// ECHO OFFERS
// =============================================================================

/// How long an echo offer stays redeemable after it is granted
pub const DEFAULT_ECHO_OFFER_TTL_HOURS: i64 = 72;

// =============================================================================
// STORAGE RETRIES
// =============================================================================

/// Attempts for a store call that fails transiently
pub const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further attempt
pub const DEFAULT_STORE_RETRY_BACKOFF_MS: u64 = 50;

/// Write-then-verify attempts for archive/restore before reporting uncertainty
pub const DEFAULT_ARCHIVE_VERIFY_ATTEMPTS: u32 = 3;

// =============================================================================
// EVENT FEED
// =============================================================================

/// Per-user broadcast buffer; slow subscribers beyond this lag and resubscribe
pub const DEFAULT_EVENT_FEED_CAPACITY: usize = 256;

/// Number of recent event ids a consumer remembers for de-duplication
pub const DEFAULT_FEED_DEDUP_WINDOW: usize = 1024;

/// Interval between keep-alive pings on an open feed stream
pub const FEED_KEEP_ALIVE_SECS: u64 = 15;

// =============================================================================
// SWEEPER
// =============================================================================

/// How often the echo sweeper runs
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default port for platform-only routes, bound to loopback
pub const DEFAULT_INTERNAL_PORT: u16 = 3001;

/// Header carrying the authenticated caller, set by the auth gateway
pub const ACTING_USER_HEADER: &str = "x-user-id";
