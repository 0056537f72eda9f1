/// Default HTTP/WebSocket listen port
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default number of history entries returned per query
pub const DEFAULT_HISTORY_LIMIT: u32 = 200;

/// Hard cap on history entries per query, whatever the caller asks for
pub const MAX_HISTORY_LIMIT: u32 = 1000;

/// Interval after which an idle client emits stopTyping on its own (client-side debounce)
pub const CLIENT_TYPING_DEBOUNCE_MS: u64 = 600;

/// Server-side typing expiry window: 3x the client debounce, so a dropped
/// stop signal cannot leave an indicator stuck on
pub const DEFAULT_TYPING_TTL_MS: u64 = 3 * CLIENT_TYPING_DEBOUNCE_MS;

/// How often the server scans for expired typing entries
pub const TYPING_SWEEP_INTERVAL_MS: u64 = 500;

/// Default bound on a single persistence call
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
