//! Constants for the net module (timeouts, size limits).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Largest accepted timeout value, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Maximum response body accepted by any connection (1 GiB).
pub const MAX_BODY_BYTES: usize = 1 << 30;
