//! Production Environment implementation using system time and RNG.

use std::time::{SystemTime, UNIX_EPOCH};

use courier_core::Environment;

/// Production environment using the system clock and cryptographic RNG.
///
/// - `std::time::SystemTime` for wall-clock timestamps
/// - `getrandom` for connection IDs
///
/// # Security
///
/// The RNG uses `getrandom`, which provides OS-level cryptographic
/// randomness. Connection IDs must be unpredictable so one client cannot
/// guess another's ID.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn unix_millis(&self) -> u64 {
        // A clock before the unix epoch would make duration_since fail;
        // saturate to 0 rather than panic.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // NOTE: This should never fail on supported platforms, if it does it's a
            // critical error. Fill with zeros as a fallback (not secure, but
            // prevents panic).
            tracing::error!("getrandom failed: {}", e);
            buffer.fill(0);
        });
    }
}
