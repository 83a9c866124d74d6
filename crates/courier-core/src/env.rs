//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples relay logic from system resources
//! (wall clock, randomness). The production runtime plugs in system time
//! and OS entropy; the test harness plugs in a fixed clock and a seeded
//! RNG so every run is reproducible.
//!
//! # Invariants
//!
//! - Monotonicity: `unix_millis()` must never go backwards
//! - Isolation: implementations must not share global state

/// Abstract environment providing time and randomness.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current wall-clock time as unix milliseconds.
    ///
    /// Used to stamp chat broadcasts at fan-out time.
    ///
    /// # Invariants
    ///
    /// Within a single execution context, subsequent calls must return
    /// values >= previous calls.
    fn unix_millis(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// Production implementations must use OS-level entropy (connection IDs
    /// must be unpredictable); test implementations should use a seeded RNG
    /// and log the seed for reproducibility.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for generating connection IDs.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
