//! Session lifecycle payload types.

use serde::{Deserialize, Serialize};

/// Graceful disconnect.
///
/// Sent by a client to terminate its session cleanly. The server treats it
/// exactly like a transport-level disconnect; `reason` is kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goodbye {
    /// Reason for disconnect (for logging/debugging)
    pub reason: String,
}

/// Presence notification broadcast on login and disconnect.
///
/// Carries only the display name; `user joined` and `user left` both use
/// this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Display name of the account that joined or left
    pub username: String,
}
