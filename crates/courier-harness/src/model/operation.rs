//! Operations applied to both the model and the real broadcaster.

/// Mobile numbers the generators draw from. Small on purpose: collisions
/// (duplicate signups, logins against someone else's account) must happen
/// often for the interesting paths to be exercised.
pub const MOBILE_POOL: &[&str] = &["1112223333", "4445556666", "7778889999", "12345", ""];

/// One step of a test scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Transport connection established
    Connect {
        /// Connection ID
        conn_id: u64,
    },

    /// Signup request on a live connection
    Signup {
        /// Originating connection
        conn_id: u64,
        /// Display name
        name: String,
        /// Mobile number
        mobile: String,
        /// Secret
        password: String,
    },

    /// Login request on a live connection
    Login {
        /// Originating connection
        conn_id: u64,
        /// Mobile number
        mobile: String,
        /// Secret
        password: String,
    },

    /// Chat message on a live connection
    Chat {
        /// Originating connection
        conn_id: u64,
        /// Message text
        content: String,
        /// Optional media payload
        media: Option<String>,
    },

    /// Transport connection closed
    Disconnect {
        /// Connection being closed
        conn_id: u64,
        /// Close reason
        reason: String,
    },
}
