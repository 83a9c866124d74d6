//! Account registration and login payload types.

use serde::{Deserialize, Serialize};

/// Account registration request.
///
/// `mobile` is the unique account key and must be exactly 10 ASCII digits.
/// Validation happens server-side; the payload itself carries the fields
/// verbatim.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl redacts `password` to prevent
///   accidental logging of credentials. Always use custom `Debug`
///   implementations for types containing secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signup {
    /// Display name for the new account
    pub name: String,
    /// Mobile number (10 ASCII digits) - the unique account key
    pub mobile: String,
    /// Account secret, transmitted and stored verbatim
    pub password: String,
}

impl std::fmt::Debug for Signup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signup")
            .field("name", &self.name)
            .field("mobile", &self.mobile)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login request.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl redacts `password`, same as
///   [`Signup`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    /// Mobile number of the account to authenticate
    pub mobile: String,
    /// Account secret
    pub password: String,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("mobile", &self.mobile)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Public projection of an authenticated account.
///
/// Sent back to the logging-in session and stamped onto chat broadcasts.
/// `id` is the mobile number; it never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account identifier (the mobile number)
    pub id: String,
    /// Display name
    pub name: String,
    /// Mobile number
    pub mobile: String,
}
