//! Identity store.
//!
//! In-memory registry of accounts keyed by mobile number. The store is the
//! only state that outlives a session: accounts are created at signup and
//! never mutated or deleted for the lifetime of the process.
//!
//! Secrets are stored and compared verbatim (exact string equality, not
//! timing-safe). That matches the observable behavior this relay is
//! specified to have; it is documented, not recommended.

use std::collections::HashMap;

use courier_proto::payloads::Identity;

/// A registered account.
///
/// The mobile number is the unique key. The secret is private to this
/// module; it never appears in the public projection or in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Display name
    pub name: String,
    /// Mobile number (10 ASCII digits) - the unique key
    pub mobile: String,
    /// Account secret, compared at login
    secret: String,
}

impl Account {
    /// Public projection of this account, safe to put on the wire.
    pub fn identity(&self) -> Identity {
        Identity { id: self.mobile.clone(), name: self.name.clone(), mobile: self.mobile.clone() }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("mobile", &self.mobile)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Errors from identity store operations.
///
/// The `Display` strings are what clients see in error acknowledgments,
/// so they are worded for end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// A required field was empty
    #[error("all fields are required")]
    MissingFields,

    /// Mobile number is not exactly 10 ASCII digits
    #[error("please enter a valid 10-digit mobile number")]
    InvalidMobileFormat,

    /// Mobile number already has an account
    #[error("mobile number already registered")]
    AlreadyRegistered,

    /// Unknown mobile number or wrong secret
    #[error("invalid mobile number or password")]
    InvalidCredentials,
}

impl IdentityError {
    /// Returns true if this error is a field validation failure (as opposed
    /// to a conflict or credential mismatch).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingFields | Self::InvalidMobileFormat)
    }
}

/// Registry of accounts keyed by mobile number.
///
/// Constructed once at process start and owned by the broadcaster; there
/// is no global state. No update or delete operations exist.
#[derive(Debug, Default)]
pub struct IdentityStore {
    accounts: HashMap<String, Account>,
}

impl IdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `MissingFields` if any field is empty
    /// - `InvalidMobileFormat` unless `mobile` is exactly 10 ASCII digits
    /// - `AlreadyRegistered` if the mobile number has an account; the
    ///   existing account is left untouched
    pub fn register(&mut self, name: &str, mobile: &str, secret: &str) -> Result<(), IdentityError> {
        if name.is_empty() || mobile.is_empty() || secret.is_empty() {
            return Err(IdentityError::MissingFields);
        }
        if !is_valid_mobile(mobile) {
            return Err(IdentityError::InvalidMobileFormat);
        }
        if self.accounts.contains_key(mobile) {
            return Err(IdentityError::AlreadyRegistered);
        }

        self.accounts.insert(
            mobile.to_owned(),
            Account { name: name.to_owned(), mobile: mobile.to_owned(), secret: secret.to_owned() },
        );
        tracing::debug!(mobile, "account registered");

        Ok(())
    }

    /// Authenticate against a stored account.
    ///
    /// # Errors
    ///
    /// - `MissingFields` if either field is empty
    /// - `InvalidCredentials` if the mobile is unknown or the secret does
    ///   not match (exact string equality)
    pub fn authenticate(&self, mobile: &str, secret: &str) -> Result<&Account, IdentityError> {
        if mobile.is_empty() || secret.is_empty() {
            return Err(IdentityError::MissingFields);
        }

        self.accounts
            .get(mobile)
            .filter(|account| account.secret == secret)
            .ok_or(IdentityError::InvalidCredentials)
    }

    /// Check if a mobile number is registered.
    pub fn contains(&self, mobile: &str) -> bool {
        self.accounts.contains_key(mobile)
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True if no accounts are registered.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Exactly 10 ASCII digits.
fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 10 && mobile.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_authenticate() {
        let mut store = IdentityStore::new();
        store.register("Alice", "1112223333", "pw").expect("register");

        let account = store.authenticate("1112223333", "pw").expect("authenticate");
        assert_eq!(account.name, "Alice");
        assert_eq!(account.mobile, "1112223333");
    }

    #[test]
    fn register_rejects_empty_fields() {
        let mut store = IdentityStore::new();

        assert_eq!(store.register("", "1112223333", "pw"), Err(IdentityError::MissingFields));
        assert_eq!(store.register("Alice", "", "pw"), Err(IdentityError::MissingFields));
        assert_eq!(store.register("Alice", "1112223333", ""), Err(IdentityError::MissingFields));
        assert!(store.is_empty());
    }

    #[test]
    fn register_rejects_short_mobile() {
        let mut store = IdentityStore::new();

        let result = store.register("Alice", "12345", "pw");
        assert_eq!(result, Err(IdentityError::InvalidMobileFormat));
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn register_rejects_non_digit_mobile() {
        let mut store = IdentityStore::new();

        assert_eq!(
            store.register("Alice", "11122x3333", "pw"),
            Err(IdentityError::InvalidMobileFormat)
        );
        assert_eq!(
            store.register("Alice", "111222333４", "pw"),
            Err(IdentityError::InvalidMobileFormat),
            "non-ASCII digits must be rejected"
        );
    }

    #[test]
    fn duplicate_register_leaves_original_untouched() {
        let mut store = IdentityStore::new();
        store.register("Alice", "1112223333", "pw").expect("register");

        let result = store.register("Mallory", "1112223333", "other");
        assert_eq!(result, Err(IdentityError::AlreadyRegistered));

        // Original account is unchanged: old credentials still work,
        // new ones do not.
        assert_eq!(store.len(), 1);
        assert!(store.authenticate("1112223333", "pw").is_ok());
        assert!(matches!(
            store.authenticate("1112223333", "other"),
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[test]
    fn authenticate_wrong_secret() {
        let mut store = IdentityStore::new();
        store.register("Alice", "1112223333", "pw").expect("register");

        let result = store.authenticate("1112223333", "wrong");
        assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
        assert_eq!(store.len(), 1, "failed authentication must not change the store");
    }

    #[test]
    fn authenticate_unknown_mobile() {
        let store = IdentityStore::new();

        let result = store.authenticate("9998887777", "pw");
        assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
    }

    #[test]
    fn identity_projection_uses_mobile_as_id() {
        let mut store = IdentityStore::new();
        store.register("Alice", "1112223333", "pw").expect("register");

        let identity = store.authenticate("1112223333", "pw").expect("authenticate").identity();
        assert_eq!(identity.id, "1112223333");
        assert_eq!(identity.name, "Alice");
        assert_eq!(identity.mobile, "1112223333");
    }

    #[test]
    fn account_debug_redacts_secret() {
        let mut store = IdentityStore::new();
        store.register("Alice", "1112223333", "hunter2").expect("register");

        let account = store.authenticate("1112223333", "hunter2").expect("authenticate");
        let debug = format!("{account:?}");
        assert!(!debug.contains("hunter2"), "secret leaked into Debug output: {debug}");
    }
}
