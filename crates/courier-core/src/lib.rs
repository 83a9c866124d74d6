//! Courier relay core.
//!
//! Transport-independent state machines for the chat relay:
//!
//! - [`IdentityStore`] - the in-memory account registry
//! - [`SessionBroadcaster`] - live sessions, login mediation, and fan-out
//!
//! Both are pure state machines: events go in, actions come out, and the
//! caller performs all I/O. Time and randomness are reached only through
//! the [`Environment`] trait, so tests can drive everything
//! deterministically.

pub mod env;

mod broadcaster;
mod identity;

pub use broadcaster::{BroadcasterError, ServerAction, SessionBroadcaster, SessionEvent};
pub use env::Environment;
pub use identity::{Account, IdentityError, IdentityStore};
