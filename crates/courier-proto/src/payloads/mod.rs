//! Payload types for client requests and server events.

mod auth;
mod chat;
mod session;

pub use auth::{Identity, Login, Signup};
pub use chat::{ChatBroadcast, ChatMessage};
pub use session::{Goodbye, Presence};
