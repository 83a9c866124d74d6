//! Inbound request events.

use serde::{Deserialize, Serialize};

use crate::payloads::{ChatMessage, Goodbye, Login, Signup};

/// Events a client can send to the relay.
///
/// Tag strings match the transport-level event names; each variant carries
/// a fixed, typed payload so malformed events fail at decode time instead
/// of inside a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientRequest {
    /// Register a new account.
    #[serde(rename = "signup")]
    Signup(Signup),

    /// Authenticate and attach an identity to this session.
    #[serde(rename = "login")]
    Login(Login),

    /// Broadcast a chat message to all connected sessions.
    #[serde(rename = "chat message")]
    ChatMessage(ChatMessage),

    /// Close this session gracefully.
    #[serde(rename = "disconnect")]
    Disconnect(Goodbye),
}
