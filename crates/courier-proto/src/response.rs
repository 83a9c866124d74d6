//! Outbound server events.

use serde::{Deserialize, Serialize};

use crate::payloads::{ChatBroadcast, Identity, Presence};

/// Events the relay sends to clients.
///
/// Acknowledgments (`signup success`, `signup error`, `login success`,
/// `login error`) go only to the session that triggered them; presence and
/// chat events are broadcast to every connected session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Private acknowledgment: account created.
    #[serde(rename = "signup success")]
    SignupSuccess,

    /// Private acknowledgment: signup rejected.
    #[serde(rename = "signup error")]
    SignupError {
        /// Human-readable failure description
        message: String,
    },

    /// Private acknowledgment: authenticated, identity attached.
    #[serde(rename = "login success")]
    LoginSuccess(Identity),

    /// Private acknowledgment: login rejected.
    #[serde(rename = "login error")]
    LoginError {
        /// Human-readable failure description
        message: String,
    },

    /// Broadcast: a session authenticated.
    #[serde(rename = "user joined")]
    UserJoined(Presence),

    /// Broadcast: an authenticated session disconnected.
    #[serde(rename = "user left")]
    UserLeft(Presence),

    /// Broadcast: chat message from an authenticated session.
    #[serde(rename = "chat message")]
    ChatMessage(ChatBroadcast),
}
