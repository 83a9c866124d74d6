//! Chat message payload types.

use serde::{Deserialize, Serialize};

/// Chat message sent by a client.
///
/// Only accepted from authenticated sessions; the server silently drops
/// messages from sessions that have not logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message text
    pub content: String,

    /// Optional media payload (e.g. an encoded image), passed through
    /// opaque to the server.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub media: Option<String>,
}

/// Chat message as fanned out to every connected session.
///
/// The server stamps the sender's identity and a wall-clock timestamp
/// (unix milliseconds) captured at broadcast time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatBroadcast {
    /// Message text, as received
    pub content: String,

    /// Optional media payload, as received
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub media: Option<String>,

    /// Sender's account key (mobile number)
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Sender's display name
    pub username: String,

    /// Server-assigned send time, unix milliseconds
    pub timestamp: u64,
}
