//! Session broadcaster.
//!
//! Owns the set of live sessions, mediates signup/login against the
//! identity store, and fans out presence and chat events.
//!
//! ## Design
//!
//! - Pure state machine: events go in, [`ServerAction`]s come out, the
//!   caller performs all sends
//! - One event is processed to completion before the next; the caller is
//!   responsible for serializing calls (the production server holds the
//!   broadcaster behind a single mutex)
//! - User-input failures never escape a handler: they become private error
//!   acknowledgments to the originating session only

use std::collections::HashMap;

use courier_proto::{
    ClientRequest, ServerEvent,
    payloads::{ChatBroadcast, ChatMessage, Goodbye, Identity, Login, Presence, Signup},
};

use crate::{env::Environment, identity::IdentityStore};

/// Per-session state.
///
/// A session starts unauthenticated; a successful login attaches an
/// identity. Re-login overwrites the attachment (there is no logout short
/// of disconnect).
#[derive(Debug, Clone, Default)]
struct Session {
    /// Identity attached by the most recent successful login
    attached: Option<Identity>,
}

/// Inbound events dispatched against the broadcaster.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Transport accepted a new connection
    ConnectionAccepted {
        /// Transport-assigned connection ID
        conn_id: u64,
    },

    /// A decoded request arrived on a connection
    RequestReceived {
        /// Originating connection
        conn_id: u64,
        /// The decoded request
        request: ClientRequest,
    },

    /// Transport-level disconnect
    ConnectionClosed {
        /// Connection that closed
        conn_id: u64,
        /// Reason, for logging
        reason: String,
    },
}

/// Actions returned by the broadcaster for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Deliver an event to exactly one session (private acknowledgment)
    SendToSession {
        /// Recipient connection
        conn_id: u64,
        /// Event to deliver
        event: ServerEvent,
    },

    /// Deliver an event to every currently connected session
    Broadcast {
        /// Event to deliver
        event: ServerEvent,
    },
}

/// Errors from broadcaster operations.
///
/// These indicate driver bugs (events referencing sessions that were never
/// accepted), not user mistakes; user-input failures are converted into
/// private error acknowledgments instead.
#[derive(Debug, thiserror::Error)]
pub enum BroadcasterError {
    /// Request event for a connection that was never accepted
    #[error("unknown session: {0}")]
    UnknownSession(u64),
}

/// Live-session registry and event dispatcher.
///
/// Owns the [`IdentityStore`] (injected at construction, single instance
/// per process) and the map of connected sessions.
pub struct SessionBroadcaster<E: Environment> {
    /// Live sessions keyed by connection ID
    sessions: HashMap<u64, Session>,
    /// Account registry
    identities: IdentityStore,
    /// Time source for broadcast timestamps
    env: E,
}

impl<E: Environment> SessionBroadcaster<E> {
    /// Create a broadcaster around an identity store.
    pub fn new(env: E, identities: IdentityStore) -> Self {
        Self { sessions: HashMap::new(), identities, env }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// True if the session exists and has an identity attached.
    pub fn is_authenticated(&self, conn_id: u64) -> bool {
        self.sessions.get(&conn_id).is_some_and(|s| s.attached.is_some())
    }

    /// Identity attached to a session, if any.
    pub fn identity_of(&self, conn_id: u64) -> Option<&Identity> {
        self.sessions.get(&conn_id).and_then(|s| s.attached.as_ref())
    }

    /// The account registry.
    pub fn identity_store(&self) -> &IdentityStore {
        &self.identities
    }

    /// Process one event to completion and return the resulting actions.
    ///
    /// Every user-visible failure path is converted into a private error
    /// acknowledgment action; `Err` is reserved for events that violate the
    /// driver contract (a request on a connection that was never accepted).
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::UnknownSession`] if a request references
    /// an unknown connection.
    pub fn process_event(
        &mut self,
        event: SessionEvent,
    ) -> Result<Vec<ServerAction>, BroadcasterError> {
        match event {
            SessionEvent::ConnectionAccepted { conn_id } => {
                if self.sessions.insert(conn_id, Session::default()).is_some() {
                    tracing::warn!(conn_id, "connection ID reused; previous session replaced");
                } else {
                    tracing::debug!(conn_id, "session connected");
                }
                Ok(Vec::new())
            },

            SessionEvent::RequestReceived { conn_id, request } => {
                if !self.sessions.contains_key(&conn_id) {
                    return Err(BroadcasterError::UnknownSession(conn_id));
                }
                Ok(self.handle_request(conn_id, request))
            },

            SessionEvent::ConnectionClosed { conn_id, reason } => {
                Ok(self.close_session(conn_id, &reason))
            },
        }
    }

    fn handle_request(&mut self, conn_id: u64, request: ClientRequest) -> Vec<ServerAction> {
        match request {
            ClientRequest::Signup(signup) => self.handle_signup(conn_id, &signup),
            ClientRequest::Login(login) => self.handle_login(conn_id, &login),
            ClientRequest::ChatMessage(message) => self.handle_chat_message(conn_id, message),
            ClientRequest::Disconnect(Goodbye { reason }) => self.close_session(conn_id, &reason),
        }
    }

    /// Signup: delegate to the store; success or failure, only the
    /// originating session hears about it. Never attaches an identity.
    fn handle_signup(&mut self, conn_id: u64, signup: &Signup) -> Vec<ServerAction> {
        tracing::debug!(conn_id, mobile = %signup.mobile, "signup attempt");

        let event = match self.identities.register(&signup.name, &signup.mobile, &signup.password)
        {
            Ok(()) => ServerEvent::SignupSuccess,
            Err(err) => {
                tracing::debug!(conn_id, %err, "signup rejected");
                ServerEvent::SignupError { message: err.to_string() }
            },
        };

        vec![ServerAction::SendToSession { conn_id, event }]
    }

    /// Login: authenticate, attach the identity, acknowledge privately,
    /// then announce the join to everyone (the joining session included).
    ///
    /// A second successful login on the same session overwrites the
    /// attachment and announces the join again.
    fn handle_login(&mut self, conn_id: u64, login: &Login) -> Vec<ServerAction> {
        tracing::debug!(conn_id, mobile = %login.mobile, "login attempt");

        let identity = match self.identities.authenticate(&login.mobile, &login.password) {
            Ok(account) => account.identity(),
            Err(err) => {
                tracing::debug!(conn_id, %err, "login rejected");
                return vec![ServerAction::SendToSession {
                    conn_id,
                    event: ServerEvent::LoginError { message: err.to_string() },
                }];
            },
        };

        if let Some(session) = self.sessions.get_mut(&conn_id) {
            session.attached = Some(identity.clone());
        }
        tracing::info!(conn_id, mobile = %identity.mobile, "session authenticated");

        vec![
            ServerAction::SendToSession {
                conn_id,
                event: ServerEvent::LoginSuccess(identity.clone()),
            },
            ServerAction::Broadcast {
                event: ServerEvent::UserJoined(Presence { username: identity.name }),
            },
        ]
    }

    /// Chat: silently dropped unless the session is authenticated;
    /// otherwise stamped with the sender's identity and the current time,
    /// then fanned out to every session.
    fn handle_chat_message(&mut self, conn_id: u64, message: ChatMessage) -> Vec<ServerAction> {
        let Some(identity) = self.identity_of(conn_id) else {
            tracing::debug!(conn_id, "chat message from unauthenticated session dropped");
            return Vec::new();
        };

        let broadcast = ChatBroadcast {
            content: message.content,
            media: message.media,
            user_id: identity.id.clone(),
            username: identity.name.clone(),
            timestamp: self.env.unix_millis(),
        };

        vec![ServerAction::Broadcast { event: ServerEvent::ChatMessage(broadcast) }]
    }

    /// Remove the session, then announce the departure to whoever remains
    /// (only if the session had authenticated). Idempotent: closing an
    /// unknown or already-closed session produces no actions.
    fn close_session(&mut self, conn_id: u64, reason: &str) -> Vec<ServerAction> {
        let Some(session) = self.sessions.remove(&conn_id) else {
            return Vec::new();
        };
        tracing::debug!(conn_id, reason, "session closed");

        match session.attached {
            Some(identity) => vec![ServerAction::Broadcast {
                event: ServerEvent::UserLeft(Presence { username: identity.name }),
            }],
            None => Vec::new(),
        }
    }
}

impl<E: Environment> std::fmt::Debug for SessionBroadcaster<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBroadcaster")
            .field("session_count", &self.sessions.len())
            .field("account_count", &self.identities.len())
            .finish()
    }
}
