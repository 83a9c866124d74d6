//! Model world - the reference implementation.
//!
//! Applies operations exactly as the relay is specified to behave:
//! signup/login against an account map, presence and chat fan-out to every
//! live session. State is held in `BTreeMap`s so observable state is
//! naturally ordered for comparison.

use std::collections::BTreeMap;

use courier_proto::{
    ServerEvent,
    payloads::{ChatBroadcast, Identity, Presence},
};

use super::operation::Operation;
use crate::FIXED_MILLIS;

/// A registered account in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModelAccount {
    name: String,
    password: String,
}

/// A live session in the model.
#[derive(Debug, Clone, Default)]
struct ModelSession {
    /// Mobile of the attached account, if the session logged in
    attached: Option<String>,
    /// Every event delivered to this session, in order
    inbox: Vec<ServerEvent>,
}

/// Observable state for oracle comparison.
///
/// This is the subset of world state that can be compared against the
/// real implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Mobiles with a registered account, sorted
    pub registered_mobiles: Vec<String>,
    /// Per live session: attached mobile, if any
    pub session_auth: Vec<(u64, Option<String>)>,
    /// Per session ever connected: delivered events in order
    pub inboxes: Vec<(u64, Vec<ServerEvent>)>,
}

/// Reference implementation of the relay.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    accounts: BTreeMap<String, ModelAccount>,
    /// Live sessions only
    sessions: BTreeMap<u64, ModelSession>,
    /// Inboxes survive disconnect so delivered history can be compared
    closed_inboxes: BTreeMap<u64, Vec<ServerEvent>>,
}

impl ModelWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation.
    ///
    /// Operations in the wrong lifecycle state (double connect, request on
    /// a dead connection) are skipped, mirroring the harness runner.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Connect { conn_id } => {
                if !self.sessions.contains_key(conn_id) && !self.closed_inboxes.contains_key(conn_id)
                {
                    self.sessions.insert(*conn_id, ModelSession::default());
                } else if !self.sessions.contains_key(conn_id) {
                    // Reconnect with a previously used ID: resume the inbox
                    // so history lines up with the runner's per-ID inbox.
                    let inbox = self.closed_inboxes.remove(conn_id).unwrap_or_default();
                    self.sessions.insert(*conn_id, ModelSession { attached: None, inbox });
                }
            },

            Operation::Signup { conn_id, name, mobile, password } => {
                if !self.sessions.contains_key(conn_id) {
                    return;
                }
                let event = match self.try_register(name, mobile, password) {
                    Ok(()) => ServerEvent::SignupSuccess,
                    Err(message) => ServerEvent::SignupError { message },
                };
                self.send_to(*conn_id, event);
            },

            Operation::Login { conn_id, mobile, password } => {
                if !self.sessions.contains_key(conn_id) {
                    return;
                }
                match self.try_authenticate(mobile, password) {
                    Ok(identity) => {
                        if let Some(session) = self.sessions.get_mut(conn_id) {
                            session.attached = Some(identity.mobile.clone());
                        }
                        let username = identity.name.clone();
                        self.send_to(*conn_id, ServerEvent::LoginSuccess(identity));
                        self.broadcast(ServerEvent::UserJoined(Presence { username }));
                    },
                    Err(message) => {
                        self.send_to(*conn_id, ServerEvent::LoginError { message });
                    },
                }
            },

            Operation::Chat { conn_id, content, media } => {
                let Some(mobile) =
                    self.sessions.get(conn_id).and_then(|s| s.attached.clone())
                else {
                    return; // silently dropped
                };
                let Some(account) = self.accounts.get(&mobile).cloned() else {
                    return;
                };
                self.broadcast(ServerEvent::ChatMessage(ChatBroadcast {
                    content: content.clone(),
                    media: media.clone(),
                    user_id: mobile,
                    username: account.name,
                    timestamp: FIXED_MILLIS,
                }));
            },

            Operation::Disconnect { conn_id, reason: _ } => {
                let Some(session) = self.sessions.remove(conn_id) else {
                    return;
                };
                self.closed_inboxes.insert(*conn_id, session.inbox);
                if let Some(mobile) = session.attached {
                    if let Some(account) = self.accounts.get(&mobile).cloned() {
                        self.broadcast(ServerEvent::UserLeft(Presence { username: account.name }));
                    }
                }
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let registered_mobiles = self.accounts.keys().cloned().collect();

        let session_auth = self
            .sessions
            .iter()
            .map(|(conn_id, session)| (*conn_id, session.attached.clone()))
            .collect();

        let mut inboxes: Vec<(u64, Vec<ServerEvent>)> = self
            .sessions
            .iter()
            .map(|(conn_id, session)| (*conn_id, session.inbox.clone()))
            .chain(self.closed_inboxes.iter().map(|(id, inbox)| (*id, inbox.clone())))
            .collect();
        inboxes.sort_by_key(|(conn_id, _)| *conn_id);

        ObservableState { registered_mobiles, session_auth, inboxes }
    }

    fn try_register(&mut self, name: &str, mobile: &str, password: &str) -> Result<(), String> {
        if name.is_empty() || mobile.is_empty() || password.is_empty() {
            return Err("all fields are required".to_owned());
        }
        if mobile.len() != 10 || !mobile.bytes().all(|b| b.is_ascii_digit()) {
            return Err("please enter a valid 10-digit mobile number".to_owned());
        }
        if self.accounts.contains_key(mobile) {
            return Err("mobile number already registered".to_owned());
        }
        self.accounts.insert(
            mobile.to_owned(),
            ModelAccount { name: name.to_owned(), password: password.to_owned() },
        );
        Ok(())
    }

    fn try_authenticate(&self, mobile: &str, password: &str) -> Result<Identity, String> {
        if mobile.is_empty() || password.is_empty() {
            return Err("all fields are required".to_owned());
        }
        match self.accounts.get(mobile) {
            Some(account) if account.password == password => Ok(Identity {
                id: mobile.to_owned(),
                name: account.name.clone(),
                mobile: mobile.to_owned(),
            }),
            _ => Err("invalid mobile number or password".to_owned()),
        }
    }

    fn send_to(&mut self, conn_id: u64, event: ServerEvent) {
        if let Some(session) = self.sessions.get_mut(&conn_id) {
            session.inbox.push(event);
        }
    }

    fn broadcast(&mut self, event: ServerEvent) {
        for session in self.sessions.values_mut() {
            session.inbox.push(event.clone());
        }
    }
}
