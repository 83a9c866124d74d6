//! Test harness for the Courier relay core.
//!
//! Provides a deterministic [`Environment`], a reference model of the relay
//! ([`model::ModelWorld`]), and a runner ([`RelayHarness`]) that drives the
//! real [`SessionBroadcaster`] and records what each session would have
//! received. Model-based tests apply the same operation sequence to both
//! and compare observable state.

pub mod model;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

use courier_core::{
    BroadcasterError, Environment, IdentityStore, ServerAction, SessionBroadcaster, SessionEvent,
};
use courier_proto::{
    ClientRequest, ServerEvent,
    payloads::{ChatMessage, Login, Signup},
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::model::{ObservableState, Operation};

/// Fixed wall-clock value used by harness and model alike, so chat
/// timestamps compare equal.
pub const FIXED_MILLIS: u64 = 1_700_000_000_000;

/// Deterministic environment: fixed clock, seeded RNG.
#[derive(Clone)]
pub struct HarnessEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl HarnessEnv {
    /// Create an environment from an RNG seed. Tests should log the seed
    /// so failures reproduce.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for HarnessEnv {
    fn unix_millis(&self) -> u64 {
        FIXED_MILLIS
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        match self.rng.lock() {
            Ok(mut rng) => rng.fill_bytes(buffer),
            // Poisoned lock means a test already panicked; keep going.
            Err(_) => buffer.fill(0),
        }
    }
}

/// Drives the real broadcaster and plays the transport's role: it keeps
/// the set of live connections and delivers each action the way the
/// production server would (private sends to one inbox, broadcasts to all
/// live inboxes).
pub struct RelayHarness {
    broadcaster: SessionBroadcaster<HarnessEnv>,
    connected: BTreeSet<u64>,
    inboxes: BTreeMap<u64, Vec<ServerEvent>>,
}

impl RelayHarness {
    /// Create a harness with a fresh identity store.
    pub fn new(seed: u64) -> Self {
        Self {
            broadcaster: SessionBroadcaster::new(HarnessEnv::with_seed(seed), IdentityStore::new()),
            connected: BTreeSet::new(),
            inboxes: BTreeMap::new(),
        }
    }

    /// The broadcaster under test.
    pub fn broadcaster(&self) -> &SessionBroadcaster<HarnessEnv> {
        &self.broadcaster
    }

    /// Events delivered to a session so far.
    pub fn inbox(&self, conn_id: u64) -> &[ServerEvent] {
        self.inboxes.get(&conn_id).map_or(&[], Vec::as_slice)
    }

    /// Apply one operation.
    ///
    /// Operations referencing a connection in the wrong lifecycle state
    /// (connecting twice, or acting on a connection that is not live) are
    /// skipped; the model skips them under the same rule, so both sides
    /// stay in lockstep.
    ///
    /// # Errors
    ///
    /// Returns an error only if the broadcaster reports a driver-contract
    /// violation, which would be a harness bug.
    pub fn apply(&mut self, op: &Operation) -> Result<(), BroadcasterError> {
        match op {
            Operation::Connect { conn_id } => {
                if self.connected.contains(conn_id) {
                    return Ok(());
                }
                let actions = self
                    .broadcaster
                    .process_event(SessionEvent::ConnectionAccepted { conn_id: *conn_id })?;
                self.connected.insert(*conn_id);
                self.inboxes.entry(*conn_id).or_default();
                self.deliver(actions);
                Ok(())
            },

            Operation::Signup { conn_id, name, mobile, password } => self.request(
                *conn_id,
                ClientRequest::Signup(Signup {
                    name: name.clone(),
                    mobile: mobile.clone(),
                    password: password.clone(),
                }),
            ),

            Operation::Login { conn_id, mobile, password } => self.request(
                *conn_id,
                ClientRequest::Login(Login { mobile: mobile.clone(), password: password.clone() }),
            ),

            Operation::Chat { conn_id, content, media } => self.request(
                *conn_id,
                ClientRequest::ChatMessage(ChatMessage {
                    content: content.clone(),
                    media: media.clone(),
                }),
            ),

            Operation::Disconnect { conn_id, reason } => {
                if !self.connected.remove(conn_id) {
                    return Ok(());
                }
                let actions = self.broadcaster.process_event(SessionEvent::ConnectionClosed {
                    conn_id: *conn_id,
                    reason: reason.clone(),
                })?;
                self.deliver(actions);
                Ok(())
            },
        }
    }

    /// Extract observable state for oracle comparison.
    pub fn observable_state(&self) -> ObservableState {
        let mut registered_mobiles: Vec<String> = Vec::new();
        for mobile in self.known_mobiles() {
            if self.broadcaster.identity_store().contains(&mobile) {
                registered_mobiles.push(mobile);
            }
        }

        let session_auth = self
            .connected
            .iter()
            .map(|conn_id| {
                (*conn_id, self.broadcaster.identity_of(*conn_id).map(|i| i.mobile.clone()))
            })
            .collect();

        let inboxes =
            self.inboxes.iter().map(|(conn_id, events)| (*conn_id, events.clone())).collect();

        ObservableState { registered_mobiles, session_auth, inboxes }
    }

    fn request(&mut self, conn_id: u64, request: ClientRequest) -> Result<(), BroadcasterError> {
        if !self.connected.contains(&conn_id) {
            return Ok(());
        }
        let actions =
            self.broadcaster.process_event(SessionEvent::RequestReceived { conn_id, request })?;
        self.deliver(actions);
        Ok(())
    }

    /// Deliver actions the way the production server's executor does.
    fn deliver(&mut self, actions: Vec<ServerAction>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { conn_id, event } => {
                    if self.connected.contains(&conn_id) {
                        self.inboxes.entry(conn_id).or_default().push(event);
                    }
                },
                ServerAction::Broadcast { event } => {
                    for conn_id in &self.connected {
                        if let Some(inbox) = self.inboxes.get_mut(conn_id) {
                            inbox.push(event.clone());
                        }
                    }
                },
            }
        }
    }

    /// Every mobile number any inbox or account could reference; used to
    /// enumerate the store through its public probe API.
    fn known_mobiles(&self) -> Vec<String> {
        let mut mobiles = BTreeSet::new();
        for events in self.inboxes.values() {
            for event in events {
                if let ServerEvent::LoginSuccess(identity) = event {
                    mobiles.insert(identity.mobile.clone());
                }
            }
        }
        for mobile in model::MOBILE_POOL {
            mobiles.insert((*mobile).to_owned());
        }
        mobiles.into_iter().collect()
    }
}

impl std::fmt::Debug for RelayHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHarness")
            .field("connected", &self.connected)
            .field("broadcaster", &self.broadcaster)
            .finish()
    }
}
