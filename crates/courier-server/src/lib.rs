//! Courier production server.
//!
//! This crate provides the production relay implementation using:
//! - Quinn for QUIC transport
//! - Tokio for async runtime
//! - System time and cryptographic RNG
//!
//! ## Architecture
//!
//! ```text
//! courier-server
//!   ├─ SystemEnv            (production Environment impl)
//!   ├─ QuinnTransport       (QUIC via Quinn)
//!   ├─ SessionBroadcaster   (sans-IO event dispatcher, courier-core)
//!   ├─ IdentityStore        (account registry, courier-core)
//!   └─ ConnectionRegistry   (conn_id -> transport handle for fan-out)
//! ```
//!
//! The broadcaster and the registry live behind one `tokio::sync::Mutex`:
//! every inbound event - from any connection - is processed to completion,
//! fan-out included, before the next one starts. That single point of
//! serialization is what gives signup/login/chat their ordering guarantees.

mod error;
mod registry;
mod system_env;
mod transport;

use std::sync::Arc;

use bytes::BytesMut;
use courier_core::{
    Environment, IdentityStore, ServerAction, SessionBroadcaster, SessionEvent,
};
use courier_proto::{ClientRequest, FrameHeader, FrameKind, HEADER_LEN, ServerEvent, codec};
pub use error::ServerError;
pub use registry::ConnectionRegistry;
pub use system_env::SystemEnv;
pub use transport::{QuinnConnection, QuinnTransport};

/// Limits applied by the connection driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent connections; further connections are refused
    pub max_connections: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Driver limits
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            cert_path: None,
            key_path: None,
            driver: DriverConfig::default(),
        }
    }
}

/// Broadcaster plus fan-out registry, guarded together.
///
/// Keeping both under the same mutex means the registry can never disagree
/// with the broadcaster's live-session set mid-event.
struct Shared {
    broadcaster: SessionBroadcaster<SystemEnv>,
    registry: ConnectionRegistry,
}

type SharedDriver = Arc<tokio::sync::Mutex<Shared>>;

/// Production Courier relay server.
pub struct Server {
    shared: SharedDriver,
    transport: QuinnTransport,
    env: SystemEnv,
    config: DriverConfig,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// The identity store is constructed here, once, and owned by the
    /// broadcaster for the process lifetime.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Binding to the address fails
    /// - TLS configuration is invalid
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let broadcaster = SessionBroadcaster::new(env.clone(), IdentityStore::new());

        let transport = QuinnTransport::bind(
            &config.bind_address,
            config.cert_path.as_deref(),
            config.key_path.as_deref(),
        )?;

        Ok(Self {
            shared: Arc::new(tokio::sync::Mutex::new(Shared {
                broadcaster,
                registry: ConnectionRegistry::new(),
            })),
            transport,
            env,
            config: config.driver,
        })
    }

    /// Run the server, accepting connections and processing events.
    ///
    /// This method runs until the process is shut down. Per-connection
    /// failures are logged and never propagate.
    ///
    /// # Errors
    ///
    /// Returns error only if the endpoint itself becomes unusable.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server listening on {}", self.transport.local_addr()?);

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let at_capacity = {
                        let shared = self.shared.lock().await;
                        shared.registry.len() >= self.config.max_connections
                    };
                    if at_capacity {
                        tracing::warn!(
                            remote = %conn.remote_address(),
                            "connection refused: at max_connections"
                        );
                        conn.close("server full");
                        continue;
                    }

                    let shared = Arc::clone(&self.shared);
                    let env = self.env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, shared, env).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single QUIC connection.
async fn handle_connection(
    conn: QuinnConnection,
    shared: SharedDriver,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let conn_id = env.random_u64();
    tracing::debug!(conn_id, remote = %conn.remote_address(), "new connection");

    {
        let mut shared = shared.lock().await;
        shared.registry.insert(conn_id, conn.clone());
        let actions =
            shared.broadcaster.process_event(SessionEvent::ConnectionAccepted { conn_id })?;
        execute_actions(&shared.registry, actions).await;
    }

    loop {
        match conn.accept_bi().await {
            Ok((send, recv)) => {
                let shared = Arc::clone(&shared);
                let conn = conn.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_stream(conn_id, send, recv, shared, &conn).await {
                        tracing::warn!(conn_id, "stream error: {}", e);
                    }
                });
            },
            Err(e) => {
                tracing::debug!(conn_id, "connection closed: {}", e);
                break;
            },
        }
    }

    {
        let mut shared = shared.lock().await;
        shared.registry.remove(conn_id);
        match shared.broadcaster.process_event(SessionEvent::ConnectionClosed {
            conn_id,
            reason: "connection closed".to_string(),
        }) {
            Ok(actions) => execute_actions(&shared.registry, actions).await,
            Err(e) => tracing::warn!(conn_id, "close event rejected: {}", e),
        }
    }

    Ok(())
}

/// Handle a single bidirectional stream carrying request frames.
async fn handle_stream(
    conn_id: u64,
    send: quinn::SendStream,
    mut recv: quinn::RecvStream,
    shared: SharedDriver,
    conn: &QuinnConnection,
) -> Result<(), ServerError> {
    drop(send); // events are pushed on uni streams, not echoed here

    loop {
        let mut header_buf = [0u8; HEADER_LEN];
        match recv.read_exact(&mut header_buf).await {
            Ok(()) => {},
            Err(e) => {
                tracing::debug!(conn_id, "read error: {}", e);
                break;
            },
        }

        // Malformed frames end this stream only; the connection and its
        // other streams are unaffected.
        let header = FrameHeader::parse(&header_buf)?;
        if header.kind()? != FrameKind::Request {
            return Err(ServerError::Protocol("client sent a non-request frame".to_owned()));
        }
        let payload_len = header.payload_len();

        let mut payload = BytesMut::zeroed(payload_len);
        if payload_len > 0 {
            if let Err(e) = recv.read_exact(&mut payload).await {
                tracing::debug!(conn_id, "payload read error: {}", e);
                break;
            }
        }

        let request = codec::decode_request_payload(&payload)?;

        let disconnecting = matches!(request, ClientRequest::Disconnect(_));

        {
            let mut shared = shared.lock().await;
            let actions = match shared
                .broadcaster
                .process_event(SessionEvent::RequestReceived { conn_id, request })
            {
                Ok(actions) => actions,
                Err(e) => {
                    tracing::warn!(conn_id, "event processing error: {}", e);
                    continue;
                },
            };

            // A graceful disconnect removes the session inside the
            // broadcaster; drop the transport handle before fan-out so the
            // departing client does not receive its own leave event.
            if disconnecting {
                shared.registry.remove(conn_id);
            }

            execute_actions(&shared.registry, actions).await;
        }

        if disconnecting {
            conn.close("client disconnect");
            break;
        }
    }

    Ok(())
}

/// Execute broadcaster actions against the live connections.
///
/// Sends are fire-and-forget per recipient: a failure to reach one peer is
/// logged and never affects the others or the event's originator.
async fn execute_actions(registry: &ConnectionRegistry, actions: Vec<ServerAction>) {
    for action in actions {
        match action {
            ServerAction::SendToSession { conn_id, event } => {
                let Some(conn) = registry.get(conn_id) else {
                    tracing::debug!(conn_id, "private event dropped: connection gone");
                    continue;
                };
                push_event(conn_id, conn, &event).await;
            },

            ServerAction::Broadcast { event } => {
                for (conn_id, conn) in registry.iter() {
                    push_event(conn_id, conn, &event).await;
                }
            },
        }
    }
}

/// Push one event to one connection on a fresh unidirectional stream.
async fn push_event(conn_id: u64, conn: &QuinnConnection, event: &ServerEvent) {
    let frame = match codec::encode_event(event) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("event encode failed: {}", e);
            return;
        },
    };

    match conn.open_uni().await {
        Ok(mut send) => {
            if let Err(e) = send.write_all(&frame).await {
                tracing::debug!(conn_id, "event send failed: {}", e);
            }
            let _ = send.finish();
        },
        Err(e) => {
            tracing::debug!(conn_id, "could not open event stream: {}", e);
        },
    }
}
