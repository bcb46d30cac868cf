//! WebTransport server.
//!
//! Each session opens one bidirectional stream carrying length-prefixed
//! bincode messages both ways. Input may also arrive as datagrams.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::game::state::{Character, PlayerId};
use crate::lobby::manager::{LobbyManager, ManagerError, MatchOutcome};
use crate::metrics::Metrics;
use crate::net::framing::{read_client_message, write_encoded, FramingError};
use crate::net::protocol::{decode, sanitize_player_name, ClientMessage, ServerMessage};
use crate::net::tls::TlsConfig;

/// Lobby shared by every connection task
pub type SharedLobby = Arc<RwLock<LobbyManager>>;

/// WebTransport server
pub struct WebTransportServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    lobby: SharedLobby,
    metrics: Arc<Metrics>,
}

impl WebTransportServer {
    pub async fn new(
        config: ServerConfig,
        lobby: SharedLobby,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let tls_config = TlsConfig::load(
            config.tls_cert_path.as_deref(),
            config.tls_key_path.as_deref(),
        )
        .await?;

        Ok(Self {
            config,
            tls_config,
            lobby,
            metrics,
        })
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        self.tls_config.cert_hash()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.bind_address, self.config.port)
    }

    /// Accept sessions until the endpoint fails
    pub async fn run(self) -> anyhow::Result<()> {
        use wtransport::Endpoint;
        use wtransport::ServerConfig;

        let bind_addr = self.bind_addr();
        let server_config = ServerConfig::builder()
            .with_bind_address(bind_addr)
            .with_identity(self.tls_config.identity)
            .build();

        let server = Endpoint::server(server_config)?;
        info!("WebTransport server listening on {}", bind_addr);

        loop {
            let incoming = server.accept().await;
            let lobby = self.lobby.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(incoming, lobby, metrics).await {
                    warn!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Serve one session from handshake to disconnect
async fn handle_connection(
    incoming: wtransport::endpoint::IncomingSession,
    lobby: SharedLobby,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;
    debug!(
        "New session from {:?}, path: {}",
        session_request.authority(),
        session_request.path()
    );

    let connection = session_request.accept().await?;
    let (mut send, mut recv) = connection.accept_bi().await?;

    let player_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    lobby.read().await.clients().register(player_id, tx);
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);
    info!(%player_id, "Client connected");

    // Dropping the receiver marks the player disconnected for matchmaking
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = write_encoded(&mut send, &message).await {
                debug!(%player_id, "Stream write failed: {}", e);
                break;
            }
        }
    });

    // Framed reads are not cancel-safe, so the stream gets its own task
    let (inbound_tx, mut inbound) = mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        loop {
            let result = read_client_message(&mut recv).await;
            let fatal = matches!(&result, Err(e) if !e.is_recoverable());
            if inbound_tx.send(result).is_err() || fatal {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            message = inbound.recv() => {
                match message {
                    Some(Ok(message)) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        dispatch(&lobby, player_id, message).await;
                    }
                    Some(Err(e)) if e.is_recoverable() => {
                        warn!(%player_id, "Dropping malformed message: {}", e);
                        lobby.read().await.clients().send(
                            player_id,
                            ServerMessage::Error { reason: "Malformed message".to_string() },
                        );
                    }
                    Some(Err(FramingError::ConnectionClosed)) | None => break,
                    Some(Err(e)) => {
                        debug!(%player_id, "Stream read failed: {}", e);
                        break;
                    }
                }
            }

            datagram = connection.receive_datagram() => {
                match datagram {
                    Ok(data) => match decode::<ClientMessage>(&data) {
                        Ok(message @ ClientMessage::PlayerInput(_)) => {
                            metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                            dispatch(&lobby, player_id, message).await;
                        }
                        Ok(_) => debug!(%player_id, "Ignoring non-input datagram"),
                        Err(e) => debug!(%player_id, "Failed to decode datagram: {}", e),
                    },
                    Err(e) => {
                        debug!(%player_id, "Datagram receive failed: {}", e);
                        break;
                    }
                }
            }
        }
    }

    lobby.write().await.disconnect(player_id);
    reader.abort();
    writer.abort();
    metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
    info!(%player_id, "Client disconnected");
    Ok(())
}

/// Route one decoded client message into the lobby
pub async fn dispatch(lobby: &SharedLobby, player_id: PlayerId, message: ClientMessage) {
    match message {
        ClientMessage::FindMatch {
            character,
            player_name,
        } => {
            let character = Character::from_name(&character);
            let name = sanitize_player_name(&player_name);
            debug!(%player_id, ?character, %name, "Find match");

            let mut lobby = lobby.write().await;
            match lobby.find_match(player_id, character, name) {
                Ok(MatchOutcome::Queued { position }) => {
                    debug!(%player_id, position, "Waiting for opponent");
                }
                Ok(MatchOutcome::Matched { room_id }) => {
                    debug!(%player_id, %room_id, "Matched");
                }
                Err(e @ ManagerError::NotConnected) => {
                    debug!(%player_id, "Find match from closed connection: {}", e);
                }
                Err(e) => {
                    warn!(%player_id, "Find match failed: {}", e);
                    lobby.clients().send(
                        player_id,
                        ServerMessage::Error {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        ClientMessage::PlayerInput(input) => {
            lobby.read().await.handle_input(player_id, &input);
        }

        ClientMessage::Leave => {
            debug!(%player_id, "Leave requested");
            lobby.write().await.leave(player_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::game_loop::GameLoopConfig;
    use crate::net::client_registry::ClientRegistry;
    use crate::net::protocol::PlayerInput;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn lobby() -> SharedLobby {
        let config = GameLoopConfig {
            initial_sharks: 0,
            seed: Some(11),
            ..Default::default()
        };
        Arc::new(RwLock::new(LobbyManager::new(
            ClientRegistry::new(),
            config,
            4,
            Arc::new(Metrics::new()),
        )))
    }

    async fn connect(lobby: &SharedLobby) -> (PlayerId, UnboundedReceiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        lobby.read().await.clients().register(id, tx);
        (id, rx)
    }

    fn find_match(character: &str, name: &str) -> ClientMessage {
        ClientMessage::FindMatch {
            character: character.to_string(),
            player_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_match_pairs_and_sanitizes() {
        let lobby = lobby();
        let (a, mut rx_a) = connect(&lobby).await;
        let (b, _rx_b) = connect(&lobby).await;

        dispatch(&lobby, a, find_match("penguin", "  <Pingu>  ")).await;
        assert!(rx_a.try_recv().is_err());
        dispatch(&lobby, b, find_match("unknown", "")).await;

        assert!(matches!(
            rx_a.try_recv().unwrap(),
            ServerMessage::MatchFound { player_id, .. } if player_id == a
        ));

        let guard = lobby.read().await;
        let room_id = guard.get_player_room(a).unwrap();
        assert_eq!(guard.get_player_room(b), Some(room_id));

        let room = guard.get_room(room_id).unwrap();
        let room = room.lock();
        let world = room.game_state();
        let pa = world.get_player(a).unwrap();
        assert_eq!(pa.name, "Pingu");
        assert_eq!(pa.character, Character::Penguin);
        assert_eq!(world.get_player(b).unwrap().character, Character::Turtle);
    }

    #[tokio::test]
    async fn test_leave_dequeues() {
        let lobby = lobby();
        let (a, _rx_a) = connect(&lobby).await;

        dispatch(&lobby, a, find_match("turtle", "A")).await;
        assert_eq!(lobby.read().await.queue_len(), 1);

        dispatch(&lobby, a, ClientMessage::Leave).await;
        assert_eq!(lobby.read().await.queue_len(), 0);
        // connection stays registered
        assert!(lobby.read().await.clients().is_connected(a));
    }

    #[tokio::test]
    async fn test_input_without_room_is_ignored() {
        let lobby = lobby();
        let (a, mut rx_a) = connect(&lobby).await;

        dispatch(
            &lobby,
            a,
            ClientMessage::PlayerInput(PlayerInput {
                left: true,
                ..Default::default()
            }),
        )
        .await;
        assert!(rx_a.try_recv().is_err());
    }
}
