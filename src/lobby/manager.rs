use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::constants::matchmaking::{NIGHT_MODE_CHANCE, PLAYERS_PER_ROOM};
use crate::game::constants::timing::COUNTDOWN;
use crate::game::game_loop::GameLoopConfig;
use crate::game::state::{Character, PlayerId};
use crate::lobby::matchmaker::Matchmaker;
use crate::lobby::player::LobbyPlayer;
use crate::lobby::room::{GameRoom, RoomError};
use crate::lobby::RoomId;
use crate::metrics::Metrics;
use crate::net::client_registry::{ClientRegistry, Envelope};
use crate::net::protocol::{PlayerInput, ServerMessage};

/// Room state shared between the manager and the room's driver task
pub type SharedRoom = Arc<Mutex<GameRoom>>;

struct RoomHandle {
    room: SharedRoom,
    driver: JoinHandle<()>,
}

/// Result of a matchmaking request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Waiting at this 1-based queue position
    Queued { position: usize },
    /// Paired and placed in a room
    Matched { room_id: RoomId },
}

/// Process-wide owner of the queue, the room registry and player assignment
pub struct LobbyManager {
    rooms: HashMap<RoomId, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomId>,
    matchmaker: Matchmaker,
    clients: ClientRegistry,
    loop_config: GameLoopConfig,
    countdown: Duration,
    max_rooms: usize,
    metrics: Arc<Metrics>,
    /// Drivers report rooms whose game ended on their own
    finished_tx: UnboundedSender<RoomId>,
    finished_rx: UnboundedReceiver<RoomId>,
}

impl LobbyManager {
    pub fn new(
        clients: ClientRegistry,
        loop_config: GameLoopConfig,
        max_rooms: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            matchmaker: Matchmaker::new(),
            clients,
            loop_config,
            countdown: COUNTDOWN,
            max_rooms,
            metrics,
            finished_tx,
            finished_rx,
        }
    }

    /// Override the pre-game countdown
    pub fn with_countdown(mut self, countdown: Duration) -> Self {
        self.countdown = countdown;
        self
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Queue a player and pair the queue head if possible
    pub fn find_match(
        &mut self,
        player_id: PlayerId,
        character: Character,
        name: String,
    ) -> Result<MatchOutcome, ManagerError> {
        if !self.clients.is_connected(player_id) {
            return Err(ManagerError::NotConnected);
        }

        // a new request abandons whatever room the player was in
        self.leave_room(player_id);

        let night_mode = rand::thread_rng().gen_bool(NIGHT_MODE_CHANCE);
        let position = self
            .matchmaker
            .enqueue(LobbyPlayer::new(player_id, name, character, night_mode));
        debug!(%player_id, position, "Player queued");

        self.pair_waiting();
        self.update_gauges();

        Ok(match self.player_rooms.get(&player_id) {
            Some(&room_id) => MatchOutcome::Matched { room_id },
            None => MatchOutcome::Queued {
                position: self.matchmaker.position(player_id).unwrap_or(position),
            },
        })
    }

    /// Forward input to the sender's room. Stale input is dropped silently.
    pub fn handle_input(&self, player_id: PlayerId, input: &PlayerInput) -> bool {
        let Some(room_id) = self.player_rooms.get(&player_id) else {
            return false;
        };
        match self.rooms.get(room_id) {
            Some(handle) => handle.room.lock().apply_input(player_id, input),
            None => false,
        }
    }

    /// Leave the queue and any room, keeping the connection registered
    pub fn leave(&mut self, player_id: PlayerId) {
        self.matchmaker.remove(player_id);
        self.leave_room(player_id);
        self.update_gauges();
    }

    /// Connection closed
    pub fn disconnect(&mut self, player_id: PlayerId) {
        if self.matchmaker.remove(player_id).is_some() {
            debug!(%player_id, "Removed disconnected player from queue");
        }
        self.leave_room(player_id);
        self.clients.unregister(player_id);
        self.update_gauges();
    }

    /// Get player's current room
    pub fn get_player_room(&self, player_id: PlayerId) -> Option<RoomId> {
        self.player_rooms.get(&player_id).copied()
    }

    /// Get a room by ID
    pub fn get_room(&self, room_id: RoomId) -> Option<SharedRoom> {
        self.rooms.get(&room_id).map(|h| h.room.clone())
    }

    /// Get room count
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn queue_len(&self) -> usize {
        self.matchmaker.len()
    }

    pub fn queue_position(&self, player_id: PlayerId) -> Option<usize> {
        self.matchmaker.position(player_id)
    }

    /// Destroy rooms whose game ended since the last call, then hand the
    /// freed capacity to waiting pairs. Returns the number of rooms removed.
    pub fn reap_finished_rooms(&mut self) -> usize {
        let mut reaped = 0;
        while let Ok(room_id) = self.finished_rx.try_recv() {
            if self.remove_room(room_id) {
                reaped += 1;
            }
        }
        if reaped > 0 {
            self.pair_waiting();
            self.update_gauges();
        }
        reaped
    }

    /// Stop every room, wait for the drivers to wind down, drop all state
    pub async fn shutdown_all_rooms(&mut self) {
        let count = self.rooms.len();
        let handles: Vec<RoomHandle> = self.rooms.drain().map(|(_, h)| h).collect();
        for handle in &handles {
            handle.room.lock().stop();
            handle.driver.abort();
        }
        for handle in handles {
            // cancelled drivers resolve to a JoinError; nothing to report
            let _ = handle.driver.await;
        }

        while self.finished_rx.try_recv().is_ok() {}
        self.player_rooms.clear();
        self.matchmaker.clear();
        self.update_gauges();
        info!(rooms = count, "All rooms shut down");
    }

    /// Create rooms while pairs and capacity are available
    fn pair_waiting(&mut self) -> usize {
        while let Ok(room_id) = self.finished_rx.try_recv() {
            self.remove_room(room_id);
        }

        let mut created = 0;
        while self.rooms.len() < self.max_rooms {
            let clients = self.clients.clone();
            let Some((first, second)) = self.matchmaker.next_pair(|id| clients.is_connected(id)) else {
                break;
            };
            if self.create_room(first, second).is_some() {
                created += 1;
            }
        }

        if self.rooms.len() >= self.max_rooms && self.matchmaker.len() >= PLAYERS_PER_ROOM {
            warn!(
                rooms = self.rooms.len(),
                waiting = self.matchmaker.len(),
                "Room limit reached, players left waiting"
            );
        }
        created
    }

    fn create_room(&mut self, first: LobbyPlayer, second: LobbyPlayer) -> Option<RoomId> {
        let room_id = Uuid::new_v4();
        let night_mode = first.night_mode;

        let mut added = Vec::with_capacity(PLAYERS_PER_ROOM);
        for player in [first, second] {
            if self.clients.is_connected(player.id) {
                added.push(player);
            } else {
                debug!(player_id = %player.id, "Player vanished before room creation");
            }
        }
        if added.len() != PLAYERS_PER_ROOM {
            debug!(%room_id, "Discarding incomplete room");
            self.matchmaker.requeue_front(added);
            return None;
        }

        let (room, announce) = match self.open_room(room_id, night_mode, &added) {
            Ok(opened) => opened,
            Err(e) => {
                warn!(%room_id, "Failed to open room: {}", e);
                self.matchmaker.requeue_front(added);
                return None;
            }
        };

        for player in &added {
            self.player_rooms.insert(player.id, room_id);
            self.clients.send(
                player.id,
                ServerMessage::MatchFound {
                    room_id,
                    player_id: player.id,
                    night_mode,
                },
            );
        }
        self.clients.deliver(&announce);

        let room = Arc::new(Mutex::new(room));
        let driver = spawn_room_driver(
            room.clone(),
            self.clients.clone(),
            self.metrics.clone(),
            self.finished_tx.clone(),
            self.countdown,
            self.loop_config.tick_duration(),
        );
        self.rooms.insert(room_id, RoomHandle { room, driver });
        self.metrics.rooms_created.fetch_add(1, Ordering::Relaxed);

        info!(
            %room_id,
            player_a = %added[0].id,
            player_b = %added[1].id,
            night_mode,
            waited_ms = added[0].wait_time().as_millis() as u64,
            "Match found"
        );
        Some(room_id)
    }

    /// Build a room for a connected pair and start its countdown
    fn open_room(
        &self,
        room_id: RoomId,
        night_mode: bool,
        players: &[LobbyPlayer],
    ) -> Result<(GameRoom, Envelope), ManagerError> {
        let mut room = GameRoom::new(room_id, night_mode, self.loop_config.clone())
            .with_countdown(self.countdown);
        for player in players {
            room.add_player(player.id, player.character, player.name.clone())?;
        }
        let announce = room.start()?;
        Ok((room, announce))
    }

    /// Remove a player from their room, notifying whoever remains.
    /// Returns true if the player was in a room.
    fn leave_room(&mut self, player_id: PlayerId) -> bool {
        let Some(room_id) = self.player_rooms.remove(&player_id) else {
            return false;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            return false;
        };

        let (destroy, remaining) = {
            let mut room = handle.room.lock();
            let destroy = room.remove_player(player_id);
            (destroy, room.player_ids())
        };

        if !remaining.is_empty() {
            let count = remaining.len() as u32;
            self.clients.deliver(&Envelope::to_players(
                remaining,
                ServerMessage::PlayerLeft {
                    player_id,
                    player_count: count,
                },
            ));
        }
        info!(%room_id, %player_id, "Player left room");

        if destroy {
            self.destroy_room(room_id);
        }
        true
    }

    fn destroy_room(&mut self, room_id: RoomId) {
        if self.remove_room(room_id) {
            // capacity freed
            self.pair_waiting();
        }
    }

    /// Stop and unregister a room without pairing anyone into the freed slot
    fn remove_room(&mut self, room_id: RoomId) -> bool {
        let Some(handle) = self.rooms.remove(&room_id) else {
            return false;
        };
        handle.room.lock().stop();
        handle.driver.abort();
        self.player_rooms.retain(|_, r| *r != room_id);
        info!(%room_id, "Room destroyed");
        true
    }

    fn update_gauges(&self) {
        self.metrics
            .rooms_active
            .store(self.rooms.len() as u64, Ordering::Relaxed);
        self.metrics
            .players_queued
            .store(self.matchmaker.len() as u64, Ordering::Relaxed);
        self.metrics
            .players_in_game
            .store(self.player_rooms.len() as u64, Ordering::Relaxed);
    }
}

/// Countdown, then tick at a fixed rate until the room stops.
/// Aborting the task cancels both phases. A room that stops itself is
/// reported on `finished` so the manager can free its slot.
fn spawn_room_driver(
    room: SharedRoom,
    clients: ClientRegistry,
    metrics: Arc<Metrics>,
    finished: UnboundedSender<RoomId>,
    countdown: Duration,
    tick_duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let epoch = room.lock().epoch();
        tokio::time::sleep(countdown).await;
        if !room.lock().begin_simulation(epoch) {
            return;
        }

        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let started = Instant::now();
            let (envelopes, running) = {
                let mut guard = room.lock();
                let envelopes = guard.tick();
                (envelopes, guard.is_running())
            };
            metrics.record_tick_time(started.elapsed());

            for envelope in &envelopes {
                let delivered = clients.deliver(envelope);
                metrics
                    .messages_sent
                    .fetch_add(delivered as u64, Ordering::Relaxed);
                if matches!(envelope.message, ServerMessage::GameState(_)) {
                    metrics.snapshots_sent.fetch_add(1, Ordering::Relaxed);
                }
            }

            if !running {
                break;
            }
        }

        let room_id = room.lock().id;
        // receiver only goes away with the manager
        let _ = finished.send(room_id);
    })
}

/// Manager errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ManagerError {
    #[error("Player is not connected")]
    NotConnected,
    #[error("Room error: {0}")]
    RoomError(#[from] RoomError),
}
