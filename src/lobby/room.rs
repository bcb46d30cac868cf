use std::time::Duration;

use tracing::{debug, info};

use crate::game::constants::matchmaking::PLAYERS_PER_ROOM;
use crate::game::constants::timing::COUNTDOWN;
use crate::game::game_loop::{GameLoop, GameLoopConfig, GameLoopEvent};
use crate::game::state::{Character, PlayerId, World};
use crate::lobby::RoomId;
use crate::net::client_registry::Envelope;
use crate::net::protocol::{GameSnapshot, PlayerInput, ServerMessage};

/// Room state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Collecting players
    Waiting,
    /// Started, simulation not yet running
    Countdown,
    /// Ticking
    Running,
    /// Terminal; never resumes
    Stopped,
}

/// One arena and its lifecycle
pub struct GameRoom {
    pub id: RoomId,
    pub night_mode: bool,
    state: RoomState,
    /// Bumped on stop so stale countdowns cannot start the simulation
    epoch: u64,
    countdown: Duration,
    game_loop: GameLoop,
}

impl GameRoom {
    pub fn new(id: RoomId, night_mode: bool, config: GameLoopConfig) -> Self {
        Self {
            id,
            night_mode,
            state: RoomState::Waiting,
            epoch: 0,
            countdown: COUNTDOWN,
            game_loop: GameLoop::new(config),
        }
    }

    /// Override the countdown announced to clients
    pub fn with_countdown(mut self, countdown: Duration) -> Self {
        self.countdown = countdown;
        self
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.state == RoomState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state == RoomState::Stopped
    }

    pub fn player_count(&self) -> usize {
        self.game_loop.state().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.player_count() == 0
    }

    /// Player ids in a stable order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.game_loop.state().players.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.game_loop.state().players.contains_key(&player_id)
    }

    /// Get game state
    pub fn game_state(&self) -> &World {
        self.game_loop.state()
    }

    pub fn game_state_mut(&mut self) -> &mut World {
        self.game_loop.state_mut()
    }

    pub fn pending_timers(&self) -> usize {
        self.game_loop.pending_timers()
    }

    /// Add a player before the room starts
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        character: Character,
        name: String,
    ) -> Result<(), RoomError> {
        match self.state {
            RoomState::Waiting => {}
            RoomState::Stopped => return Err(RoomError::RoomClosed),
            _ => return Err(RoomError::GameInProgress),
        }
        if self.has_player(player_id) {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.player_count() >= PLAYERS_PER_ROOM {
            return Err(RoomError::RoomFull);
        }

        self.game_loop.add_player(player_id, name, character);
        Ok(())
    }

    /// Remove a player. Returns true when the room is now empty and has been
    /// stopped, i.e. should be destroyed.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        if self.game_loop.remove_player(player_id).is_none() {
            return false;
        }
        if self.is_empty() {
            self.stop();
            return true;
        }
        false
    }

    /// Begin the countdown. The returned envelope announces it to everyone.
    pub fn start(&mut self) -> Result<Envelope, RoomError> {
        match self.state {
            RoomState::Waiting => {}
            RoomState::Stopped => return Err(RoomError::RoomClosed),
            _ => return Err(RoomError::GameInProgress),
        }
        if self.is_empty() {
            return Err(RoomError::NotEnoughPlayers);
        }

        self.state = RoomState::Countdown;
        info!(room_id = %self.id, players = self.player_count(), "Room countdown started");

        Ok(Envelope::to_players(
            self.player_ids(),
            ServerMessage::GameStarted {
                night_mode: self.night_mode,
                countdown_ms: self.countdown.as_millis() as u64,
            },
        ))
    }

    /// Countdown finished. Only succeeds if the room is still in the countdown
    /// that `epoch` was read from.
    pub fn begin_simulation(&mut self, epoch: u64) -> bool {
        if self.state != RoomState::Countdown || epoch != self.epoch {
            debug!(room_id = %self.id, "Stale countdown ignored");
            return false;
        }
        self.state = RoomState::Running;
        self.game_loop.start_escalation();
        info!(room_id = %self.id, "Room simulation running");
        true
    }

    /// Stop for good, invalidating every pending timer
    pub fn stop(&mut self) {
        if self.state == RoomState::Stopped {
            return;
        }
        self.state = RoomState::Stopped;
        self.epoch += 1;
        self.game_loop.cancel_timers();
        info!(
            room_id = %self.id,
            ticks = self.game_loop.tick_count(),
            "Room stopped"
        );
    }

    /// Apply input. Ignored unless running and the player is alive here.
    pub fn apply_input(&mut self, player_id: PlayerId, input: &PlayerInput) -> bool {
        if !self.is_running() {
            return false;
        }
        self.game_loop.apply_input(player_id, input)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.game_loop.snapshot()
    }

    /// One simulation step, translated into outbound messages.
    ///
    /// When every player is dead this emits one final snapshot and stops the
    /// room instead of simulating.
    pub fn tick(&mut self) -> Vec<Envelope> {
        if !self.is_running() || self.is_empty() {
            return Vec::new();
        }

        let recipients = self.player_ids();

        if self.game_loop.state().all_players_dead() {
            let last = Envelope::to_players(recipients, ServerMessage::GameState(self.snapshot()));
            info!(room_id = %self.id, "All players dead");
            self.stop();
            return vec![last];
        }

        let mut envelopes = Vec::new();
        for event in self.game_loop.tick() {
            match event {
                GameLoopEvent::Snapshot(snapshot) => envelopes.push(Envelope::to_players(
                    recipients.iter().copied(),
                    ServerMessage::GameState(snapshot),
                )),
                GameLoopEvent::FishEaten { player_id, score } => {
                    envelopes.push(Envelope::to_player(player_id, ServerMessage::FishEaten { score }))
                }
                GameLoopEvent::SeahorseCollected { player_id, score } => envelopes.push(
                    Envelope::to_player(player_id, ServerMessage::SeahorseCollected { score }),
                ),
                GameLoopEvent::OctopusCollected { player_id, score } => envelopes.push(
                    Envelope::to_player(player_id, ServerMessage::OctopusCollected { score }),
                ),
                GameLoopEvent::PlayerDied { player_id, cause } => {
                    info!(room_id = %self.id, %player_id, ?cause, "Player died");
                }
                GameLoopEvent::SharkSpawned { count } => {
                    debug!(room_id = %self.id, count, "Shark spawned");
                }
                GameLoopEvent::MegaTransitionStarted => {
                    debug!(room_id = %self.id, "Sharks escaping");
                }
                GameLoopEvent::MegaSharkArrived => {
                    info!(room_id = %self.id, "Mega shark arrived");
                }
            }
        }
        envelopes
    }
}

/// Room errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Game already in progress")]
    GameInProgress,
    #[error("Not enough players")]
    NotEnoughPlayers,
    #[error("Player already in room")]
    AlreadyInRoom,
    #[error("Room is closed")]
    RoomClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn quiet_config() -> GameLoopConfig {
        GameLoopConfig {
            initial_sharks: 0,
            initial_jellyfish: 0,
            initial_power_ups: false,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn running_room() -> (GameRoom, PlayerId, PlayerId) {
        let mut room = GameRoom::new(Uuid::new_v4(), false, quiet_config());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        room.add_player(a, Character::Turtle, "A".into()).unwrap();
        room.add_player(b, Character::Crab, "B".into()).unwrap();
        room.start().unwrap();
        let epoch = room.epoch();
        assert!(room.begin_simulation(epoch));
        (room, a, b)
    }

    fn count_snapshots(envelopes: &[Envelope]) -> usize {
        envelopes
            .iter()
            .filter(|e| matches!(e.message, ServerMessage::GameState(_)))
            .count()
    }

    #[test]
    fn test_room_new() {
        let room = GameRoom::new(Uuid::new_v4(), true, quiet_config());
        assert_eq!(room.state(), RoomState::Waiting);
        assert!(room.is_empty());
        assert!(room.night_mode);
    }

    #[test]
    fn test_room_full_and_duplicates() {
        let mut room = GameRoom::new(Uuid::new_v4(), false, quiet_config());
        let a = Uuid::new_v4();
        room.add_player(a, Character::Turtle, "A".into()).unwrap();
        assert!(matches!(
            room.add_player(a, Character::Turtle, "A".into()),
            Err(RoomError::AlreadyInRoom)
        ));
        room.add_player(Uuid::new_v4(), Character::Turtle, "B".into()).unwrap();
        assert!(matches!(
            room.add_player(Uuid::new_v4(), Character::Turtle, "C".into()),
            Err(RoomError::RoomFull)
        ));
    }

    #[test]
    fn test_start_announces_to_all_players() {
        let mut room = GameRoom::new(Uuid::new_v4(), true, quiet_config());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        room.add_player(a, Character::Turtle, "A".into()).unwrap();
        room.add_player(b, Character::Penguin, "B".into()).unwrap();

        let envelope = room.start().unwrap();
        assert_eq!(room.state(), RoomState::Countdown);
        assert_eq!(envelope.recipients.len(), 2);
        assert!(matches!(
            envelope.message,
            ServerMessage::GameStarted { night_mode: true, .. }
        ));
        assert!(matches!(room.start(), Err(RoomError::GameInProgress)));
    }

    #[test]
    fn test_start_requires_players() {
        let mut room = GameRoom::new(Uuid::new_v4(), false, quiet_config());
        assert!(matches!(room.start(), Err(RoomError::NotEnoughPlayers)));
    }

    #[test]
    fn test_tick_noop_before_running() {
        let mut room = GameRoom::new(Uuid::new_v4(), false, quiet_config());
        room.add_player(Uuid::new_v4(), Character::Turtle, "A".into()).unwrap();
        room.start().unwrap();
        for _ in 0..10 {
            assert!(room.tick().is_empty());
        }
    }

    #[test]
    fn test_stop_during_countdown_prevents_simulation() {
        let mut room = GameRoom::new(Uuid::new_v4(), false, quiet_config());
        room.add_player(Uuid::new_v4(), Character::Turtle, "A".into()).unwrap();
        room.start().unwrap();
        let epoch = room.epoch();

        room.stop();

        assert!(!room.begin_simulation(epoch));
        assert!(room.is_stopped());
        assert!(room.tick().is_empty());
    }

    #[test]
    fn test_snapshot_every_third_tick_to_both_players() {
        let (mut room, _, _) = running_room();
        let mut snapshots = 0;
        for _ in 0..30 {
            let envelopes = room.tick();
            for e in &envelopes {
                if matches!(e.message, ServerMessage::GameState(_)) {
                    assert_eq!(e.recipients.len(), 2);
                    snapshots += 1;
                }
            }
        }
        assert_eq!(snapshots, 10);
    }

    #[test]
    fn test_all_dead_emits_one_final_broadcast_then_stops() {
        let (mut room, a, b) = running_room();
        room.tick();
        for id in [a, b] {
            room.game_state_mut().get_player_mut(id).unwrap().kill();
        }

        let last = room.tick();
        assert_eq!(last.len(), 1);
        assert_eq!(count_snapshots(&last), 1);
        match &last[0].message {
            ServerMessage::GameState(s) => assert!(s.players.iter().all(|p| !p.alive)),
            _ => panic!("expected a game state broadcast"),
        }
        assert!(room.is_stopped());
        assert_eq!(room.pending_timers(), 0);

        let ticks_before = room.snapshot().tick;
        for _ in 0..10 {
            assert!(room.tick().is_empty());
        }
        assert_eq!(room.snapshot().tick, ticks_before);
    }

    #[test]
    fn test_remove_last_player_requests_destruction() {
        let (mut room, a, b) = running_room();
        assert!(!room.remove_player(a));
        assert!(!room.remove_player(a));
        assert!(room.is_running());

        assert!(room.remove_player(b));
        assert!(room.is_stopped());
    }

    #[test]
    fn test_input_only_while_running() {
        let mut room = GameRoom::new(Uuid::new_v4(), false, quiet_config());
        let a = Uuid::new_v4();
        room.add_player(a, Character::Turtle, "A".into()).unwrap();
        let input = PlayerInput {
            right: true,
            ..Default::default()
        };

        assert!(!room.apply_input(a, &input));
        room.start().unwrap();
        assert!(!room.apply_input(a, &input));
        let epoch = room.epoch();
        room.begin_simulation(epoch);
        assert!(room.apply_input(a, &input));
        assert!(!room.apply_input(Uuid::new_v4(), &input));
    }

    #[test]
    fn test_fish_eaten_goes_to_eater_only() {
        let (mut room, a, _) = running_room();
        let position = room.game_state().get_player(a).unwrap().position;
        {
            let world = room.game_state_mut();
            world.fish[0].position = position;
            world.fish[0].velocity = crate::util::vec2::Vec2::ZERO;
        }

        let envelopes = room.tick();
        let eaten = envelopes
            .iter()
            .find(|e| matches!(e.message, ServerMessage::FishEaten { .. }))
            .expect("fish eaten notification");
        assert_eq!(eaten.recipients.as_slice(), &[a]);
    }
}
