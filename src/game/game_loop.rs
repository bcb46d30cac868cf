use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::constants::{
    arena, escalation as escalation_consts, fish as fish_consts, jellyfish as jelly_consts,
    player as player_consts, shark as shark_consts, timing,
};
use crate::game::scheduler::Scheduler;
use crate::game::state::{Character, Difficulty, Player, PlayerId, Side, World};
use crate::game::systems::escalation::{self, EscalationTask};
use crate::game::systems::{fish, ink, jellyfish, octopus, physics, seahorse, shark};
use crate::net::protocol::{unix_millis, GameSnapshot, PlayerInput};
use crate::util::vec2::Vec2;

/// Configuration for one room's simulation
#[derive(Debug, Clone)]
pub struct GameLoopConfig {
    pub width: f32,
    pub height: f32,
    /// Simulation ticks per second
    pub simulation_rate: u32,
    /// Snapshots per second
    pub broadcast_rate: u32,
    pub difficulty: Difficulty,
    pub predators_enabled: bool,
    pub initial_fish: usize,
    pub initial_sharks: usize,
    pub initial_jellyfish: usize,
    /// Start with one seahorse and one octopus in play
    pub initial_power_ups: bool,
    /// Fixed RNG seed (tests and benches)
    pub seed: Option<u64>,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            width: arena::WIDTH,
            height: arena::HEIGHT,
            simulation_rate: timing::SIMULATION_RATE,
            broadcast_rate: timing::BROADCAST_RATE,
            difficulty: Difficulty::default(),
            predators_enabled: true,
            initial_fish: fish_consts::COUNT,
            initial_sharks: shark_consts::INITIAL_COUNT,
            initial_jellyfish: jelly_consts::COUNT,
            initial_power_ups: true,
            seed: None,
        }
    }
}

impl GameLoopConfig {
    /// Ticks between snapshots
    pub fn ticks_per_broadcast(&self) -> u64 {
        (self.simulation_rate / self.broadcast_rate.max(1)).max(1) as u64
    }

    pub fn tick_duration(&self) -> Duration {
        timing::tick_duration(self.simulation_rate)
    }
}

/// What killed a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Shark,
    Jellyfish,
}

/// Events produced by a tick
#[derive(Debug, Clone)]
pub enum GameLoopEvent {
    FishEaten { player_id: PlayerId, score: u32 },
    SeahorseCollected { player_id: PlayerId, score: u32 },
    OctopusCollected { player_id: PlayerId, score: u32 },
    PlayerDied { player_id: PlayerId, cause: DeathCause },
    SharkSpawned { count: usize },
    MegaTransitionStarted,
    MegaSharkArrived,
    /// Broadcast-rate snapshot of the fully updated world
    Snapshot(GameSnapshot),
}

/// Fixed-order simulation of one arena
pub struct GameLoop {
    config: GameLoopConfig,
    world: World,
    scheduler: Scheduler<EscalationTask>,
    rng: StdRng,
    tick: u64,
    tick_duration: Duration,
}

impl GameLoop {
    pub fn new(config: GameLoopConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut world = World::new(config.width, config.height);

        fish::populate(&mut world, &mut rng, config.initial_fish);
        jellyfish::populate(&mut world, &mut rng, config.difficulty, config.initial_jellyfish);

        if config.predators_enabled {
            for i in 0..config.initial_sharks {
                let side = Side::ALL[i % Side::ALL.len()];
                let s = shark::spawn(&mut world, &mut rng, side, config.difficulty);
                world.sharks.push(s);
            }
        }

        if config.initial_power_ups {
            let s = seahorse::spawn(&mut world, &mut rng);
            world.seahorses.push(s);
            let o = octopus::spawn(&mut world, &mut rng);
            world.octopuses.push(o);
        }

        let tick_duration = config.tick_duration();
        Self {
            config,
            world,
            scheduler: Scheduler::new(),
            rng,
            tick: 0,
            tick_duration,
        }
    }

    pub fn config(&self) -> &GameLoopConfig {
        &self.config
    }

    /// Get current world state
    pub fn state(&self) -> &World {
        &self.world
    }

    pub fn state_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Timers still armed
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Add a player at a random spot away from the edges
    pub fn add_player(&mut self, id: PlayerId, name: String, character: Character) {
        let margin = player_consts::SPAWN_MARGIN
            .min(self.world.width / 2.0 - 1.0)
            .min(self.world.height / 2.0 - 1.0)
            .max(0.0);
        let position = Vec2::new(
            self.rng.gen_range(margin..=self.world.width - margin),
            self.rng.gen_range(margin..=self.world.height - margin),
        );
        self.world.add_player(Player::new(id, name, character, position));
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.world.remove_player(id)
    }

    /// Apply one input frame. Returns false if ignored.
    pub fn apply_input(&mut self, id: PlayerId, input: &PlayerInput) -> bool {
        physics::apply_input(&mut self.world, id, input)
    }

    /// Arm the repeating escalation timer
    pub fn start_escalation(&mut self) {
        if self.config.predators_enabled {
            self.scheduler
                .schedule_repeating(escalation_consts::INTERVAL, EscalationTask::Escalate);
        }
    }

    /// Invalidate every pending spawn and transition
    pub fn cancel_timers(&mut self) {
        self.scheduler.cancel_all();
    }

    /// Run one simulation step
    pub fn tick(&mut self) -> Vec<GameLoopEvent> {
        self.tick += 1;
        let mut events = Vec::new();
        let difficulty = self.config.difficulty;

        physics::update(&mut self.world);
        fish::update(&mut self.world, &mut self.rng, &mut events);
        if self.config.predators_enabled {
            shark::update(&mut self.world, &mut self.rng, &mut events);
        }
        jellyfish::update(&mut self.world, &mut self.rng, difficulty, &mut events);
        seahorse::update(&mut self.world, &mut self.rng, &mut events);
        octopus::update(&mut self.world, &mut self.rng, &mut events);
        ink::update(&mut self.world);
        self.run_escalation(&mut events);
        escalation::decay_warnings(&mut self.world);

        if self.tick % self.config.ticks_per_broadcast() == 0 {
            events.push(GameLoopEvent::Snapshot(self.snapshot()));
        }

        events
    }

    fn run_escalation(&mut self, events: &mut Vec<GameLoopEvent>) {
        let due = self.scheduler.advance(self.tick_duration);
        if self.world.players.is_empty() || !self.config.predators_enabled {
            return;
        }

        let difficulty = self.config.difficulty;
        for task in due {
            match task {
                EscalationTask::Escalate => escalation::escalate(
                    &mut self.world,
                    &mut self.scheduler,
                    &mut self.rng,
                    difficulty,
                ),
                EscalationTask::SpawnShark { side } => escalation::spawn_shark(
                    &mut self.world,
                    &mut self.scheduler,
                    &mut self.rng,
                    side,
                    difficulty,
                    events,
                ),
                EscalationTask::CompleteMegaTransition => escalation::complete_mega_transition(
                    &mut self.world,
                    &mut self.rng,
                    difficulty,
                    events,
                ),
            }
        }
    }

    /// Current state as a wire snapshot
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from_world(&self.world, self.tick, unix_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::fish::COUNT as FISH_COUNT;
    use uuid::Uuid;

    fn quiet_config() -> GameLoopConfig {
        GameLoopConfig {
            initial_sharks: 0,
            initial_jellyfish: 0,
            initial_power_ups: false,
            seed: Some(42),
            ..Default::default()
        }
    }

    fn ticks_for(duration: Duration, config: &GameLoopConfig) -> u64 {
        (duration.as_secs_f64() * config.simulation_rate as f64).ceil() as u64 + 1
    }

    #[test]
    fn test_new_populates_world() {
        let game = GameLoop::new(GameLoopConfig {
            seed: Some(1),
            ..Default::default()
        });
        let world = game.state();
        assert_eq!(world.fish.len(), FISH_COUNT);
        assert_eq!(world.sharks.len(), shark_consts::INITIAL_COUNT);
        assert_eq!(world.jellyfish.len(), jelly_consts::COUNT);
        assert_eq!(world.seahorses.len(), 1);
        assert_eq!(world.octopuses.len(), 1);
    }

    #[test]
    fn test_predators_disabled_spawns_no_sharks() {
        let mut game = GameLoop::new(GameLoopConfig {
            predators_enabled: false,
            seed: Some(1),
            ..Default::default()
        });
        game.add_player(Uuid::new_v4(), "A".into(), Character::Turtle);
        game.start_escalation();
        assert_eq!(game.pending_timers(), 0);

        for _ in 0..ticks_for(escalation_consts::INTERVAL * 2, game.config()) {
            game.tick();
        }
        assert!(game.state().sharks.is_empty());
    }

    #[test]
    fn test_snapshot_every_third_tick() {
        let mut game = GameLoop::new(quiet_config());
        game.add_player(Uuid::new_v4(), "A".into(), Character::Turtle);

        let mut snapshot_ticks = Vec::new();
        for _ in 0..9 {
            let events = game.tick();
            if let Some(GameLoopEvent::Snapshot(s)) = events
                .iter()
                .find(|e| matches!(e, GameLoopEvent::Snapshot(_)))
            {
                snapshot_ticks.push(s.tick);
                assert!(s.server_time > 0);
            }
        }
        assert_eq!(snapshot_ticks, vec![3, 6, 9]);
    }

    #[test]
    fn test_escalation_spawns_shark_after_interval_and_delay() {
        let mut game = GameLoop::new(quiet_config());
        game.add_player(Uuid::new_v4(), "A".into(), Character::Turtle);
        game.start_escalation();

        for _ in 0..ticks_for(escalation_consts::INTERVAL, game.config()) {
            game.tick();
        }
        assert!(game.state().sharks.is_empty());
        assert!(!game.state().warnings.is_empty());

        let mut spawned = false;
        for _ in 0..ticks_for(escalation_consts::SPAWN_DELAY, game.config()) {
            spawned |= game
                .tick()
                .iter()
                .any(|e| matches!(e, GameLoopEvent::SharkSpawned { count: 1 }));
        }
        assert!(spawned);
        assert_eq!(game.state().sharks.len(), 1);
    }

    #[test]
    fn test_cancel_timers_stops_pending_spawn() {
        let mut game = GameLoop::new(quiet_config());
        game.add_player(Uuid::new_v4(), "A".into(), Character::Turtle);
        game.start_escalation();

        for _ in 0..ticks_for(escalation_consts::INTERVAL, game.config()) {
            game.tick();
        }
        assert!(game.pending_timers() >= 2);

        game.cancel_timers();
        assert_eq!(game.pending_timers(), 0);
        for _ in 0..ticks_for(escalation_consts::INTERVAL * 2, game.config()) {
            game.tick();
        }
        assert!(game.state().sharks.is_empty());
    }

    #[test]
    fn test_add_player_spawns_inside_margin() {
        let mut game = GameLoop::new(quiet_config());
        let id = Uuid::new_v4();
        game.add_player(id, "A".into(), Character::Crab);
        let p = game.state().get_player(id).unwrap();
        assert!(p.position.x >= player_consts::SPAWN_MARGIN);
        assert!(p.position.x <= game.state().width - player_consts::SPAWN_MARGIN);
        assert_eq!(p.character, Character::Crab);
    }

    #[test]
    fn test_fish_population_constant_across_ticks() {
        let mut game = GameLoop::new(quiet_config());
        let id = Uuid::new_v4();
        game.add_player(id, "A".into(), Character::Turtle);
        let input = PlayerInput {
            right: true,
            down: true,
            ..Default::default()
        };

        for _ in 0..600 {
            game.apply_input(id, &input);
            game.tick();
            assert_eq!(game.state().fish.len(), FISH_COUNT);
        }
    }

    #[test]
    fn test_seeded_loops_are_deterministic() {
        let run = || {
            let mut game = GameLoop::new(GameLoopConfig {
                seed: Some(99),
                ..Default::default()
            });
            let id = Uuid::from_u128(1);
            game.add_player(id, "A".into(), Character::Turtle);
            for _ in 0..120 {
                game.tick();
            }
            game.state().get_player(id).map(|p| p.position)
        };
        assert_eq!(run(), run());
    }
}
