//! Entity models for one arena.
//!
//! Plain data records; behaviour lives in `game::systems`. A `World` is owned by
//! exactly one room and nothing in it is shared across rooms.

use hashbrown::HashMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{arena, ink, player, warning};
use crate::util::vec2::Vec2;

/// Unique player identifier (one per connection)
pub type PlayerId = Uuid;

/// Identifier for non-player entities, unique within a room
pub type EntityId = u64;

/// Character archetype picked in the lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Character {
    #[default]
    Turtle,
    Penguin,
    Crab,
}

impl Character {
    /// Parse a lobby selection, falling back to the turtle for unknown names
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "penguin" => Character::Penguin,
            "crab" => Character::Crab,
            _ => Character::Turtle,
        }
    }

    /// Sprite size in arena units
    pub fn size(&self) -> f32 {
        match self {
            Character::Turtle => 50.0,
            Character::Penguin => 44.0,
            Character::Crab => 42.0,
        }
    }

    /// Speed cap applied after every input frame
    pub fn max_speed(&self) -> f32 {
        match self {
            Character::Turtle => 6.0,
            Character::Penguin => 8.0,
            Character::Crab => 5.5,
        }
    }

    /// Scale on the base acceleration
    pub fn input_scale(&self) -> f32 {
        match self {
            Character::Turtle => 1.0,
            Character::Penguin => 1.0,
            Character::Crab => 1.1,
        }
    }

    /// Extra multiplier on vertical acceleration
    pub fn vertical_boost(&self) -> f32 {
        match self {
            Character::Penguin => 1.5,
            _ => 1.0,
        }
    }

    pub fn collision_radius(&self) -> f32 {
        self.size() * player::COLLISION_RADIUS_FACTOR
    }
}

/// Difficulty tier, applied to base speeds at spawn time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn multiplier(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.3,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub character: Character,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Heading in radians
    pub rotation: f32,
    pub score: u32,
    /// Flips to false once and never back within a room
    pub alive: bool,
    /// Remaining immunity ticks
    pub spawn_protection: u32,
    /// Remaining ticks during which predators chasing this player are slowed
    pub slow_motion: u32,
    /// Derived once from the archetype
    pub collision_radius: f32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, character: Character, position: Vec2) -> Self {
        Self {
            id,
            name,
            character,
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            score: 0,
            alive: true,
            spawn_protection: player::SPAWN_PROTECTION_TICKS,
            slow_motion: 0,
            collision_radius: character.collision_radius(),
        }
    }

    pub fn has_spawn_protection(&self) -> bool {
        self.spawn_protection > 0
    }

    pub fn in_slow_motion(&self) -> bool {
        self.slow_motion > 0
    }

    /// Mark the player dead. Returns false if already dead.
    pub fn kill(&mut self) -> bool {
        let was_alive = self.alive;
        self.alive = false;
        self.velocity = Vec2::ZERO;
        was_alive
    }
}

/// Food fish
#[derive(Debug, Clone)]
pub struct Fish {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: f32,
    pub visual_type: u8,
    pub color: &'static str,
}

/// Behaviour mode of a shark. Escaping takes precedence over confusion:
/// an escaping shark can never become confused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SharkMode {
    /// Chase the nearest alive player
    Seeking,
    /// Wander at reduced speed until the timer runs out
    Confused { ticks_remaining: u32 },
    /// Leave the arena along a fixed bearing; never collides again
    Escaping { bearing: f32 },
}

/// Predator
#[derive(Debug, Clone)]
pub struct Shark {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Base speed, difficulty already applied
    pub speed: f32,
    pub size: f32,
    pub rotation: f32,
    pub mode: SharkMode,
    pub is_mega: bool,
    /// Player tracked by the last update
    pub target: Option<PlayerId>,
}

impl Shark {
    pub fn new(id: EntityId, position: Vec2, speed: f32, size: f32) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            speed,
            size,
            rotation: 0.0,
            mode: SharkMode::Seeking,
            is_mega: false,
            target: None,
        }
    }

    pub fn is_confused(&self) -> bool {
        matches!(self.mode, SharkMode::Confused { .. })
    }

    pub fn is_escaping(&self) -> bool {
        matches!(self.mode, SharkMode::Escaping { .. })
    }

    /// Enter the confused state unless escaping
    pub fn confuse(&mut self, ticks: u32) -> bool {
        if self.is_escaping() {
            return false;
        }
        self.mode = SharkMode::Confused {
            ticks_remaining: ticks,
        };
        true
    }

    /// Inside the arena extended by one body size on every side
    pub fn on_screen(&self, width: f32, height: f32) -> bool {
        self.position.x >= -self.size
            && self.position.x <= width + self.size
            && self.position.y >= -self.size
            && self.position.y <= height + self.size
    }
}

/// Drifting jellyfish
#[derive(Debug, Clone)]
pub struct Jellyfish {
    pub id: EntityId,
    pub position: Vec2,
    /// Centre line the wobble oscillates around
    pub base_x: f32,
    /// Upward drift per tick
    pub drift_speed: f32,
    pub wobble_phase: f32,
    pub tentacles: u8,
    pub size: f32,
}

/// Slow-motion power-up
#[derive(Debug, Clone)]
pub struct Seahorse {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub bob_phase: f32,
    pub ticks_remaining: u32,
}

/// Ink-cloud power-up
#[derive(Debug, Clone)]
pub struct Octopus {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Ticks until the next heading change
    pub wander_timer: u32,
    pub ticks_remaining: u32,
}

/// Cloud that confuses sharks passing through it
#[derive(Debug, Clone)]
pub struct InkCloud {
    pub id: EntityId,
    pub position: Vec2,
    pub radius: f32,
    pub ticks_remaining: u32,
    /// Sharks already confused by this cloud
    pub affected: FxHashSet<EntityId>,
}

impl InkCloud {
    pub fn new(id: EntityId, position: Vec2) -> Self {
        Self {
            id,
            position,
            radius: ink::RADIUS,
            ticks_remaining: ink::DURATION_TICKS,
            affected: FxHashSet::default(),
        }
    }

    /// Remaining lifetime as 0..=1, used by the renderer for fading
    pub fn strength(&self) -> f32 {
        self.ticks_remaining as f32 / ink::DURATION_TICKS as f32
    }
}

/// Arena edge a shark enters from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    /// Point on this edge, `t` in 0..=1 along it, pushed `inset` toward the centre
    pub fn edge_point(&self, t: f32, inset: f32, width: f32, height: f32) -> Vec2 {
        match self {
            Side::Left => Vec2::new(inset, t * height),
            Side::Right => Vec2::new(width - inset, t * height),
            Side::Top => Vec2::new(t * width, inset),
            Side::Bottom => Vec2::new(t * width, height - inset),
        }
    }
}

/// Cosmetic pre-spawn signal
#[derive(Debug, Clone)]
pub struct SpawnWarning {
    pub id: EntityId,
    pub side: Side,
    pub position: Vec2,
    pub ticks_remaining: u32,
    pub opacity: f32,
}

impl SpawnWarning {
    pub fn new(id: EntityId, side: Side, position: Vec2) -> Self {
        Self {
            id,
            side,
            position,
            ticks_remaining: warning::DURATION_TICKS,
            opacity: 1.0,
        }
    }
}

/// Escalation bookkeeping that outlives individual sharks
#[derive(Debug, Clone, Default)]
pub struct EscalationState {
    /// Escalation events fired so far
    pub escalations: u32,
    /// Sharks escaping, mega predator not yet arrived
    pub mega_pending: bool,
    pub mega_active: bool,
    pub mega_speed_bonus: f32,
}

/// Full entity set of one room
#[derive(Debug, Clone)]
pub struct World {
    pub width: f32,
    pub height: f32,
    pub players: HashMap<PlayerId, Player>,
    pub fish: Vec<Fish>,
    pub sharks: Vec<Shark>,
    pub jellyfish: Vec<Jellyfish>,
    pub seahorses: Vec<Seahorse>,
    pub octopuses: Vec<Octopus>,
    pub ink_clouds: Vec<InkCloud>,
    pub warnings: Vec<SpawnWarning>,
    pub escalation: EscalationState,
    next_entity_id: EntityId,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            players: HashMap::with_capacity(2),
            fish: Vec::new(),
            sharks: Vec::new(),
            jellyfish: Vec::new(),
            seahorses: Vec::new(),
            octopuses: Vec::new(),
            ink_clouds: Vec::new(),
            warnings: Vec::new(),
            escalation: EscalationState::default(),
            next_entity_id: 1,
        }
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// True when at least one player exists and none is alive
    pub fn all_players_dead(&self) -> bool {
        !self.players.is_empty() && self.alive_count() == 0
    }

    /// Whether a point lies inside the arena proper
    pub fn in_bounds(&self, position: Vec2) -> bool {
        position.x >= 0.0 && position.x <= self.width && position.y >= 0.0 && position.y <= self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(arena::WIDTH, arena::HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_parsing() {
        assert_eq!(Character::from_name("Penguin"), Character::Penguin);
        assert_eq!(Character::from_name(" crab "), Character::Crab);
        assert_eq!(Character::from_name("dragon"), Character::Turtle);
    }

    #[test]
    fn test_penguin_has_vertical_boost_and_higher_cap() {
        assert!(Character::Penguin.vertical_boost() > 1.0);
        assert!(Character::Penguin.max_speed() > Character::Turtle.max_speed());
        assert_eq!(Character::Turtle.vertical_boost(), 1.0);
    }

    #[test]
    fn test_player_collision_radius_cached_from_archetype() {
        let p = Player::new(Uuid::new_v4(), "A".into(), Character::Turtle, Vec2::ZERO);
        assert_eq!(p.collision_radius, 50.0 * player::COLLISION_RADIUS_FACTOR);
        assert!(p.alive);
        assert!(p.has_spawn_protection());
    }

    #[test]
    fn test_player_kill_is_one_way() {
        let mut p = Player::new(Uuid::new_v4(), "A".into(), Character::Crab, Vec2::ZERO);
        assert!(p.kill());
        assert!(!p.kill());
        assert!(!p.alive);
    }

    #[test]
    fn test_escaping_shark_cannot_be_confused() {
        let mut s = Shark::new(1, Vec2::ZERO, 2.0, 70.0);
        assert!(s.confuse(10));
        assert!(s.is_confused());

        s.mode = SharkMode::Escaping { bearing: 0.0 };
        assert!(!s.confuse(10));
        assert!(s.is_escaping());
    }

    #[test]
    fn test_shark_on_screen_uses_extended_bounds() {
        let mut s = Shark::new(1, Vec2::new(-60.0, 100.0), 2.0, 70.0);
        assert!(s.on_screen(1200.0, 800.0));
        s.position = Vec2::new(-80.0, 100.0);
        assert!(!s.on_screen(1200.0, 800.0));
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("nightmare"), None);
        assert!(Difficulty::Easy.multiplier() < Difficulty::Hard.multiplier());
    }

    #[test]
    fn test_world_entity_ids_increase() {
        let mut world = World::default();
        let a = world.next_entity_id();
        let b = world.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_all_players_dead_requires_players() {
        let mut world = World::default();
        assert!(!world.all_players_dead());

        let mut p = Player::new(Uuid::new_v4(), "A".into(), Character::Turtle, Vec2::ZERO);
        p.kill();
        world.add_player(p);
        assert!(world.all_players_dead());
    }

    #[test]
    fn test_side_edge_points() {
        assert_eq!(Side::Left.edge_point(0.5, 10.0, 100.0, 50.0), Vec2::new(10.0, 25.0));
        assert_eq!(Side::Bottom.edge_point(1.0, 10.0, 100.0, 50.0), Vec2::new(100.0, 40.0));
    }
}
