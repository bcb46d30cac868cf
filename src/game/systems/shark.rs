use hashbrown::HashMap;
use rand::Rng;

use crate::game::constants::{mega, shark};
use crate::game::game_loop::{DeathCause, GameLoopEvent};
use crate::game::state::{Difficulty, Player, PlayerId, Shark, SharkMode, Side, World};
use crate::game::systems::collision::shark_hits_player;
use crate::util::vec2::Vec2;

/// Speed for the next ordinary shark, scaled by how many already exist
pub fn next_speed(existing: usize, difficulty: Difficulty) -> f32 {
    shark::BASE_SPEED * (1.0 + shark::SPEED_PER_SHARK * existing as f32) * difficulty.multiplier()
}

fn entry_point<R: Rng + ?Sized>(world: &World, rng: &mut R, side: Side, size: f32) -> Vec2 {
    side.edge_point(rng.gen_range(0.1..0.9), size / 2.0, world.width, world.height)
}

/// Create an ordinary shark entering from `side`
pub fn spawn<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    side: Side,
    difficulty: Difficulty,
) -> Shark {
    let speed = next_speed(world.sharks.len(), difficulty);
    let position = entry_point(world, rng, side, shark::SIZE);
    let mut s = Shark::new(world.next_entity_id(), position, speed, shark::SIZE);
    s.rotation = (world.center() - position).angle();
    s
}

/// Create the mega predator
pub fn spawn_mega<R: Rng + ?Sized>(world: &mut World, rng: &mut R, difficulty: Difficulty) -> Shark {
    let size = shark::SIZE * mega::SIZE_MULTIPLIER;
    let side = Side::ALL[rng.gen_range(0..Side::ALL.len())];
    let position = entry_point(world, rng, side, size);
    let speed = shark::BASE_SPEED * mega::SPEED_MULTIPLIER * difficulty.multiplier();
    let mut s = Shark::new(world.next_entity_id(), position, speed, size);
    s.is_mega = true;
    s.rotation = (world.center() - position).angle();
    s
}

/// Send every shark outward, away from the arena centre
pub fn escape_all(world: &mut World) {
    let center = world.center();
    for s in &mut world.sharks {
        let away = s.position - center;
        let bearing = if away.length_sq() > 0.0 { away.angle() } else { 0.0 };
        s.mode = SharkMode::Escaping { bearing };
        s.target = None;
    }
}

fn nearest_alive(players: &HashMap<PlayerId, Player>, from: Vec2) -> Option<PlayerId> {
    players
        .values()
        .filter(|p| p.alive)
        .min_by(|a, b| {
            a.position
                .distance_sq_to(from)
                .total_cmp(&b.position.distance_sq_to(from))
        })
        .map(|p| p.id)
}

/// Move every shark according to its mode, then test seeking sharks against
/// their tracked player
pub fn update<R: Rng + ?Sized>(world: &mut World, rng: &mut R, events: &mut Vec<GameLoopEvent>) {
    let (width, height) = (world.width, world.height);
    let mega_bonus = if world.escalation.mega_active {
        world.escalation.mega_speed_bonus
    } else {
        0.0
    };
    let players = &mut world.players;

    for s in world.sharks.iter_mut() {
        let half = s.size / 2.0;
        let min = Vec2::new(half, half);
        let max = Vec2::new(width - half, height - half);

        match s.mode {
            SharkMode::Escaping { bearing } => {
                s.velocity = Vec2::from_angle(bearing) * (s.speed * shark::ESCAPE_SPEED_FACTOR);
                s.position += s.velocity;
                s.rotation = bearing;
                s.target = None;
                continue;
            }
            SharkMode::Confused { ticks_remaining } => {
                s.rotation += rng.gen_range(-shark::CONFUSED_TURN_JITTER..=shark::CONFUSED_TURN_JITTER);
                s.velocity = Vec2::from_angle(s.rotation) * (s.speed * shark::CONFUSED_SPEED_FACTOR);
                s.position = (s.position + s.velocity).clamped(min, max);
                s.target = None;
                s.mode = if ticks_remaining <= 1 {
                    SharkMode::Seeking
                } else {
                    SharkMode::Confused {
                        ticks_remaining: ticks_remaining - 1,
                    }
                };
                continue;
            }
            SharkMode::Seeking => {}
        }

        s.target = nearest_alive(players, s.position);
        match s.target.and_then(|id| players.get(&id)) {
            Some(target) => {
                let mut speed = s.speed;
                if s.is_mega {
                    speed += mega_bonus;
                }
                if target.in_slow_motion() {
                    speed *= shark::SLOWED_TARGET_FACTOR;
                }
                s.velocity = (target.position - s.position).normalize() * speed;
            }
            None => s.velocity *= 0.9,
        }

        s.position = (s.position + s.velocity).clamped(min, max);
        if s.velocity.length_sq() > 0.0 {
            s.rotation = s.velocity.angle();
        }

        if !s.on_screen(width, height) {
            continue;
        }
        let Some(target) = s.target.and_then(|id| players.get_mut(&id)) else {
            continue;
        };
        if !target.alive || target.has_spawn_protection() {
            continue;
        }
        if shark_hits_player(s.position, s.rotation, s.size, target.position, target.collision_radius)
            && target.kill()
        {
            events.push(GameLoopEvent::PlayerDied {
                player_id: target.id,
                cause: DeathCause::Shark,
            });
        }
    }
}
