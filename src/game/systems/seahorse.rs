use rand::Rng;

use crate::game::constants::player::SLOW_MOTION_TICKS;
use crate::game::constants::seahorse::{
    BOB_AMPLITUDE, BOB_STEP, DRIFT_SPEED, LIFETIME_TICKS, RESPAWN_CHANCE, SCORE, SIZE,
};
use crate::game::game_loop::GameLoopEvent;
use crate::game::state::{PlayerId, Seahorse, World};
use crate::game::systems::collision::circles_overlap;
use crate::util::vec2::Vec2;

/// Create a seahorse just outside the left or right edge, drifting inward
pub fn spawn<R: Rng + ?Sized>(world: &mut World, rng: &mut R) -> Seahorse {
    let from_left = rng.gen_bool(0.5);
    let x = if from_left { -SIZE / 2.0 } else { world.width + SIZE / 2.0 };
    let margin = (world.height * 0.15).min(world.height / 2.0 - 1.0).max(0.0);
    let y = rng.gen_range(margin..=world.height - margin);
    let direction = if from_left { 1.0 } else { -1.0 };

    Seahorse {
        id: world.next_entity_id(),
        position: Vec2::new(x, y),
        velocity: Vec2::new(DRIFT_SPEED * direction, 0.0),
        bob_phase: rng.gen_range(0.0..std::f32::consts::TAU),
        ticks_remaining: LIFETIME_TICKS,
    }
}

/// Spawn one if none is present, with a small per-tick chance
pub fn maybe_respawn<R: Rng + ?Sized>(world: &mut World, rng: &mut R) {
    if world.seahorses.is_empty() && rng.gen_bool(RESPAWN_CHANCE) {
        let seahorse = spawn(world, rng);
        world.seahorses.push(seahorse);
    }
}

/// Drift and bob, expire, and hand out slow-motion on pickup
pub fn update<R: Rng + ?Sized>(world: &mut World, rng: &mut R, events: &mut Vec<GameLoopEvent>) {
    let width = world.width;
    for seahorse in &mut world.seahorses {
        seahorse.bob_phase += BOB_STEP;
        seahorse.position.x += seahorse.velocity.x;
        seahorse.position.y += seahorse.bob_phase.sin() * BOB_AMPLITUDE;
        seahorse.ticks_remaining = seahorse.ticks_remaining.saturating_sub(1);

        if seahorse.position.x < -SIZE * 2.0 || seahorse.position.x > width + SIZE * 2.0 {
            seahorse.ticks_remaining = 0;
        }
    }

    let mut collected: Vec<(usize, PlayerId)> = Vec::new();
    for (index, seahorse) in world.seahorses.iter().enumerate() {
        if seahorse.ticks_remaining == 0 || !world.in_bounds(seahorse.position) {
            continue;
        }
        let collector = world.players.values().find(|p| {
            p.alive && circles_overlap(p.position, p.collision_radius, seahorse.position, SIZE / 2.0)
        });
        if let Some(player) = collector {
            collected.push((index, player.id));
        }
    }

    for (index, player_id) in collected {
        world.seahorses[index].ticks_remaining = 0;
        if let Some(player) = world.get_player_mut(player_id) {
            player.slow_motion = SLOW_MOTION_TICKS;
            player.score += SCORE;
            events.push(GameLoopEvent::SeahorseCollected {
                player_id,
                score: player.score,
            });
        }
    }

    world.seahorses.retain(|s| s.ticks_remaining > 0);
    maybe_respawn(world, rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Character, Player};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn setup() -> (World, StdRng) {
        (World::new(1200.0, 800.0), StdRng::seed_from_u64(11))
    }

    fn place(world: &mut World, rng: &mut StdRng, position: Vec2) {
        let mut s = spawn(world, rng);
        s.position = position;
        s.velocity = Vec2::ZERO;
        s.bob_phase = -BOB_STEP;
        world.seahorses.push(s);
    }

    #[test]
    fn test_spawn_enters_from_side() {
        let (mut world, mut rng) = setup();
        for _ in 0..10 {
            let s = spawn(&mut world, &mut rng);
            assert!(s.position.x < 0.0 || s.position.x > world.width);
            assert!(s.velocity.x.signum() == if s.position.x < 0.0 { 1.0 } else { -1.0 });
        }
    }

    #[test]
    fn test_collect_grants_slow_motion_and_score() {
        let (mut world, mut rng) = setup();
        let id = Uuid::new_v4();
        world.add_player(Player::new(id, "A".into(), Character::Crab, Vec2::new(300.0, 300.0)));
        place(&mut world, &mut rng, Vec2::new(305.0, 300.0));

        let mut events = Vec::new();
        update(&mut world, &mut rng, &mut events);

        let p = world.get_player(id).unwrap();
        assert_eq!(p.slow_motion, SLOW_MOTION_TICKS);
        assert_eq!(p.score, SCORE);
        assert!(world.seahorses.is_empty());
        assert!(matches!(events.as_slice(), [GameLoopEvent::SeahorseCollected { .. }]));
    }

    #[test]
    fn test_not_collectible_outside_arena() {
        let (mut world, mut rng) = setup();
        let id = Uuid::new_v4();
        world.add_player(Player::new(id, "A".into(), Character::Turtle, Vec2::new(0.0, 300.0)));
        place(&mut world, &mut rng, Vec2::new(-10.0, 300.0));

        let mut events = Vec::new();
        update(&mut world, &mut rng, &mut events);

        assert!(events.is_empty());
        assert_eq!(world.seahorses.len(), 1);
    }

    #[test]
    fn test_expires_after_lifetime() {
        let (mut world, mut rng) = setup();
        place(&mut world, &mut rng, Vec2::new(600.0, 400.0));
        world.seahorses[0].ticks_remaining = 1;
        let id = world.seahorses[0].id;

        let mut events = Vec::new();
        update(&mut world, &mut rng, &mut events);
        assert!(world.seahorses.iter().all(|s| s.id != id));
    }
}
