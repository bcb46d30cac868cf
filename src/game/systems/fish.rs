use rand::Rng;

use crate::game::constants::fish::{COLORS, MAX_DRIFT, MAX_SIZE, MIN_SIZE, SCORE, VISUAL_TYPES};
use crate::game::game_loop::GameLoopEvent;
use crate::game::state::{Fish, PlayerId, World};
use crate::game::systems::collision::circles_overlap;
use crate::util::vec2::Vec2;

/// Create a fish at a random position with a random drift
pub fn spawn<R: Rng + ?Sized>(world: &mut World, rng: &mut R) -> Fish {
    Fish {
        id: world.next_entity_id(),
        position: Vec2::new(rng.gen_range(0.0..world.width), rng.gen_range(0.0..world.height)),
        velocity: Vec2::new(
            rng.gen_range(-MAX_DRIFT..=MAX_DRIFT),
            rng.gen_range(-MAX_DRIFT..=MAX_DRIFT) * 0.5,
        ),
        size: rng.gen_range(MIN_SIZE..=MAX_SIZE),
        visual_type: rng.gen_range(0..VISUAL_TYPES),
        color: COLORS[rng.gen_range(0..COLORS.len())],
    }
}

/// Fill the arena with the initial school
pub fn populate<R: Rng + ?Sized>(world: &mut World, rng: &mut R, count: usize) {
    for _ in 0..count {
        let fish = spawn(world, rng);
        world.fish.push(fish);
    }
}

/// Drift fish and resolve eating.
///
/// Eats are collected first and applied afterwards; each eaten fish is
/// replaced in its slot so the population never changes.
pub fn update<R: Rng + ?Sized>(world: &mut World, rng: &mut R, events: &mut Vec<GameLoopEvent>) {
    let (width, height) = (world.width, world.height);
    for fish in &mut world.fish {
        fish.position = (fish.position + fish.velocity).wrapped(width, height);
    }

    let mut eaten: Vec<(usize, PlayerId)> = Vec::new();
    for (index, fish) in world.fish.iter().enumerate() {
        let eater = world
            .players
            .values()
            .filter(|p| p.alive)
            .filter(|p| circles_overlap(p.position, p.collision_radius, fish.position, fish.size))
            .min_by(|a, b| {
                a.position
                    .distance_sq_to(fish.position)
                    .total_cmp(&b.position.distance_sq_to(fish.position))
            });
        if let Some(player) = eater {
            eaten.push((index, player.id));
        }
    }

    for (index, player_id) in eaten {
        let replacement = spawn(world, rng);
        world.fish[index] = replacement;

        if let Some(player) = world.get_player_mut(player_id) {
            player.score += SCORE;
            events.push(GameLoopEvent::FishEaten {
                player_id,
                score: player.score,
            });
        }
    }
}
