use rand::Rng;

use crate::game::constants::jellyfish::{
    MAX_DRIFT, MAX_TENTACLES, MIN_DRIFT, MIN_TENTACLES, SIZE, WOBBLE_AMPLITUDE, WOBBLE_STEP,
};
use crate::game::game_loop::{DeathCause, GameLoopEvent};
use crate::game::state::{Difficulty, Jellyfish, World};
use crate::game::systems::collision::jellyfish_hits_player;
use crate::util::vec2::Vec2;

fn random_column<R: Rng + ?Sized>(world: &World, rng: &mut R) -> f32 {
    let margin = WOBBLE_AMPLITUDE + SIZE;
    rng.gen_range(margin..(world.width - margin).max(margin + 1.0))
}

/// Create a jellyfish. Initial ones are scattered; recycled ones start below the arena.
pub fn spawn<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    difficulty: Difficulty,
    below_arena: bool,
) -> Jellyfish {
    let base_x = random_column(world, rng);
    let y = if below_arena {
        world.height + SIZE
    } else {
        rng.gen_range(0.0..world.height)
    };
    Jellyfish {
        id: world.next_entity_id(),
        position: Vec2::new(base_x, y),
        base_x,
        drift_speed: rng.gen_range(MIN_DRIFT..=MAX_DRIFT) * difficulty.multiplier(),
        wobble_phase: rng.gen_range(0.0..std::f32::consts::TAU),
        tentacles: rng.gen_range(MIN_TENTACLES..=MAX_TENTACLES),
        size: SIZE,
    }
}

pub fn populate<R: Rng + ?Sized>(world: &mut World, rng: &mut R, difficulty: Difficulty, count: usize) {
    for _ in 0..count {
        let jelly = spawn(world, rng, difficulty, false);
        world.jellyfish.push(jelly);
    }
}

/// Drift upward with a sideways wobble, recycle at the top, sting players
pub fn update<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    difficulty: Difficulty,
    events: &mut Vec<GameLoopEvent>,
) {
    let mut recycle = Vec::new();
    for (index, jelly) in world.jellyfish.iter_mut().enumerate() {
        jelly.wobble_phase += WOBBLE_STEP;
        jelly.position.y -= jelly.drift_speed;
        jelly.position.x = jelly.base_x + jelly.wobble_phase.sin() * WOBBLE_AMPLITUDE;
        if jelly.position.y < -jelly.size {
            recycle.push(index);
        }
    }

    for index in recycle {
        let fresh = spawn(world, rng, difficulty, true);
        // identity survives the trip back to the bottom
        let id = world.jellyfish[index].id;
        world.jellyfish[index] = Jellyfish { id, ..fresh };
    }

    for jelly in &world.jellyfish {
        for player in world.players.values_mut() {
            if !player.alive || player.has_spawn_protection() {
                continue;
            }
            if jellyfish_hits_player(jelly.position, jelly.size, player.position, player.collision_radius)
                && player.kill()
            {
                events.push(GameLoopEvent::PlayerDied {
                    player_id: player.id,
                    cause: DeathCause::Jellyfish,
                });
            }
        }
    }
}
