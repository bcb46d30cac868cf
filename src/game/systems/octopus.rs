use rand::Rng;

use crate::game::constants::octopus::{
    LIFETIME_TICKS, RESPAWN_CHANCE, SCORE, SIZE, WANDER_INTERVAL, WANDER_SPEED,
};
use crate::game::game_loop::GameLoopEvent;
use crate::game::state::{InkCloud, Octopus, PlayerId, World};
use crate::game::systems::collision::circles_overlap;
use crate::util::vec2::Vec2;

fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU)) * WANDER_SPEED
}

/// Create an octopus somewhere away from the edges
pub fn spawn<R: Rng + ?Sized>(world: &mut World, rng: &mut R) -> Octopus {
    let margin = SIZE * 2.0;
    let x = rng.gen_range(margin..(world.width - margin).max(margin + 1.0));
    let y = rng.gen_range(margin..(world.height - margin).max(margin + 1.0));
    Octopus {
        id: world.next_entity_id(),
        position: Vec2::new(x, y),
        velocity: random_heading(rng),
        wander_timer: WANDER_INTERVAL,
        ticks_remaining: LIFETIME_TICKS,
    }
}

pub fn maybe_respawn<R: Rng + ?Sized>(world: &mut World, rng: &mut R) {
    if world.octopuses.is_empty() && rng.gen_bool(RESPAWN_CHANCE) {
        let octopus = spawn(world, rng);
        world.octopuses.push(octopus);
    }
}

/// Wander, expire, and release an ink cloud on pickup
pub fn update<R: Rng + ?Sized>(world: &mut World, rng: &mut R, events: &mut Vec<GameLoopEvent>) {
    let half = SIZE / 2.0;
    let min = Vec2::new(half, half);
    let max = Vec2::new(world.width - half, world.height - half);

    for octopus in &mut world.octopuses {
        octopus.wander_timer = octopus.wander_timer.saturating_sub(1);
        if octopus.wander_timer == 0 {
            octopus.velocity = random_heading(rng);
            octopus.wander_timer = WANDER_INTERVAL;
        }

        let next = octopus.position + octopus.velocity;
        let clamped = next.clamped(min, max);
        if clamped.x != next.x {
            octopus.velocity.x = -octopus.velocity.x;
        }
        if clamped.y != next.y {
            octopus.velocity.y = -octopus.velocity.y;
        }
        octopus.position = clamped;
        octopus.ticks_remaining = octopus.ticks_remaining.saturating_sub(1);
    }

    let mut collected: Vec<(usize, PlayerId)> = Vec::new();
    for (index, octopus) in world.octopuses.iter().enumerate() {
        if octopus.ticks_remaining == 0 || !world.in_bounds(octopus.position) {
            continue;
        }
        let collector = world
            .players
            .values()
            .find(|p| p.alive && circles_overlap(p.position, p.collision_radius, octopus.position, half));
        if let Some(player) = collector {
            collected.push((index, player.id));
        }
    }

    for (index, player_id) in collected {
        let position = world.octopuses[index].position;
        world.octopuses[index].ticks_remaining = 0;

        let cloud = InkCloud::new(world.next_entity_id(), position);
        world.ink_clouds.push(cloud);

        if let Some(player) = world.get_player_mut(player_id) {
            player.score += SCORE;
            events.push(GameLoopEvent::OctopusCollected {
                player_id,
                score: player.score,
            });
        }
    }

    world.octopuses.retain(|o| o.ticks_remaining > 0);
    maybe_respawn(world, rng);
}
