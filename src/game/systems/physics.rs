use crate::game::constants::player::{
    BASE_SPEED, FRICTION, MAX_JOYSTICK_MAGNITUDE, ROTATION_DEAD_ZONE,
};
use crate::game::state::{PlayerId, World};
use crate::net::protocol::PlayerInput;

/// Integrate player motion for one tick.
/// Position first, then friction, then wrap onto the opposite edge.
pub fn update(world: &mut World) {
    let (width, height) = (world.width, world.height);

    for player in world.players.values_mut() {
        if !player.alive {
            continue;
        }

        player.position += player.velocity;
        player.velocity *= FRICTION;
        player.position = player.position.wrapped(width, height);

        if player.velocity.length() > ROTATION_DEAD_ZONE {
            player.rotation = player.velocity.angle();
        }

        player.spawn_protection = player.spawn_protection.saturating_sub(1);
        player.slow_motion = player.slow_motion.saturating_sub(1);
    }
}

/// Accelerate a player from one input frame.
/// Returns false if the player is unknown or dead.
pub fn apply_input(world: &mut World, player_id: PlayerId, input: &PlayerInput) -> bool {
    let player = match world.get_player_mut(player_id) {
        Some(p) if p.alive => p,
        _ => return false,
    };

    let joystick = if input.joystick.is_finite() {
        input.joystick.clamp_length(MAX_JOYSTICK_MAGNITUDE)
    } else {
        Default::default()
    };
    let mut accel = (input.direction() + joystick) * (BASE_SPEED * player.character.input_scale());
    accel.y *= player.character.vertical_boost();

    player.velocity += accel;
    player.velocity = player.velocity.clamp_length(player.character.max_speed());
    true
}
