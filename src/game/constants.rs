//! Gameplay constants shared with the renderer.
//!
//! Arena dimensions and rates MUST match the client exactly; everything else is
//! server-side tuning.

/// Arena dimensions (logical units, origin top-left, y grows downward)
pub mod arena {
    pub const WIDTH: f32 = 1200.0;
    pub const HEIGHT: f32 = 800.0;
}

/// Simulation and broadcast timing
pub mod timing {
    use std::time::Duration;

    /// Simulation ticks per second
    pub const SIMULATION_RATE: u32 = 60;
    /// Snapshots per second (must evenly divide SIMULATION_RATE)
    pub const BROADCAST_RATE: u32 = 20;
    /// Countdown between `start()` and the first tick
    pub const COUNTDOWN: Duration = Duration::from_secs(4);

    /// Wall-clock duration of one simulation tick
    pub fn tick_duration(simulation_rate: u32) -> Duration {
        Duration::from_secs_f64(1.0 / simulation_rate.max(1) as f64)
    }
}

/// Player motion and status effects
pub mod player {
    /// Velocity multiplier applied every tick
    pub const FRICTION: f32 = 0.95;
    /// Below this speed rotation is left untouched (prevents idle jitter)
    pub const ROTATION_DEAD_ZONE: f32 = 0.1;
    /// Ticks of immunity after joining (3 s)
    pub const SPAWN_PROTECTION_TICKS: u32 = 180;
    /// Ticks of predator slow-down after a seahorse pickup (5 s)
    pub const SLOW_MOTION_TICKS: u32 = 300;
    /// Analog stick vectors longer than this are rescaled
    pub const MAX_JOYSTICK_MAGNITUDE: f32 = 1.0;
    /// Base acceleration per input frame
    pub const BASE_SPEED: f32 = 0.5;
    /// Collision radius as a fraction of the archetype's sprite size
    pub const COLLISION_RADIUS_FACTOR: f32 = 0.4;
    /// Keep spawn points this far from the arena edges
    pub const SPAWN_MARGIN: f32 = 150.0;
}

/// Food fish
pub mod fish {
    pub const COUNT: usize = 12;
    pub const MIN_SIZE: f32 = 10.0;
    pub const MAX_SIZE: f32 = 18.0;
    pub const MAX_DRIFT: f32 = 1.0;
    pub const SCORE: u32 = 10;
    pub const VISUAL_TYPES: u8 = 4;
    pub const COLORS: [&str; 6] = ["#FF6B6B", "#FFD93D", "#6BCB77", "#4D96FF", "#FF8FE5", "#FFA45B"];
}

/// Predators
pub mod shark {
    pub const INITIAL_COUNT: usize = 2;
    pub const BASE_SPEED: f32 = 1.8;
    pub const SIZE: f32 = 70.0;
    /// Each existing shark makes the next one this much faster (fractional)
    pub const SPEED_PER_SHARK: f32 = 0.08;
    /// Half-angle of the frontal arc (degrees)
    pub const FRONT_ARC_DEGREES: f32 = 60.0;
    /// Hitbox multiplier when the target is inside the frontal arc
    pub const FRONT_HITBOX: f32 = 0.4;
    /// Hitbox multiplier otherwise
    pub const REAR_HITBOX: f32 = 0.6;
    pub const CONFUSION_TICKS: u32 = 180;
    pub const CONFUSED_SPEED_FACTOR: f32 = 0.5;
    /// Random steering jitter per tick while confused (radians)
    pub const CONFUSED_TURN_JITTER: f32 = 0.4;
    /// Speed factor when chasing a player under slow-motion
    pub const SLOWED_TARGET_FACTOR: f32 = 0.3;
    pub const ESCAPE_SPEED_FACTOR: f32 = 2.5;
}

/// The single oversized predator that replaces the shark set
pub mod mega {
    pub const SIZE_MULTIPLIER: f32 = 2.2;
    pub const SPEED_MULTIPLIER: f32 = 1.4;
    /// Added to the mega speed bonus by every escalation after arrival
    pub const SPEED_STEP: f32 = 0.4;
}

/// Timed difficulty escalation
pub mod escalation {
    use std::time::Duration;

    pub const INTERVAL: Duration = Duration::from_secs(7);
    /// Gap between the spawn warning and the shark actually appearing
    pub const SPAWN_DELAY: Duration = Duration::from_secs(2);
    /// Sharks escape for this long before the mega predator arrives
    pub const MEGA_DELAY: Duration = Duration::from_secs(3);
    /// Shark count that triggers the mega transition
    pub const MEGA_THRESHOLD: usize = 9;
}

/// Cosmetic pre-spawn warnings
pub mod warning {
    pub const DURATION_TICKS: u32 = 120;
    /// Distance of the warning marker from its edge
    pub const EDGE_INSET: f32 = 30.0;
}

/// Drifting jellyfish hazards
pub mod jellyfish {
    pub const COUNT: usize = 3;
    pub const SIZE: f32 = 50.0;
    pub const MIN_DRIFT: f32 = 0.5;
    pub const MAX_DRIFT: f32 = 1.0;
    pub const WOBBLE_AMPLITUDE: f32 = 20.0;
    pub const WOBBLE_STEP: f32 = 0.03;
    pub const MIN_TENTACLES: u8 = 4;
    pub const MAX_TENTACLES: u8 = 8;
    /// Horizontal ellipse radius as a fraction of size
    pub const RADIUS_X_FACTOR: f32 = 0.5;
    /// Vertical ellipse radius as a fraction of size
    pub const RADIUS_Y_FACTOR: f32 = 0.35;
    /// Normalized-distance threshold when the player is above the bell
    pub const ABOVE_THRESHOLD: f32 = 0.7;
    pub const DEFAULT_THRESHOLD: f32 = 1.0;
}

/// Seahorse power-up (slow motion)
pub mod seahorse {
    pub const SIZE: f32 = 30.0;
    pub const LIFETIME_TICKS: u32 = 720;
    pub const RESPAWN_CHANCE: f64 = 0.002;
    pub const SCORE: u32 = 25;
    pub const DRIFT_SPEED: f32 = 0.6;
    pub const BOB_AMPLITUDE: f32 = 0.8;
    pub const BOB_STEP: f32 = 0.05;
}

/// Octopus power-up (ink cloud)
pub mod octopus {
    pub const SIZE: f32 = 36.0;
    pub const LIFETIME_TICKS: u32 = 720;
    pub const RESPAWN_CHANCE: f64 = 0.0015;
    pub const SCORE: u32 = 25;
    pub const WANDER_SPEED: f32 = 0.8;
    /// Ticks between heading changes
    pub const WANDER_INTERVAL: u32 = 90;
}

/// Ink clouds left behind by collected octopuses
pub mod ink {
    pub const RADIUS: f32 = 120.0;
    pub const DURATION_TICKS: u32 = 240;
}

/// Matchmaking
pub mod matchmaking {
    pub const PLAYERS_PER_ROOM: usize = 2;
    pub const NIGHT_MODE_CHANCE: f64 = 0.3;
    pub const MAX_NAME_LENGTH: usize = 16;
    pub const DEFAULT_NAME: &str = "Player";
}

/// Networking limits
pub mod net {
    pub const MAX_MESSAGE_SIZE: usize = 65536;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_rate_divides_simulation_rate() {
        assert!(timing::BROADCAST_RATE <= timing::SIMULATION_RATE);
        assert_eq!(timing::SIMULATION_RATE % timing::BROADCAST_RATE, 0);
    }

    #[test]
    fn test_tick_duration() {
        let d = timing::tick_duration(60);
        assert!((d.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_hitbox_multipliers_ordered() {
        assert!(shark::FRONT_HITBOX < shark::REAR_HITBOX);
        assert!(jellyfish::RADIUS_X_FACTOR > jellyfish::RADIUS_Y_FACTOR);
    }
}
