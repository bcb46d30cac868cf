//! Per-species collision tests.
//!
//! All functions here are pure so the geometry can be checked in isolation.

use crate::game::constants::{jellyfish, shark};
use crate::util::vec2::Vec2;

/// Plain circle overlap
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.distance_sq_to(b) < reach * reach
}

/// Absolute angle in degrees (0..=180) between a heading and the direction
/// from `from` to `to`
pub fn angle_to_target(heading: f32, from: Vec2, to: Vec2) -> f32 {
    let delta = to - from;
    if delta.length_sq() == 0.0 {
        return 0.0;
    }
    let facing = Vec2::from_angle(heading);
    let cos = (facing.dot(delta) / delta.length()).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Hitbox multiplier for a shark given the angle to its target.
/// Frontal strikes use the tighter box.
#[inline]
pub fn shark_hitbox_multiplier(angle_degrees: f32) -> f32 {
    if angle_degrees < shark::FRONT_ARC_DEGREES {
        shark::FRONT_HITBOX
    } else {
        shark::REAR_HITBOX
    }
}

/// Directional shark hitbox against a player circle
pub fn shark_hits_player(
    shark_position: Vec2,
    shark_heading: f32,
    shark_size: f32,
    player_position: Vec2,
    player_radius: f32,
) -> bool {
    let angle = angle_to_target(shark_heading, shark_position, player_position);
    let shark_radius = shark_size * shark_hitbox_multiplier(angle);
    circles_overlap(shark_position, shark_radius, player_position, player_radius)
}

/// Normalized elliptical distance of `delta` for radii `rx`, `ry`.
/// 1.0 lies exactly on the ellipse boundary.
#[inline]
pub fn ellipse_distance(delta: Vec2, rx: f32, ry: f32) -> f32 {
    let nx = delta.x / rx;
    let ny = delta.y / ry;
    (nx * nx + ny * ny).sqrt()
}

/// Hit threshold for a jellyfish. `dy` is player.y - jelly.y, so a negative
/// value means the player is above the bell.
#[inline]
pub fn jellyfish_threshold(dy: f32) -> f32 {
    if dy < 0.0 {
        jellyfish::ABOVE_THRESHOLD
    } else {
        jellyfish::DEFAULT_THRESHOLD
    }
}

/// Asymmetric ellipse test: forgiving over the bell, strict near the tentacles
pub fn jellyfish_hits_player(
    jelly_position: Vec2,
    jelly_size: f32,
    player_position: Vec2,
    player_radius: f32,
) -> bool {
    let rx = jelly_size * jellyfish::RADIUS_X_FACTOR + player_radius;
    let ry = jelly_size * jellyfish::RADIUS_Y_FACTOR + player_radius;
    let delta = player_position - jelly_position;
    ellipse_distance(delta, rx, ry) < jellyfish_threshold(delta.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direction_at(degrees: f32, distance: f32) -> Vec2 {
        Vec2::from_angle(degrees.to_radians()) * distance
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
    }

    #[test]
    fn test_angle_to_target() {
        let a = angle_to_target(0.0, Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!(a.abs() < 0.01);

        let b = angle_to_target(0.0, Vec2::ZERO, Vec2::new(-10.0, 0.0));
        assert!((b - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_hitbox_multiplier_at_arc_boundaries() {
        for (degrees, expected) in [
            (0.0, shark::FRONT_HITBOX),
            (59.0, shark::FRONT_HITBOX),
            (61.0, shark::REAR_HITBOX),
            (180.0, shark::REAR_HITBOX),
        ] {
            let target = direction_at(degrees, 100.0);
            let angle = angle_to_target(0.0, Vec2::ZERO, target);
            assert_eq!(
                shark_hitbox_multiplier(angle),
                expected,
                "angle {degrees} measured as {angle}"
            );
        }
    }

    #[test]
    fn test_shark_rear_reaches_further_than_front() {
        let size = 70.0;
        let player_radius = 10.0;
        // Between front reach (28 + 10) and rear reach (42 + 10)
        let distance = 45.0;

        let ahead = direction_at(0.0, distance);
        assert!(!shark_hits_player(Vec2::ZERO, 0.0, size, ahead, player_radius));

        let behind = direction_at(180.0, distance);
        assert!(shark_hits_player(Vec2::ZERO, 0.0, size, behind, player_radius));
    }

    #[test]
    fn test_ellipse_distance() {
        assert!((ellipse_distance(Vec2::new(10.0, 0.0), 10.0, 5.0) - 1.0).abs() < 1e-6);
        assert!((ellipse_distance(Vec2::new(0.0, 2.5), 10.0, 5.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_jellyfish_asymmetry_at_point_eight() {
        let size = jellyfish::SIZE;
        let player_radius = 0.0;
        let ry = size * jellyfish::RADIUS_Y_FACTOR;
        let jelly = Vec2::new(500.0, 400.0);

        let above = jelly + Vec2::new(0.0, -0.8 * ry);
        let below = jelly + Vec2::new(0.0, 0.8 * ry);

        assert!(!jellyfish_hits_player(jelly, size, above, player_radius));
        assert!(jellyfish_hits_player(jelly, size, below, player_radius));
    }

    #[test]
    fn test_jellyfish_threshold_sides() {
        assert_eq!(jellyfish_threshold(-1.0), jellyfish::ABOVE_THRESHOLD);
        assert_eq!(jellyfish_threshold(0.0), jellyfish::DEFAULT_THRESHOLD);
        assert_eq!(jellyfish_threshold(3.0), jellyfish::DEFAULT_THRESHOLD);
    }
}
