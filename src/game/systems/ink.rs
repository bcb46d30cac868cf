use crate::game::constants::shark::CONFUSION_TICKS;
use crate::game::state::World;

/// Confuse sharks inside each cloud (once per shark per cloud), then decay
/// and drop expired clouds.
///
/// Escaping sharks are skipped and never enter the affected set.
pub fn update(world: &mut World) {
    let sharks = &mut world.sharks;

    for cloud in world.ink_clouds.iter_mut() {
        let radius_sq = cloud.radius * cloud.radius;
        for s in sharks.iter_mut() {
            if s.is_escaping() || cloud.affected.contains(&s.id) {
                continue;
            }
            if s.position.distance_sq_to(cloud.position) < radius_sq && s.confuse(CONFUSION_TICKS) {
                cloud.affected.insert(s.id);
            }
        }
        cloud.ticks_remaining = cloud.ticks_remaining.saturating_sub(1);
    }

    world.ink_clouds.retain(|c| c.ticks_remaining > 0);
}
