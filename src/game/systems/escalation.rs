//! Timed difficulty escalation.
//!
//! Every interval a warning appears on a random edge and a shark spawn is
//! scheduled shortly after. Once the shark count reaches the threshold, all
//! sharks flee and a single mega predator replaces them. After that every
//! escalation also raises the mega predator's speed bonus, scaled by the
//! difficulty tier like every other predator speed.

use rand::Rng;
use tracing::{debug, info};

use crate::game::constants::{escalation, mega, warning};
use crate::game::game_loop::GameLoopEvent;
use crate::game::scheduler::Scheduler;
use crate::game::state::{Difficulty, Side, SpawnWarning, World};
use crate::game::systems::shark;

/// Deferred work owned by a room's scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EscalationTask {
    /// Periodic escalation step
    Escalate,
    /// Delayed arrival announced by a warning
    SpawnShark { side: Side },
    /// Replace the escaping shark set with the mega predator
    CompleteMegaTransition,
}

/// Place a warning marker on `side`
pub fn warn<R: Rng + ?Sized>(world: &mut World, rng: &mut R, side: Side) {
    let position = side.edge_point(
        rng.gen_range(0.1..0.9),
        warning::EDGE_INSET,
        world.width,
        world.height,
    );
    let id = world.next_entity_id();
    world.warnings.push(SpawnWarning::new(id, side, position));
}

/// One escalation step: warn, then schedule the spawn
pub fn escalate<R: Rng + ?Sized>(
    world: &mut World,
    scheduler: &mut Scheduler<EscalationTask>,
    rng: &mut R,
    difficulty: Difficulty,
) {
    let state = &mut world.escalation;
    state.escalations += 1;
    if state.mega_active {
        state.mega_speed_bonus += mega::SPEED_STEP * difficulty.multiplier();
        debug!(bonus = state.mega_speed_bonus, "Mega shark speed bonus raised");
    }

    let side = Side::ALL[rng.gen_range(0..Side::ALL.len())];
    warn(world, rng, side);
    scheduler.schedule(escalation::SPAWN_DELAY, EscalationTask::SpawnShark { side });
}

/// Land a scheduled spawn, starting the mega transition at the threshold
pub fn spawn_shark<R: Rng + ?Sized>(
    world: &mut World,
    scheduler: &mut Scheduler<EscalationTask>,
    rng: &mut R,
    side: Side,
    difficulty: Difficulty,
    events: &mut Vec<GameLoopEvent>,
) {
    if world.escalation.mega_pending {
        debug!("Shark spawn dropped during mega transition");
        return;
    }

    let new_shark = shark::spawn(world, rng, side, difficulty);
    world.sharks.push(new_shark);
    let count = world.sharks.len();
    events.push(GameLoopEvent::SharkSpawned { count });

    if !world.escalation.mega_active && count >= escalation::MEGA_THRESHOLD {
        info!(count, "Shark threshold reached, starting mega transition");
        world.escalation.mega_pending = true;
        shark::escape_all(world);
        scheduler.schedule(escalation::MEGA_DELAY, EscalationTask::CompleteMegaTransition);
        events.push(GameLoopEvent::MegaTransitionStarted);
    }
}

/// Swap the whole shark set for one mega predator
pub fn complete_mega_transition<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    difficulty: Difficulty,
    events: &mut Vec<GameLoopEvent>,
) {
    if !world.escalation.mega_pending {
        return;
    }
    let mega_shark = shark::spawn_mega(world, rng, difficulty);
    world.sharks.clear();
    world.sharks.push(mega_shark);
    world.escalation.mega_pending = false;
    world.escalation.mega_active = true;
    events.push(GameLoopEvent::MegaSharkArrived);
}

/// Count warnings down, pulsing their opacity, and drop expired ones
pub fn decay_warnings(world: &mut World) {
    for w in &mut world.warnings {
        w.ticks_remaining = w.ticks_remaining.saturating_sub(1);
        let fade = w.ticks_remaining as f32 / warning::DURATION_TICKS as f32;
        let pulse = 0.5 + 0.5 * (w.ticks_remaining as f32 * 0.2).sin().abs();
        w.opacity = fade * pulse;
    }
    world.warnings.retain(|w| w.ticks_remaining > 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::shark as shark_consts;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn setup() -> (World, Scheduler<EscalationTask>, StdRng) {
        (World::new(1200.0, 800.0), Scheduler::new(), StdRng::seed_from_u64(9))
    }

    fn run_due(
        world: &mut World,
        scheduler: &mut Scheduler<EscalationTask>,
        rng: &mut StdRng,
        dt: Duration,
        events: &mut Vec<GameLoopEvent>,
    ) {
        for task in scheduler.advance(dt) {
            match task {
                EscalationTask::Escalate => escalate(world, scheduler, rng, Difficulty::Medium),
                EscalationTask::SpawnShark { side } => {
                    spawn_shark(world, scheduler, rng, side, Difficulty::Medium, events)
                }
                EscalationTask::CompleteMegaTransition => {
                    complete_mega_transition(world, rng, Difficulty::Medium, events)
                }
            }
        }
    }

    #[test]
    fn test_escalate_warns_then_spawns_after_delay() {
        let (mut world, mut scheduler, mut rng) = setup();
        let mut events = Vec::new();

        escalate(&mut world, &mut scheduler, &mut rng, Difficulty::Medium);
        assert_eq!(world.warnings.len(), 1);
        assert!(world.sharks.is_empty());

        run_due(&mut world, &mut scheduler, &mut rng, escalation::SPAWN_DELAY, &mut events);
        assert_eq!(world.sharks.len(), 1);
        assert_eq!(world.sharks[0].mode, crate::game::state::SharkMode::Seeking);
    }

    #[test]
    fn test_spawn_speed_scales_with_count() {
        let (mut world, mut scheduler, mut rng) = setup();
        let mut events = Vec::new();
        for _ in 0..3 {
            spawn_shark(&mut world, &mut scheduler, &mut rng, Side::Left, Difficulty::Medium, &mut events);
        }
        let expected = shark_consts::BASE_SPEED * (1.0 + 2.0 * shark_consts::SPEED_PER_SHARK);
        assert!((world.sharks[2].speed - expected).abs() < 1e-5);
        // earlier sharks keep their speed
        assert!((world.sharks[0].speed - shark_consts::BASE_SPEED).abs() < 1e-5);
    }

    #[test]
    fn test_nine_spawns_become_one_mega_then_tenth_escalation_compounds() {
        let (mut world, mut scheduler, mut rng) = setup();
        let mut events = Vec::new();

        for _ in 0..escalation::MEGA_THRESHOLD {
            escalate(&mut world, &mut scheduler, &mut rng, Difficulty::Medium);
            run_due(&mut world, &mut scheduler, &mut rng, escalation::SPAWN_DELAY, &mut events);
        }

        assert_eq!(world.sharks.len(), escalation::MEGA_THRESHOLD);
        assert!(world.sharks.iter().all(|s| s.is_escaping()));
        assert!(world.escalation.mega_pending);

        run_due(&mut world, &mut scheduler, &mut rng, escalation::MEGA_DELAY, &mut events);
        assert_eq!(world.sharks.len(), 1);
        assert!(world.sharks[0].is_mega);
        assert!(world.escalation.mega_active);
        assert_eq!(world.escalation.mega_speed_bonus, 0.0);

        // tenth escalation: bonus rises, count unchanged until the spawn lands
        escalate(&mut world, &mut scheduler, &mut rng, Difficulty::Medium);
        assert!((world.escalation.mega_speed_bonus - mega::SPEED_STEP).abs() < 1e-6);
        assert_eq!(world.sharks.len(), 1);

        run_due(&mut world, &mut scheduler, &mut rng, escalation::SPAWN_DELAY, &mut events);
        assert_eq!(world.sharks.len(), 2);
        assert_eq!(world.sharks.iter().filter(|s| s.is_mega).count(), 1);

        assert!(events.iter().any(|e| matches!(e, GameLoopEvent::MegaTransitionStarted)));
        assert!(events.iter().any(|e| matches!(e, GameLoopEvent::MegaSharkArrived)));
    }

    #[test]
    fn test_mega_bonus_step_scales_with_difficulty() {
        let (mut world, mut scheduler, mut rng) = setup();
        world.escalation.mega_active = true;

        escalate(&mut world, &mut scheduler, &mut rng, Difficulty::Hard);
        let hard_step = mega::SPEED_STEP * Difficulty::Hard.multiplier();
        assert!((world.escalation.mega_speed_bonus - hard_step).abs() < 1e-6);

        escalate(&mut world, &mut scheduler, &mut rng, Difficulty::Easy);
        let easy_step = mega::SPEED_STEP * Difficulty::Easy.multiplier();
        assert!((world.escalation.mega_speed_bonus - (hard_step + easy_step)).abs() < 1e-6);

        // no bonus before the mega predator arrives
        let (mut world, mut scheduler, mut rng) = setup();
        escalate(&mut world, &mut scheduler, &mut rng, Difficulty::Hard);
        assert_eq!(world.escalation.mega_speed_bonus, 0.0);
    }

    #[test]
    fn test_spawn_during_transition_is_dropped() {
        let (mut world, mut scheduler, mut rng) = setup();
        let mut events = Vec::new();
        world.escalation.mega_pending = true;

        spawn_shark(&mut world, &mut scheduler, &mut rng, Side::Top, Difficulty::Medium, &mut events);

        assert!(world.sharks.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_warnings_decay_and_expire() {
        let (mut world, _, mut rng) = setup();
        warn(&mut world, &mut rng, Side::Right);
        assert!(world.warnings[0].position.x > world.width - warning::EDGE_INSET - 1.0);

        for _ in 0..warning::DURATION_TICKS - 1 {
            decay_warnings(&mut world);
            assert!(world.warnings[0].opacity <= 1.0);
        }
        decay_warnings(&mut world);
        assert!(world.warnings.is_empty());
    }
}
