// Spawn policy: cadence-driven enemy creation with escalating difficulty.

use std::time::Instant;

use rand::Rng;

use crate::domain::enemy::{EnemyKind, EnemyOrigin};
use crate::domain::registry::EnemyRegistry;
use crate::domain::tuning::{EnemyTuning, MatchTuning};
use crate::domain::words::WordPool;

/// Picks a lane at least `min_lane_separation` away from every occupied
/// lane, sampling up to `lane_attempts` candidates. When no candidate
/// qualifies, the last sample is used anyway: crowding degrades placement,
/// never the spawn itself.
pub fn pick_lane(occupied: &[f32], rng: &mut impl Rng, rules: &MatchTuning) -> f32 {
    let mut lane = rules.lane_min;
    for _ in 0..rules.lane_attempts {
        lane = rng.gen_range(rules.lane_min..=rules.lane_max);
        if occupied
            .iter()
            .all(|other| (other - lane).abs() >= rules.min_lane_separation)
        {
            return lane;
        }
    }
    lane
}

/// Chooses the kind for the next spawn. Early in a match only basic enemies
/// appear; once enough basic kills have been scored, the faster kinds mix
/// in by weighted probability.
pub fn pick_kind(basic_kills: u32, rng: &mut impl Rng, tuning: &EnemyTuning) -> EnemyKind {
    if basic_kills < tuning.unlock_after_basic_kills {
        return EnemyKind::Basic;
    }
    let roll: f32 = rng.r#gen();
    if roll < tuning.basic_weight {
        EnemyKind::Basic
    } else if roll < tuning.basic_weight + tuning.fast_weight {
        EnemyKind::Fast
    } else {
        EnemyKind::Fastest
    }
}

/// One spawn-cadence decision. Returns the new enemy's id, or None when the
/// word pool had nothing left to assign this tick.
pub fn spawn_tick(
    registry: &mut EnemyRegistry,
    pool: &mut WordPool,
    basic_kills: u32,
    rng: &mut impl Rng,
    enemies: &EnemyTuning,
    rules: &MatchTuning,
    now: Instant,
) -> Option<u64> {
    let word = pool.draw(rng)?;
    let occupied: Vec<f32> = registry.iter().map(|e| e.lane).collect();
    let lane = pick_lane(&occupied, rng, rules);
    let kind = pick_kind(basic_kills, rng, enemies);
    Some(registry.spawn(word, kind, EnemyOrigin::Local, lane, now))
}
