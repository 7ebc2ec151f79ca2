// Input resolution: prefix matching, partial damage, and kill scoring.

use std::time::{Duration, Instant};

use crate::domain::enemy::Enemy;
use crate::domain::registry::EnemyRegistry;
use crate::domain::tuning::EnemyTuning;

/// Result of matching one input state against the live enemies.
#[derive(Debug)]
pub enum InputOutcome {
    /// No live enemy word starts with the input, or the input was empty.
    None,
    /// A strict prefix matched; typing progress was recorded.
    Partial { id: u64, health_percent: f32 },
    /// The input spelled a full word; the enemy was removed for scoring.
    Kill { enemy: Enemy, wpm: u32, points: u64 },
}

/// Matches the current input against the registry and applies the result.
///
/// Matching is case-insensitive. When several live words share the typed
/// prefix, the earliest-spawned enemy wins, with id as the final tie-break,
/// so resolution is deterministic.
pub fn resolve_input(
    registry: &mut EnemyRegistry,
    input: &str,
    now: Instant,
    tuning: &EnemyTuning,
) -> InputOutcome {
    if input.is_empty() {
        // An empty input trivially prefixes every word; treat it as inert
        // instead of resetting every enemy's progress at once.
        return InputOutcome::None;
    }

    let needle = input.to_lowercase();
    let Some((id, word_len)) = registry
        .iter()
        .filter(|e| e.word.starts_with(&needle))
        .min_by(|a, b| a.spawned_at.cmp(&b.spawned_at).then(a.id.cmp(&b.id)))
        .map(|e| (e.id, e.word.chars().count()))
    else {
        return InputOutcome::None;
    };

    let typed = needle.chars().count();
    if typed < word_len {
        let health_percent = 100.0 * (word_len - typed) as f32 / word_len as f32;
        registry.apply_damage(id, health_percent);
        return InputOutcome::Partial { id, health_percent };
    }

    let Some(enemy) = registry.kill(id) else {
        return InputOutcome::None;
    };
    let wpm = words_per_minute(word_len, now.saturating_duration_since(enemy.spawned_at));
    let points = tuning.kind(enemy.kind).base_points + u64::from(wpm);
    InputOutcome::Kill { enemy, wpm, points }
}

/// Standard five-characters-per-word typing speed, rounded to the nearest
/// whole word per minute. The elapsed time is floored so a same-instant
/// kill cannot divide by zero.
fn words_per_minute(word_len: usize, elapsed: Duration) -> u32 {
    let secs = elapsed.as_secs_f64().max(0.001);
    ((word_len as f64 * 60.0) / (5.0 * secs)).round() as u32
}
