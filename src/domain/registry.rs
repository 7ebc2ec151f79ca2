// Authoritative collection of live enemies for one match.

use std::time::Instant;

use crate::domain::enemy::{Enemy, EnemyKind, EnemyOrigin, EnemySnapshot};
use crate::domain::tuning::EnemyTuning;

/// Owns every live enemy between spawn and removal.
///
/// An enemy leaves the registry exactly once, either through a full-word
/// kill or a baseline breach. Operations on absent ids are no-ops, so a
/// kill racing a breach on the same enemy resolves check-then-act: the
/// second mutation finds nothing and does nothing.
#[derive(Debug)]
pub struct EnemyRegistry {
    enemies: Vec<Enemy>,
    next_id: u64,
}

impl EnemyRegistry {
    pub fn new() -> Self {
        Self {
            enemies: Vec::new(),
            next_id: 1,
        }
    }

    /// Spawns a new enemy at the top of its lane and returns its id.
    pub fn spawn(
        &mut self,
        word: String,
        kind: EnemyKind,
        origin: EnemyOrigin,
        lane: f32,
        now: Instant,
    ) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.enemies.push(Enemy {
            id,
            word,
            kind,
            origin,
            position: 0.0,
            lane,
            health_percent: 100.0,
            spawned_at: now,
        });
        id
    }

    /// Advances every enemy by its kind speed, then removes and returns the
    /// enemies whose position reached the baseline. Each advance is computed
    /// from the pre-tick positions; no enemy's movement this tick affects
    /// another's.
    pub fn advance_all(&mut self, dt: f32, tuning: &EnemyTuning, baseline: f32) -> Vec<Enemy> {
        for e in &mut self.enemies {
            e.position += tuning.kind(e.kind).speed * dt;
        }

        let enemies = std::mem::take(&mut self.enemies);
        let (breached, alive) = enemies.into_iter().partition(|e| e.position >= baseline);
        self.enemies = alive;
        breached
    }

    /// Records typing progress on one enemy, clamped to [0, 100].
    pub fn apply_damage(&mut self, id: u64, health_percent: f32) {
        if let Some(e) = self.enemies.iter_mut().find(|e| e.id == id) {
            e.health_percent = health_percent.clamp(0.0, 100.0);
        }
    }

    /// Removes and returns an enemy for scoring. Absent ids return None.
    pub fn kill(&mut self, id: u64) -> Option<Enemy> {
        let index = self.enemies.iter().position(|e| e.id == id)?;
        Some(self.enemies.swap_remove(index))
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.enemies.iter().any(|e| e.word == word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter()
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    pub fn clear(&mut self) {
        self.enemies.clear();
    }

    pub fn snapshot(&self) -> Vec<EnemySnapshot> {
        self.enemies.iter().map(EnemySnapshot::from).collect()
    }
}

impl Default for EnemyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
