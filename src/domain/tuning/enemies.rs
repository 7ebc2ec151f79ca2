// Gameplay tuning for enemy kinds and spawn weighting.
//
// Keep this separate from runtime/server configuration (tick rates, buffer
// sizes, etc.).

use crate::domain::enemy::EnemyKind;

#[derive(Debug, Clone, Copy)]
pub struct KindTuning {
    /// Advance speed toward the baseline in arena units per second.
    pub speed: f32,

    /// Score for a full-word kill, before the typing-speed bonus.
    pub base_points: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct EnemyTuning {
    pub basic: KindTuning,
    pub fast: KindTuning,
    pub fastest: KindTuning,

    /// Probability of a basic spawn once faster kinds are unlocked.
    pub basic_weight: f32,

    /// Probability of a fast spawn; the remainder goes to the fastest kind.
    pub fast_weight: f32,

    /// Basic kills required before the faster kinds start spawning.
    pub unlock_after_basic_kills: u32,
}

impl EnemyTuning {
    pub fn kind(&self, kind: EnemyKind) -> KindTuning {
        match kind {
            EnemyKind::Basic => self.basic,
            EnemyKind::Fast => self.fast,
            EnemyKind::Fastest => self.fastest,
        }
    }
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            basic: KindTuning {
                speed: 20.0,
                base_points: 100,
            },
            fast: KindTuning {
                speed: 40.0,
                base_points: 300,
            },
            fastest: KindTuning {
                speed: 60.0,
                base_points: 500,
            },
            basic_weight: 0.40,
            fast_weight: 0.45,
            unlock_after_basic_kills: 5,
        }
    }
}
