// Domain-level enemy types shared across the simulation.

use std::time::Instant;

/// Behavior tag for an enemy. Per-kind speed and scoring live in
/// [`crate::domain::tuning::EnemyTuning`]; the variant carries no data so
/// tuning stays adjustable without touching live entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Basic,
    Fast,
    Fastest,
}

/// Where an enemy came from. Remote enemies were spawned from a peer
/// message and are never mirrored back to the peer on kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u64,
    /// Lowercase word bound to this enemy for its whole lifetime.
    pub word: String,
    pub kind: EnemyKind,
    pub origin: EnemyOrigin,
    /// Distance traveled toward the baseline since spawn.
    pub position: f32,
    /// Fixed horizontal placement in percent; used only for spawn spacing.
    pub lane: f32,
    /// 100 at spawn, 0 exactly when the full word has been typed.
    pub health_percent: f32,
    pub spawned_at: Instant,
}

/// Read-only copy of an enemy for snapshots handed to the view layer.
#[derive(Debug, Clone)]
pub struct EnemySnapshot {
    pub id: u64,
    pub word: String,
    pub kind: EnemyKind,
    pub position: f32,
    pub lane: f32,
    pub health_percent: f32,
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.id,
            word: e.word.clone(),
            kind: e.kind,
            position: e.position,
            lane: e.lane,
            health_percent: e.health_percent,
        }
    }
}
