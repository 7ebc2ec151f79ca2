// Use-case level commands, events, and read models for the match loop.

use crate::domain::enemy::{EnemyKind, EnemySnapshot};

/// Commands from the view layer into a match.
#[derive(Debug, Clone)]
pub enum MatchCommand {
    Start,
    Restart,
    Input { text: String },
}

/// Conceptual peer messages exchanged between two paired matches. The wire
/// encoding lives in the adapter layer; delivery may duplicate or reorder,
/// so every handler is idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Join { chain: String },
    JoinAck { chain: String },
    EnemySpawn { word: String, kind: EnemyKind },
    MatchEnd { score: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    NotStarted,
    Running,
    Ended,
}

/// Which terminal condition ended the match; the first to fire wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    TimeUp,
    HealthDepleted,
    PeerFinished,
}

/// Head-to-head result once both final scores are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvpOutcome {
    Won,
    Lost,
    Draw,
}

/// Discrete events the view/audio layer reacts to, alongside snapshots.
#[derive(Debug, Clone)]
pub enum Notification {
    ScoreUpdate { points: u64 },
    WpmUpdate { wpm: u32 },
    EnemyReachedBottom,
    GameOver { score: u64, reason: EndReason },
}

/// Read-only view of one match, published after every mutation.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    /// Run counter; bumps on every start so stale artifacts are visible.
    pub generation: u64,
    pub phase: MatchPhase,
    pub time_remaining: u32,
    pub health: u32,
    pub score: u64,
    pub best_wpm: u32,
    pub input: String,
    pub enemies: Vec<EnemySnapshot>,
    pub peer_score: Option<u64>,
    pub outcome: Option<PvpOutcome>,
}

/// Side effects a state transition produced, drained by the match task.
#[derive(Debug, Clone)]
pub enum MatchOutput {
    Notice(Notification),
    PeerSend(PeerEvent),
}
