// Wire protocol DTOs and conversions for the view-facing WebSocket.
// Peer-to-peer envelopes live in the pvp module, not here.

use serde::{Deserialize, Serialize};

use crate::domain::enemy::{EnemyKind, EnemySnapshot};
use crate::use_cases::types::{EndReason, MatchPhase, MatchSnapshot, Notification, PvpOutcome};

/// Messages the engine sends to a connected view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Identifies the match and the address used for peer pairing.
    Identity { match_id: String, chain_id: String },
    // Full read-only state, published after every mutation.
    Snapshot(MatchSnapshotDto),
    // Discrete events the view layers on top of snapshots.
    Notice(NoticeDto),
}

/// Messages a view sends to the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Begin the first run of this match.
    Start,
    // Begin a fresh run after (or during) a previous one.
    Restart,
    // The complete current input buffer, sent on every keystroke.
    Input(InputPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputPayload {
    #[serde(default)]
    pub text: String,
}

/// Snapshot of one match sent to views on every state change.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSnapshotDto {
    pub generation: u64,
    pub phase: PhaseDto,
    pub time_remaining: u32,
    pub health: u32,
    pub score: u64,
    pub best_wpm: u32,
    pub input: String,
    pub enemies: Vec<EnemyStateDto>,
    pub peer_score: Option<u64>,
    pub outcome: Option<OutcomeDto>,
}

impl From<MatchSnapshot> for MatchSnapshotDto {
    fn from(snapshot: MatchSnapshot) -> Self {
        Self {
            generation: snapshot.generation,
            phase: snapshot.phase.into(),
            time_remaining: snapshot.time_remaining,
            health: snapshot.health,
            score: snapshot.score,
            best_wpm: snapshot.best_wpm,
            input: snapshot.input,
            enemies: snapshot.enemies.iter().map(EnemyStateDto::from).collect(),
            peer_score: snapshot.peer_score,
            outcome: snapshot.outcome.map(OutcomeDto::from),
        }
    }
}

/// Flattened enemy state for wire transmission in snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct EnemyStateDto {
    pub id: u64,
    pub word: String,
    pub kind: KindDto,
    pub position: f32,
    pub lane: f32,
    pub health_percent: f32,
}

impl From<&EnemySnapshot> for EnemyStateDto {
    fn from(enemy: &EnemySnapshot) -> Self {
        Self {
            id: enemy.id,
            word: enemy.word.clone(),
            kind: enemy.kind.into(),
            position: enemy.position,
            lane: enemy.lane,
            health_percent: enemy.health_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDto {
    Basic,
    Fast,
    Fastest,
}

impl From<EnemyKind> for KindDto {
    fn from(kind: EnemyKind) -> Self {
        match kind {
            EnemyKind::Basic => KindDto::Basic,
            EnemyKind::Fast => KindDto::Fast,
            EnemyKind::Fastest => KindDto::Fastest,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum PhaseDto {
    NotStarted,
    Running,
    Ended,
}

impl From<MatchPhase> for PhaseDto {
    fn from(phase: MatchPhase) -> Self {
        match phase {
            MatchPhase::NotStarted => PhaseDto::NotStarted,
            MatchPhase::Running => PhaseDto::Running,
            MatchPhase::Ended => PhaseDto::Ended,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum OutcomeDto {
    Won,
    Lost,
    Draw,
}

impl From<PvpOutcome> for OutcomeDto {
    fn from(outcome: PvpOutcome) -> Self {
        match outcome {
            PvpOutcome::Won => OutcomeDto::Won,
            PvpOutcome::Lost => OutcomeDto::Lost,
            PvpOutcome::Draw => OutcomeDto::Draw,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum ReasonDto {
    TimeUp,
    HealthDepleted,
    PeerFinished,
}

impl From<EndReason> for ReasonDto {
    fn from(reason: EndReason) -> Self {
        match reason {
            EndReason::TimeUp => ReasonDto::TimeUp,
            EndReason::HealthDepleted => ReasonDto::HealthDepleted,
            EndReason::PeerFinished => ReasonDto::PeerFinished,
        }
    }
}

/// Discrete notifications sent to views between snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum NoticeDto {
    ScoreUpdate { points: u64 },
    WpmUpdate { wpm: u32 },
    EnemyReachedBottom,
    GameOver { score: u64, reason: ReasonDto },
}

impl From<Notification> for NoticeDto {
    fn from(notice: Notification) -> Self {
        match notice {
            Notification::ScoreUpdate { points } => NoticeDto::ScoreUpdate { points },
            Notification::WpmUpdate { wpm } => NoticeDto::WpmUpdate { wpm },
            Notification::EnemyReachedBottom => NoticeDto::EnemyReachedBottom,
            Notification::GameOver { score, reason } => NoticeDto::GameOver {
                score,
                reason: reason.into(),
            },
        }
    }
}
