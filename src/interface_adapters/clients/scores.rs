use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::use_cases::types::{MatchPhase, MatchSnapshot};

// Per-player aggregates maintained by the external scoreboard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub high_score: u64,
    pub total_games: u64,
}

#[derive(Debug, Serialize)]
struct SubmitScoreRequest {
    score: u64,
}

#[derive(Debug)]
pub enum ScoreboardError {
    UnknownPlayer,
    Rejected,
    UpstreamUnavailable,
}

// Thin reqwest client for the scoreboard/player-state service.
#[derive(Clone)]
pub struct ScoreboardClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScoreboardClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn fetch_player_state(&self, player: &str) -> Result<PlayerState, ScoreboardError> {
        let url = format!("{}/player/{}", self.base_url, player);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|_| ScoreboardError::UpstreamUnavailable)?;

        if response.status().is_success() {
            return response
                .json::<PlayerState>()
                .await
                .map_err(|_| ScoreboardError::UpstreamUnavailable);
        }
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ScoreboardError::UnknownPlayer);
        }
        Err(ScoreboardError::UpstreamUnavailable)
    }

    pub async fn submit_score(&self, player: &str, score: u64) -> Result<(), ScoreboardError> {
        let url = format!("{}/player/{}/score", self.base_url, player);
        let response = self
            .http
            .post(url)
            .json(&SubmitScoreRequest { score })
            .send()
            .await
            .map_err(|_| ScoreboardError::UpstreamUnavailable)?;

        if response.status().is_success() {
            Ok(())
        } else if response.status().is_client_error() {
            Err(ScoreboardError::Rejected)
        } else {
            Err(ScoreboardError::UpstreamUnavailable)
        }
    }
}

/// Watches a match and submits each finished run's score, once per
/// generation. Submission is fire-and-forget: failures are logged and the
/// match is never blocked or retried.
pub fn spawn_score_reporter(
    mut snapshot_rx: watch::Receiver<MatchSnapshot>,
    client: Arc<ScoreboardClient>,
    player: Arc<str>,
) {
    tokio::spawn(async move {
        let mut last_reported = 0u64;
        loop {
            let (ended, generation, score) = {
                let snapshot = snapshot_rx.borrow_and_update();
                (
                    snapshot.phase == MatchPhase::Ended,
                    snapshot.generation,
                    snapshot.score,
                )
            };
            if ended && generation != last_reported {
                last_reported = generation;
                match client.submit_score(&player, score).await {
                    Ok(()) => debug!(player = %player, score, "score submitted"),
                    Err(e) => warn!(player = %player, error = ?e, "score submission failed"),
                }
            }
            if snapshot_rx.changed().await.is_err() {
                break;
            }
        }
    });
}
