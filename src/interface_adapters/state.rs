use std::sync::Arc;

use crate::interface_adapters::clients::scores::ScoreboardClient;
use crate::use_cases::session::MatchRegistry;

#[derive(Clone)]
pub struct AppState {
    // Active match sessions addressed by match id.
    pub registry: Arc<MatchRegistry>,
    // Match clients connect to when they don't name one.
    pub default_match_id: Arc<str>,
    // Fire-and-forget persistence boundary.
    pub scoreboard: Arc<ScoreboardClient>,
}
