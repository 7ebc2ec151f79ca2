/// Gameplay tuning for the match itself: budgets, arena geometry, and
/// placement limits.

#[derive(Debug, Clone, Copy)]
pub struct MatchTuning {
    /// Match length in seconds.
    pub time_budget_secs: u32,

    /// Baseline breaches the player can absorb before losing.
    pub starting_health: u32,

    /// Distance from the spawn edge to the defense line in arena units.
    pub baseline: f32,

    /// Horizontal placement range in percent of the arena width.
    pub lane_min: f32,
    pub lane_max: f32,

    /// Minimum lane distance to every live enemy, in percent.
    pub min_lane_separation: f32,

    /// Placement samples before giving up and using the last candidate.
    pub lane_attempts: u32,

    /// Words drawn from the dictionary into the per-match working set.
    pub word_pool_size: usize,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            time_budget_secs: 60,
            starting_health: 3,
            baseline: 400.0,
            lane_min: 10.0,
            lane_max: 90.0,
            min_lane_separation: 12.0,
            lane_attempts: 30,
            word_pool_size: 24,
        }
    }
}
