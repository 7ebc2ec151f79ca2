// Match state machine: budgets, phase transitions, and tick handlers.

use std::collections::HashSet;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::domain::enemy::{EnemyKind, EnemyOrigin};
use crate::domain::registry::EnemyRegistry;
use crate::domain::systems::typing::InputOutcome;
use crate::domain::systems::{spawning, typing};
use crate::domain::tuning::{EnemyTuning, MatchTuning};
use crate::domain::words::WordPool;
use crate::use_cases::types::{
    EndReason, MatchOutput, MatchPhase, MatchSnapshot, Notification, PeerEvent, PvpOutcome,
};

/// Which side of a head-to-head pairing this match plays. The joiner opens
/// the handshake; the host acknowledges it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvpRole {
    Host,
    Joiner,
}

#[derive(Debug, Clone)]
pub struct PvpSettings {
    /// Address used for this side in peer envelopes.
    pub local_chain: String,
    pub role: PvpRole,
}

/// Per-match configuration assembled by the session registry.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub rules: MatchTuning,
    pub enemies: EnemyTuning,
    pub dictionary: Vec<String>,
    pub pvp: Option<PvpSettings>,
}

/// Opponent bookkeeping for a head-to-head match.
#[derive(Debug)]
struct PvpSession {
    local_chain: String,
    role: PvpRole,
    peer_chain: Option<String>,
    peer_score: Option<u64>,
    /// Inbound spawn words already processed, guarding against duplicate
    /// delivery from the peer channel.
    seen_remote_words: HashSet<String>,
}

/// One match's entire mutable state.
///
/// Every method is synchronous; the match task owns an instance and
/// serializes all mutation through its event loop, so no handler ever
/// observes another handler mid-flight.
pub struct MatchCore {
    rules: MatchTuning,
    enemies: EnemyTuning,

    phase: MatchPhase,
    generation: u64,
    time_remaining: u32,
    health: u32,
    score: u64,
    best_wpm: u32,
    input: String,
    end_reason: Option<EndReason>,
    basic_kills: u32,

    registry: EnemyRegistry,
    pool: WordPool,
    rng: StdRng,
    pvp: Option<PvpSession>,

    outputs: Vec<MatchOutput>,
}

impl MatchCore {
    pub fn new(settings: MatchSettings, seed: u64) -> Self {
        let pool = WordPool::new(settings.dictionary, settings.rules.word_pool_size);
        let pvp = settings.pvp.map(|p| PvpSession {
            local_chain: p.local_chain,
            role: p.role,
            peer_chain: None,
            peer_score: None,
            seen_remote_words: HashSet::new(),
        });
        Self {
            rules: settings.rules,
            enemies: settings.enemies,
            phase: MatchPhase::NotStarted,
            generation: 0,
            time_remaining: 0,
            health: 0,
            score: 0,
            best_wpm: 0,
            input: String::new(),
            end_reason: None,
            basic_kills: 0,
            registry: EnemyRegistry::new(),
            pool,
            rng: StdRng::seed_from_u64(seed),
            pvp,
            outputs: Vec::new(),
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Starts a fresh run: resets every budget, clears the field, redraws
    /// the word pool, and bumps the generation so late artifacts of the
    /// previous run stay recognizable.
    pub fn start(&mut self) {
        self.generation += 1;
        self.phase = MatchPhase::Running;
        self.time_remaining = self.rules.time_budget_secs;
        self.health = self.rules.starting_health;
        self.score = 0;
        self.best_wpm = 0;
        self.input.clear();
        self.end_reason = None;
        self.basic_kills = 0;
        self.registry.clear();
        self.pool.reset(&mut self.rng);
        if let Some(pvp) = &mut self.pvp {
            pvp.peer_score = None;
            pvp.seen_remote_words.clear();
            if pvp.role == PvpRole::Joiner {
                let chain = pvp.local_chain.clone();
                self.outputs
                    .push(MatchOutput::PeerSend(PeerEvent::Join { chain }));
            }
        }
    }

    /// One second of countdown. The timeout path ends the match the moment
    /// the budget reaches zero.
    pub fn countdown_tick(&mut self) {
        if self.phase != MatchPhase::Running {
            return;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.end_match(EndReason::TimeUp);
        }
    }

    /// One spawn-cadence decision. An exhausted word pool skips the tick.
    pub fn spawn_tick(&mut self, now: Instant) {
        if self.phase != MatchPhase::Running {
            return;
        }
        if spawning::spawn_tick(
            &mut self.registry,
            &mut self.pool,
            self.basic_kills,
            &mut self.rng,
            &self.enemies,
            &self.rules,
            now,
        )
        .is_none()
        {
            debug!("word pool exhausted; skipping spawn");
        }
    }

    /// One motion step. Breaches in the same tick cost a single aggregated
    /// health deduction; each breach still raises its own notification.
    pub fn motion_tick(&mut self, dt: f32) {
        if self.phase != MatchPhase::Running {
            return;
        }
        let breached = self
            .registry
            .advance_all(dt, &self.enemies, self.rules.baseline);
        if breached.is_empty() {
            return;
        }
        for _ in &breached {
            self.outputs
                .push(MatchOutput::Notice(Notification::EnemyReachedBottom));
        }
        self.health = self.health.saturating_sub(breached.len() as u32);
        if self.health == 0 {
            self.end_match(EndReason::HealthDepleted);
        }
    }

    /// Applies a new input state from the view layer. Only a kill clears
    /// the buffer; unmatched input stays put.
    pub fn apply_input(&mut self, text: String, now: Instant) {
        if self.phase != MatchPhase::Running {
            return;
        }
        self.input = text;
        match typing::resolve_input(&mut self.registry, &self.input, now, &self.enemies) {
            InputOutcome::None | InputOutcome::Partial { .. } => {}
            InputOutcome::Kill { enemy, wpm, points } => {
                self.score += points;
                self.best_wpm = self.best_wpm.max(wpm);
                if enemy.kind == EnemyKind::Basic {
                    self.basic_kills += 1;
                }
                self.pool.release(&enemy.word);
                self.input.clear();
                self.outputs
                    .push(MatchOutput::Notice(Notification::ScoreUpdate { points }));
                self.outputs
                    .push(MatchOutput::Notice(Notification::WpmUpdate { wpm }));
                // Only locally spawned enemies are mirrored to the peer;
                // reflecting a remote one back would bounce forever.
                if self.pvp.is_some() && enemy.origin == EnemyOrigin::Local {
                    self.outputs
                        .push(MatchOutput::PeerSend(PeerEvent::EnemySpawn {
                            word: enemy.word.clone(),
                            kind: enemy.kind,
                        }));
                }
            }
        }
    }

    /// Handles one inbound peer message. Duplicate deliveries and messages
    /// arriving outside a running match degrade to no-ops.
    pub fn handle_peer_event(&mut self, event: PeerEvent, now: Instant) {
        let Some(pvp) = &mut self.pvp else {
            debug!("peer event for a solo match; dropping");
            return;
        };
        let mut peer_finished = false;
        match event {
            PeerEvent::Join { chain } => {
                pvp.peer_chain = Some(chain);
                let local = pvp.local_chain.clone();
                self.outputs
                    .push(MatchOutput::PeerSend(PeerEvent::JoinAck { chain: local }));
            }
            PeerEvent::JoinAck { chain } => {
                pvp.peer_chain = Some(chain);
            }
            PeerEvent::EnemySpawn { word, kind } => {
                if self.phase != MatchPhase::Running {
                    debug!(%word, "peer spawn outside a running match; dropping");
                    return;
                }
                let word = word.to_lowercase();
                if !pvp.seen_remote_words.insert(word.clone()) {
                    debug!(%word, "duplicate peer spawn; dropping");
                    return;
                }
                if self.registry.has_word(&word) {
                    return;
                }
                self.pool.reserve(&word);
                let occupied: Vec<f32> = self.registry.iter().map(|e| e.lane).collect();
                let lane = spawning::pick_lane(&occupied, &mut self.rng, &self.rules);
                self.registry
                    .spawn(word, kind, EnemyOrigin::Remote, lane, now);
            }
            PeerEvent::MatchEnd { score } => {
                pvp.peer_score = Some(score);
                peer_finished = true;
            }
        }
        // First side to finish ends both: force our own terminal transition
        // once the session borrow is released.
        if peer_finished && self.phase == MatchPhase::Running {
            self.end_match(EndReason::PeerFinished);
        }
    }

    /// Guarded terminal transition; the first condition to fire wins and
    /// repeats are no-ops.
    fn end_match(&mut self, reason: EndReason) {
        if self.phase == MatchPhase::Ended {
            return;
        }
        self.phase = MatchPhase::Ended;
        self.end_reason = Some(reason);
        self.outputs.push(MatchOutput::Notice(Notification::GameOver {
            score: self.score,
            reason,
        }));
        if self.pvp.is_some() {
            self.outputs
                .push(MatchOutput::PeerSend(PeerEvent::MatchEnd { score: self.score }));
        }
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Final result against the opponent, once both scores are known.
    pub fn pvp_outcome(&self) -> Option<PvpOutcome> {
        if self.phase != MatchPhase::Ended {
            return None;
        }
        let peer = self.pvp.as_ref()?.peer_score?;
        Some(match self.score.cmp(&peer) {
            std::cmp::Ordering::Greater => PvpOutcome::Won,
            std::cmp::Ordering::Less => PvpOutcome::Lost,
            std::cmp::Ordering::Equal => PvpOutcome::Draw,
        })
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            generation: self.generation,
            phase: self.phase,
            time_remaining: self.time_remaining,
            health: self.health,
            score: self.score,
            best_wpm: self.best_wpm,
            input: self.input.clone(),
            enemies: self.registry.snapshot(),
            peer_score: self.pvp.as_ref().and_then(|p| p.peer_score),
            outcome: self.pvp_outcome(),
        }
    }

    /// Drains the side effects accumulated since the last call.
    pub fn take_outputs(&mut self) -> Vec<MatchOutput> {
        std::mem::take(&mut self.outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(dictionary: &[&str]) -> MatchSettings {
        MatchSettings {
            rules: MatchTuning {
                word_pool_size: dictionary.len(),
                ..MatchTuning::default()
            },
            enemies: EnemyTuning::default(),
            dictionary: dictionary.iter().map(|w| w.to_string()).collect(),
            pvp: None,
        }
    }

    fn pvp_settings(dictionary: &[&str], role: PvpRole) -> MatchSettings {
        MatchSettings {
            pvp: Some(PvpSettings {
                local_chain: "chain-local".to_string(),
                role,
            }),
            ..settings(dictionary)
        }
    }

    fn started(settings: MatchSettings) -> MatchCore {
        let mut core = MatchCore::new(settings, 7);
        core.start();
        core.take_outputs();
        core
    }

    fn game_overs(outputs: &[MatchOutput]) -> usize {
        outputs
            .iter()
            .filter(|o| matches!(o, MatchOutput::Notice(Notification::GameOver { .. })))
            .count()
    }

    #[test]
    fn start_resets_budgets_and_bumps_the_generation() {
        let mut core = MatchCore::new(settings(&["cat", "dog"]), 7);
        assert_eq!(core.phase(), MatchPhase::NotStarted);

        core.start();
        let snap = core.snapshot();
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.phase, MatchPhase::Running);
        assert_eq!(snap.time_remaining, 60);
        assert_eq!(snap.health, 3);
        assert_eq!(snap.score, 0);
        assert!(snap.enemies.is_empty());

        core.spawn_tick(Instant::now());
        core.start();
        let snap = core.snapshot();
        assert_eq!(snap.generation, 2);
        assert!(snap.enemies.is_empty());
    }

    #[test]
    fn live_words_stay_unique_across_many_spawn_ticks() {
        let mut core = started(settings(&["cat", "dog", "owl", "fox", "bat"]));
        let now = Instant::now();
        for _ in 0..20 {
            core.spawn_tick(now);
        }
        let snap = core.snapshot();
        assert_eq!(snap.enemies.len(), 5);
        let mut words: Vec<&str> = snap.enemies.iter().map(|e| e.word.as_str()).collect();
        words.sort();
        words.dedup();
        assert_eq!(words.len(), 5);
    }

    #[test]
    fn a_timed_kill_scores_base_points_plus_wpm() {
        let mut core = started(settings(&["cat"]));
        let t0 = Instant::now();
        core.spawn_tick(t0);

        core.apply_input("cat".to_string(), t0 + Duration::from_secs(2));
        let snap = core.snapshot();
        assert_eq!(snap.score, 118);
        assert_eq!(snap.best_wpm, 18);
        assert!(snap.enemies.is_empty());
        assert_eq!(snap.input, "");

        let outputs = core.take_outputs();
        assert!(outputs.iter().any(|o| matches!(
            o,
            MatchOutput::Notice(Notification::ScoreUpdate { points: 118 })
        )));
        assert!(outputs.iter().any(|o| matches!(
            o,
            MatchOutput::Notice(Notification::WpmUpdate { wpm: 18 })
        )));
    }

    #[test]
    fn unmatched_input_keeps_the_buffer_and_the_enemies() {
        let mut core = started(settings(&["cat"]));
        let t0 = Instant::now();
        core.spawn_tick(t0);

        core.apply_input("zzz".to_string(), t0);
        let snap = core.snapshot();
        assert_eq!(snap.input, "zzz");
        assert_eq!(snap.enemies.len(), 1);
        assert_eq!(snap.score, 0);
    }

    #[test]
    fn simultaneous_breaches_floor_health_and_end_once() {
        let mut core = started(settings(&["cat", "dog", "owl", "fox", "bat"]));
        let now = Instant::now();
        for _ in 0..5 {
            core.spawn_tick(now);
        }

        // One giant step breaches all five at once; health is 3.
        core.motion_tick(1_000.0);
        let snap = core.snapshot();
        assert_eq!(snap.health, 0);
        assert_eq!(snap.phase, MatchPhase::Ended);
        assert_eq!(core.end_reason(), Some(EndReason::HealthDepleted));

        let outputs = core.take_outputs();
        assert_eq!(game_overs(&outputs), 1);
        let bottoms = outputs
            .iter()
            .filter(|o| matches!(o, MatchOutput::Notice(Notification::EnemyReachedBottom)))
            .count();
        assert_eq!(bottoms, 5);
    }

    #[test]
    fn timeout_wins_when_health_is_left() {
        let mut core = started(settings(&["cat", "dog"]));
        let now = Instant::now();
        core.spawn_tick(now);
        core.motion_tick(1_000.0);
        assert_eq!(core.snapshot().health, 2);

        for _ in 0..60 {
            core.countdown_tick();
        }
        assert_eq!(core.phase(), MatchPhase::Ended);
        assert_eq!(core.end_reason(), Some(EndReason::TimeUp));
        assert_eq!(game_overs(&core.take_outputs()), 1);
    }

    #[test]
    fn overlapping_end_conditions_fire_game_over_once() {
        let mut core = started(settings(&["cat", "dog", "owl"]));
        let now = Instant::now();
        for _ in 0..3 {
            core.spawn_tick(now);
        }

        // Drain the clock to one second, then satisfy both terminal paths
        // back to back as overlapping ticks would.
        for _ in 0..59 {
            core.countdown_tick();
        }
        core.motion_tick(1_000.0);
        core.countdown_tick();

        assert_eq!(core.phase(), MatchPhase::Ended);
        assert_eq!(core.end_reason(), Some(EndReason::HealthDepleted));
        assert_eq!(game_overs(&core.take_outputs()), 1);
    }

    #[test]
    fn nothing_mutates_after_the_match_ends() {
        let mut core = started(settings(&["cat", "dog"]));
        for _ in 0..60 {
            core.countdown_tick();
        }
        assert_eq!(core.phase(), MatchPhase::Ended);
        core.take_outputs();
        let before = core.snapshot();

        let now = Instant::now();
        core.spawn_tick(now);
        core.motion_tick(1_000.0);
        core.countdown_tick();
        core.apply_input("cat".to_string(), now);

        let after = core.snapshot();
        assert_eq!(after.generation, before.generation);
        assert_eq!(after.score, before.score);
        assert_eq!(after.health, before.health);
        assert_eq!(after.time_remaining, before.time_remaining);
        assert_eq!(after.enemies.len(), before.enemies.len());
        assert!(core.take_outputs().is_empty());
    }

    #[test]
    fn a_kill_racing_a_breach_is_a_noop() {
        let mut core = started(settings(&["cat"]));
        let t0 = Instant::now();
        core.spawn_tick(t0);
        core.motion_tick(1_000.0);
        assert_eq!(core.snapshot().health, 2);
        core.take_outputs();

        // The word was typed in the same window the enemy breached.
        core.apply_input("cat".to_string(), t0);
        assert_eq!(core.snapshot().score, 0);
        assert!(core.take_outputs().is_empty());
    }

    #[test]
    fn local_kills_are_mirrored_to_the_peer() {
        let mut core = started(pvp_settings(&["cat"], PvpRole::Host));
        let t0 = Instant::now();
        core.spawn_tick(t0);

        core.apply_input("cat".to_string(), t0 + Duration::from_secs(1));
        let outputs = core.take_outputs();
        assert!(outputs.iter().any(|o| matches!(
            o,
            MatchOutput::PeerSend(PeerEvent::EnemySpawn { word, .. }) if word == "cat"
        )));
    }

    #[test]
    fn remote_kills_are_not_sent_back() {
        let mut core = started(pvp_settings(&[], PvpRole::Host));
        let t0 = Instant::now();
        core.handle_peer_event(
            PeerEvent::EnemySpawn {
                word: "apple".to_string(),
                kind: EnemyKind::Basic,
            },
            t0,
        );
        assert_eq!(core.snapshot().enemies.len(), 1);
        core.take_outputs();

        core.apply_input("apple".to_string(), t0 + Duration::from_secs(1));
        let outputs = core.take_outputs();
        assert!(core.snapshot().score > 0);
        assert!(!outputs
            .iter()
            .any(|o| matches!(o, MatchOutput::PeerSend(PeerEvent::EnemySpawn { .. }))));
    }

    #[test]
    fn duplicate_peer_spawns_create_one_enemy() {
        let mut core = started(pvp_settings(&[], PvpRole::Host));
        let now = Instant::now();
        let spawn = PeerEvent::EnemySpawn {
            word: "apple".to_string(),
            kind: EnemyKind::Fast,
        };
        core.handle_peer_event(spawn.clone(), now);
        core.handle_peer_event(spawn, now);

        let snap = core.snapshot();
        assert_eq!(snap.enemies.len(), 1);
        assert_eq!(snap.enemies[0].word, "apple");
    }

    #[test]
    fn peer_match_end_forces_the_local_end() {
        let mut core = started(pvp_settings(&[], PvpRole::Host));
        core.handle_peer_event(PeerEvent::MatchEnd { score: 500 }, Instant::now());

        assert_eq!(core.phase(), MatchPhase::Ended);
        assert_eq!(core.end_reason(), Some(EndReason::PeerFinished));
        let snap = core.snapshot();
        assert_eq!(snap.peer_score, Some(500));
        assert_eq!(snap.outcome, Some(PvpOutcome::Lost));

        let outputs = core.take_outputs();
        assert_eq!(game_overs(&outputs), 1);
        assert!(outputs
            .iter()
            .any(|o| matches!(o, MatchOutput::PeerSend(PeerEvent::MatchEnd { score: 0 }))));
    }

    #[test]
    fn equal_final_scores_are_a_draw() {
        let mut core = started(pvp_settings(&[], PvpRole::Host));
        core.handle_peer_event(PeerEvent::MatchEnd { score: 0 }, Instant::now());
        assert_eq!(core.snapshot().outcome, Some(PvpOutcome::Draw));
    }

    #[test]
    fn the_joiner_opens_the_handshake_and_the_host_acks() {
        let mut joiner = MatchCore::new(pvp_settings(&[], PvpRole::Joiner), 7);
        joiner.start();
        let outputs = joiner.take_outputs();
        assert!(outputs.iter().any(|o| matches!(
            o,
            MatchOutput::PeerSend(PeerEvent::Join { chain }) if chain == "chain-local"
        )));

        let mut host = started(pvp_settings(&[], PvpRole::Host));
        host.handle_peer_event(
            PeerEvent::Join {
                chain: "chain-peer".to_string(),
            },
            Instant::now(),
        );
        let outputs = host.take_outputs();
        assert!(outputs.iter().any(|o| matches!(
            o,
            MatchOutput::PeerSend(PeerEvent::JoinAck { chain }) if chain == "chain-local"
        )));
    }

    #[test]
    fn restart_clears_the_peer_score_and_seen_words() {
        let mut core = started(pvp_settings(&[], PvpRole::Host));
        let now = Instant::now();
        core.handle_peer_event(
            PeerEvent::EnemySpawn {
                word: "apple".to_string(),
                kind: EnemyKind::Basic,
            },
            now,
        );
        core.handle_peer_event(PeerEvent::MatchEnd { score: 9 }, now);
        assert_eq!(core.phase(), MatchPhase::Ended);

        core.start();
        let snap = core.snapshot();
        assert_eq!(snap.peer_score, None);
        assert!(snap.enemies.is_empty());

        // The seen-set was cleared, so the same word spawns again.
        core.handle_peer_event(
            PeerEvent::EnemySpawn {
                word: "apple".to_string(),
                kind: EnemyKind::Basic,
            },
            now,
        );
        assert_eq!(core.snapshot().enemies.len(), 1);
    }
}
