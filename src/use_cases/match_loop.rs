// The per-match event loop: owns the tickers and serializes every mutation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::use_cases::match_core::MatchCore;
use crate::use_cases::types::{
    MatchCommand, MatchOutput, MatchPhase, MatchSnapshot, Notification, PeerEvent,
};

/// Cadences for the three periodic tickers a running match owns.
#[derive(Debug, Clone, Copy)]
pub struct MatchSchedule {
    pub countdown: Duration,
    pub spawn: Duration,
    pub motion: Duration,
}

/// Channel endpoints wiring one match task to the rest of the process.
pub struct MatchChannels {
    pub command_rx: mpsc::Receiver<MatchCommand>,
    /// Inbound peer events; a transport pushes decoded messages here.
    pub peer_rx: mpsc::Receiver<PeerEvent>,
    /// Outbound peer events; drained by a transport relay when paired.
    pub peer_tx: mpsc::Sender<PeerEvent>,
    pub snapshot_tx: watch::Sender<MatchSnapshot>,
    pub notice_tx: broadcast::Sender<Notification>,
    pub shutdown: Arc<tokio::sync::Notify>,
}

enum Idle {
    Start,
    Quit,
}

enum RunExit {
    Ended,
    Restarted,
    Quit,
}

/// Drives one match for its whole lifetime: idle until a start command,
/// run until a terminal condition, then idle again awaiting a restart.
///
/// The tickers live inside the running phase only. They are created fresh
/// on every start and dropped the moment the run ends, so a finished match
/// cannot be mutated by a late-firing timer and restarts never stack a
/// second set of tickers on top of a stale one.
pub async fn match_task(mut core: MatchCore, mut ch: MatchChannels, schedule: MatchSchedule) {
    let mut pending_start = false;
    loop {
        if !pending_start && matches!(idle_until_start(&mut core, &mut ch).await, Idle::Quit) {
            break;
        }
        pending_start = false;

        core.start();
        flush(&mut core, &ch);
        info!(generation = core.generation(), "match run started");

        match run_until_end(&mut core, &mut ch, schedule).await {
            RunExit::Ended => {
                info!(
                    generation = core.generation(),
                    score = core.score(),
                    "match run ended"
                );
            }
            RunExit::Restarted => pending_start = true,
            RunExit::Quit => break,
        }
    }
    debug!("match task exiting");
}

async fn idle_until_start(core: &mut MatchCore, ch: &mut MatchChannels) -> Idle {
    loop {
        tokio::select! {
            _ = ch.shutdown.notified() => return Idle::Quit,
            cmd = ch.command_rx.recv() => match cmd {
                Some(MatchCommand::Start | MatchCommand::Restart) => return Idle::Start,
                Some(MatchCommand::Input { .. }) => debug!("input outside a run; ignoring"),
                None => return Idle::Quit,
            },
            ev = ch.peer_rx.recv() => match ev {
                Some(ev) => {
                    core.handle_peer_event(ev, Instant::now());
                    flush(core, ch);
                }
                None => return Idle::Quit,
            },
        }
    }
}

async fn run_until_end(
    core: &mut MatchCore,
    ch: &mut MatchChannels,
    schedule: MatchSchedule,
) -> RunExit {
    let started = tokio::time::Instant::now();
    let mut countdown = tokio::time::interval_at(started + schedule.countdown, schedule.countdown);
    let mut spawn = tokio::time::interval_at(started + schedule.spawn, schedule.spawn);
    let mut motion = tokio::time::interval_at(started + schedule.motion, schedule.motion);
    // A stalled loop must not replay its missed ticks as a burst.
    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
    spawn.set_missed_tick_behavior(MissedTickBehavior::Delay);
    motion.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let dt = schedule.motion.as_secs_f32();

    loop {
        tokio::select! {
            _ = ch.shutdown.notified() => return RunExit::Quit,
            _ = countdown.tick() => core.countdown_tick(),
            _ = spawn.tick() => core.spawn_tick(Instant::now()),
            _ = motion.tick() => core.motion_tick(dt),
            cmd = ch.command_rx.recv() => match cmd {
                Some(MatchCommand::Input { text }) => core.apply_input(text, Instant::now()),
                Some(MatchCommand::Restart) => return RunExit::Restarted,
                Some(MatchCommand::Start) => debug!("start while running; ignoring"),
                None => return RunExit::Quit,
            },
            ev = ch.peer_rx.recv() => match ev {
                Some(ev) => core.handle_peer_event(ev, Instant::now()),
                None => return RunExit::Quit,
            },
        }

        flush(core, ch);
        if core.phase() == MatchPhase::Ended {
            return RunExit::Ended;
        }
    }
}

/// Publishes pending side effects and the fresh snapshot. Peer sends are
/// fire-and-forget: a full or missing transport is logged, never awaited.
fn flush(core: &mut MatchCore, ch: &MatchChannels) {
    for output in core.take_outputs() {
        match output {
            MatchOutput::Notice(notice) => {
                // Send only fails when no view is subscribed right now.
                let _ = ch.notice_tx.send(notice);
            }
            MatchOutput::PeerSend(event) => match ch.peer_tx.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(ev)) => {
                    tracing::warn!(?ev, "peer channel full; dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(ev)) => {
                    debug!(?ev, "no peer transport attached; dropping message");
                }
            },
        }
    }
    ch.snapshot_tx.send_replace(core.snapshot());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::{EnemyTuning, MatchTuning};
    use crate::use_cases::match_core::MatchSettings;
    use crate::use_cases::types::EndReason;

    struct Harness {
        command_tx: mpsc::Sender<MatchCommand>,
        snapshot_rx: watch::Receiver<MatchSnapshot>,
        notice_rx: broadcast::Receiver<Notification>,
        // Held so the task's peer channels stay open for its lifetime.
        _peer_in_tx: mpsc::Sender<PeerEvent>,
        _peer_out_rx: mpsc::Receiver<PeerEvent>,
        _shutdown: Arc<tokio::sync::Notify>,
    }

    fn harness() -> Harness {
        let settings = MatchSettings {
            rules: MatchTuning {
                // Keep the field breach-free so only the clock can end runs.
                baseline: 1_000_000.0,
                ..MatchTuning::default()
            },
            enemies: EnemyTuning::default(),
            dictionary: crate::domain::words::WordPool::default_dictionary(),
            pvp: None,
        };
        let core = MatchCore::new(settings, 7);

        let (command_tx, command_rx) = mpsc::channel(16);
        let (peer_in_tx, peer_rx) = mpsc::channel(16);
        let (peer_tx, peer_out_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(core.snapshot());
        let (notice_tx, notice_rx) = broadcast::channel(256);
        let shutdown = Arc::new(tokio::sync::Notify::new());

        tokio::spawn(match_task(
            core,
            MatchChannels {
                command_rx,
                peer_rx,
                peer_tx,
                snapshot_tx,
                notice_tx,
                shutdown: shutdown.clone(),
            },
            MatchSchedule {
                countdown: Duration::from_secs(1),
                spawn: Duration::from_secs(2),
                motion: Duration::from_millis(50),
            },
        ));

        Harness {
            command_tx,
            snapshot_rx,
            notice_rx,
            _peer_in_tx: peer_in_tx,
            _peer_out_rx: peer_out_rx,
            _shutdown: shutdown,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn a_full_run_times_out_and_then_stands_still() {
        let mut h = harness();

        h.command_tx.send(MatchCommand::Start).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        let ended = h.snapshot_rx.borrow().clone();
        assert_eq!(ended.phase, MatchPhase::Ended);
        assert_eq!(ended.time_remaining, 0);
        assert_eq!(ended.generation, 1);

        // The run's tickers are gone: another minute changes nothing.
        tokio::time::sleep(Duration::from_secs(60)).await;
        let later = h.snapshot_rx.borrow().clone();
        assert_eq!(later.phase, MatchPhase::Ended);
        assert_eq!(later.enemies.len(), ended.enemies.len());
        assert_eq!(later.score, ended.score);

        let mut game_overs = 0;
        while let Ok(notice) = h.notice_rx.try_recv() {
            if matches!(
                notice,
                Notification::GameOver {
                    reason: EndReason::TimeUp,
                    ..
                }
            ) {
                game_overs += 1;
            }
        }
        assert_eq!(game_overs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn enemies_spawn_on_the_spawn_cadence() {
        let h = harness();

        h.command_tx.send(MatchCommand::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(4_100)).await;

        let snap = h.snapshot_rx.borrow().clone();
        assert_eq!(snap.phase, MatchPhase::Running);
        assert_eq!(snap.enemies.len(), 2);
        assert_eq!(snap.time_remaining, 56);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_begins_a_fresh_generation() {
        let h = harness();

        h.command_tx.send(MatchCommand::Start).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        h.command_tx.send(MatchCommand::Restart).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snap = h.snapshot_rx.borrow().clone();
        assert_eq!(snap.generation, 2);
        assert_eq!(snap.phase, MatchPhase::Running);
        assert_eq!(snap.time_remaining, 60);
        assert!(snap.enemies.is_empty());
    }
}
