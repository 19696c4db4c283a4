//! Anomaly engine - main entry point for the life-support game.
//!
//! One engine instance holds the whole simulation behind a single mutex.
//! Each public operation takes the mutex exactly once, so sampling a lock
//! and resolving an action can never interleave with another request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eclss_logic::anomaly::AnomalyKind;
use eclss_logic::error::ActionError;
use eclss_logic::metrics::{generate_baseline_readings, Readings};
use eclss_logic::resolution::{
    failure_message, judge_action, pick_fact, resolution_message, Verdict,
};
use eclss_logic::view::{anomaly_view, solution_views, AnomalyView, SolutionView};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::state::{SimulationState, StateSnapshot};

/// Result of a judged action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The anomaly is fixed and a respawn is scheduled.
    Resolved {
        anomaly: AnomalyKind,
        message: String,
        nasa_fact: &'static str,
    },
    /// Wrong call; the anomaly and its lock are untouched.
    Failed {
        anomaly: AnomalyKind,
        message: String,
    },
}

pub struct AnomalyEngine<C: Clock = SystemClock> {
    config: EngineConfig,
    clock: C,
    state: Mutex<SimulationState>,
}

impl AnomalyEngine<SystemClock> {
    /// Create an engine on the wall clock.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }

    /// Create a shared wall-clock engine with its respawn ticker running.
    pub fn start(config: EngineConfig) -> Arc<Self> {
        Self::start_with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> AnomalyEngine<C> {
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = SimulationState::new(config.initial_anomaly, rng);
        log::info!(
            "Anomaly engine started: initial={:?} respawn_delay={}s",
            config.initial_anomaly,
            config.respawn_delay_secs
        );
        Self {
            config,
            clock,
            state: Mutex::new(state),
        }
    }

    /// Wrap the engine in an `Arc` and spawn a ticker at the configured
    /// `ticker_interval_ms`. The ticker stops when the last handle is dropped.
    pub fn start_with_clock(config: EngineConfig, clock: C) -> Arc<Self>
    where
        C: 'static,
    {
        let engine = Arc::new(Self::with_clock(config, clock));
        let interval = engine.config().ticker_interval();
        spawn_ticker(&engine, interval);
        log::debug!("Respawn ticker running every {:?}", interval);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // State is plain data and every mutation completes before unlocking,
    // so a poisoned guard is still consistent.
    fn lock_state(&self) -> MutexGuard<'_, SimulationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_respawn(&self, state: &mut SimulationState) -> Option<AnomalyKind> {
        let spawned = state.apply_due_respawn(self.clock.now());
        if let Some(kind) = spawned {
            log::info!(
                "[SIMULATION] New anomaly triggered: {} (episode {})",
                kind,
                state.episode
            );
        }
        spawned
    }

    /// Lock the state with any due respawn already applied.
    fn current_state(&self) -> MutexGuard<'_, SimulationState> {
        let mut state = self.lock_state();
        self.apply_respawn(&mut state);
        state
    }

    /// Fresh readings for every metric, with the active anomaly's metric
    /// replaced by its locked sample. The first call of an episode samples.
    pub fn current_readings(&self) -> Readings {
        let mut state = self.current_state();
        let mut readings = generate_baseline_readings(&mut state.rng);
        if let Some(lock) = state.ensure_lock() {
            lock.apply(&mut readings);
        }
        readings
    }

    /// The active anomaly rendered for the alert panel, or `None` if quiet.
    ///
    /// Never samples: until [`current_readings`](Self::current_readings) has
    /// run for this episode, a thermal anomaly has no priority or answer.
    pub fn active_anomaly_info(&self) -> Option<AnomalyView> {
        let state = self.current_state();
        let kind = state.active?;
        Some(anomaly_view(kind.definition(), state.lock.as_ref()))
    }

    pub fn recommendations(&self) -> Vec<SolutionView> {
        let state = self.current_state();
        match state.active {
            Some(kind) => solution_views(kind.definition(), state.lock.as_ref()),
            None => Vec::new(),
        }
    }

    /// Judge a player action against the active anomaly.
    pub fn submit_action(&self, action_id: i64) -> Result<ActionOutcome, ActionError> {
        let mut state = self.current_state();
        let kind = state.active.ok_or(ActionError::NoActiveAnomaly)?;

        let verdict = judge_action(kind.definition(), state.lock.as_ref(), action_id)
            .map_err(|e| {
                log::debug!("Rejected action {} against {}: {}", action_id, kind, e);
                e
            })?;

        match verdict {
            Verdict::Correct => {
                let now = self.clock.now();
                state.resolve(now, self.config.respawn_delay());
                let nasa_fact = pick_fact(&mut state.rng);
                log::info!(
                    "Anomaly {} resolved by action {}; respawn in {}s",
                    kind,
                    action_id,
                    self.config.respawn_delay_secs
                );
                Ok(ActionOutcome::Resolved {
                    anomaly: kind,
                    message: resolution_message(kind),
                    nasa_fact,
                })
            }
            Verdict::Incorrect { label } => {
                log::debug!("Action {} ({}) failed against {}", action_id, label, kind);
                Ok(ActionOutcome::Failed {
                    anomaly: kind,
                    message: failure_message(label, kind),
                })
            }
        }
    }

    /// Current anomaly, after applying any due respawn.
    pub fn active_anomaly(&self) -> Option<AnomalyKind> {
        self.current_state().active
    }

    /// Apply a due respawn. Returns the kind that spawned, if any.
    pub fn tick(&self) -> Option<AnomalyKind> {
        let mut state = self.lock_state();
        self.apply_respawn(&mut state)
    }

    /// Activate a specific anomaly now, discarding any current lock.
    ///
    /// An armed respawn is left in place and will overwrite this when due.
    pub fn force_anomaly(&self, kind: AnomalyKind) {
        let mut state = self.current_state();
        Self::force(&mut state, kind);
    }

    /// Activate a uniformly random anomaly now.
    pub fn trigger_random_anomaly(&self) -> AnomalyKind {
        let mut state = self.current_state();
        let kind = state.random_kind();
        Self::force(&mut state, kind);
        kind
    }

    fn force(state: &mut SimulationState, kind: AnomalyKind) {
        if state.respawn_due.is_some() {
            log::warn!(
                "Forcing {} while a respawn is pending; the respawn will replace it",
                kind
            );
        }
        state.activate(kind);
        log::info!("Anomaly {} forced (episode {})", kind, state.episode);
    }

    /// Raw state copy. Does not apply a due respawn.
    pub fn snapshot(&self) -> StateSnapshot {
        self.lock_state().snapshot()
    }
}

/// Spawn a background thread that calls [`AnomalyEngine::tick`] every
/// `interval`, so respawns fire with no request in flight.
///
/// The thread holds only a weak handle and exits once the engine is dropped.
pub fn spawn_ticker<C>(engine: &Arc<AnomalyEngine<C>>, interval: Duration) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    let weak: Weak<AnomalyEngine<C>> = Arc::downgrade(engine);
    thread::spawn(move || loop {
        thread::sleep(interval);
        match weak.upgrade() {
            Some(engine) => {
                engine.tick();
            }
            None => break,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use eclss_logic::metrics::{MetricKind, MetricStatus};

    fn engine(initial: Option<AnomalyKind>) -> AnomalyEngine<ManualClock> {
        let config = EngineConfig {
            initial_anomaly: initial,
            seed: Some(42),
            ..Default::default()
        };
        AnomalyEngine::with_clock(config, ManualClock::new())
    }

    #[test]
    fn test_engine_starts_in_co2() {
        let engine = AnomalyEngine::with_clock(EngineConfig::default(), ManualClock::new());
        assert_eq!(engine.active_anomaly(), Some(AnomalyKind::Co2));
        assert!(engine.snapshot().lock.is_none());
    }

    #[test]
    fn test_first_read_locks_co2() {
        let engine = engine(Some(AnomalyKind::Co2));
        let first = engine.current_readings();
        let co2 = &first[&MetricKind::CarbonDioxide];
        assert_eq!(co2.status, MetricStatus::Caution);
        assert!((0.45..=0.65).contains(&co2.value));

        let second = engine.current_readings();
        assert_eq!(second[&MetricKind::CarbonDioxide], *co2);
        assert!(engine.snapshot().lock.is_some());
    }

    #[test]
    fn test_quiet_engine_serves_baseline() {
        let engine = engine(None);
        let readings = engine.current_readings();
        assert!(readings.values().all(|r| r.status == MetricStatus::Nominal));
        assert!(engine.active_anomaly_info().is_none());
        assert!(engine.recommendations().is_empty());
        assert_eq!(engine.submit_action(1), Err(ActionError::NoActiveAnomaly));
    }

    #[test]
    fn test_correct_action_resolves() {
        let engine = engine(Some(AnomalyKind::Co2));
        engine.current_readings();

        let outcome = engine.submit_action(1).unwrap();
        match outcome {
            ActionOutcome::Resolved {
                anomaly, message, ..
            } => {
                assert_eq!(anomaly, AnomalyKind::Co2);
                assert!(message.contains("'CO2'"));
            }
            other => panic!("expected resolution, got {:?}", other),
        }
        assert_eq!(engine.active_anomaly(), None);
        assert!(engine.active_anomaly_info().is_none());
        assert_eq!(engine.submit_action(1), Err(ActionError::NoActiveAnomaly));
    }

    #[test]
    fn test_wrong_action_keeps_lock() {
        let engine = engine(Some(AnomalyKind::Co2));
        engine.current_readings();
        let before = engine.snapshot();

        let outcome = engine.submit_action(2).unwrap();
        assert!(matches!(
            outcome,
            ActionOutcome::Failed {
                anomaly: AnomalyKind::Co2,
                ..
            }
        ));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_unknown_action_is_error() {
        let engine = engine(Some(AnomalyKind::Pressure));
        engine.current_readings();
        let before = engine.snapshot();
        assert_eq!(
            engine.submit_action(12),
            Err(ActionError::UnknownActionId(12))
        );
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_respawn_after_delay() {
        let engine = engine(Some(AnomalyKind::Co2));
        engine.current_readings();
        engine.submit_action(1).unwrap();

        engine.clock().advance_secs(19.0);
        assert_eq!(engine.active_anomaly(), None);

        engine.clock().advance_secs(1.0);
        assert!(engine.active_anomaly().is_some());
        let snapshot = engine.snapshot();
        assert!(snapshot.lock.is_none());
        assert_eq!(snapshot.respawn_due, None);
        assert_eq!(snapshot.episode, 2);
    }

    #[test]
    fn test_tick_applies_respawn() {
        let engine = engine(Some(AnomalyKind::Co2));
        engine.submit_action(1).unwrap();
        assert_eq!(engine.tick(), None);

        engine.clock().advance_secs(20.0);
        let spawned = engine.tick();
        assert!(spawned.is_some());
        assert_eq!(engine.snapshot().active, spawned);
    }

    #[test]
    fn test_force_anomaly_clears_lock() {
        let engine = engine(Some(AnomalyKind::Co2));
        engine.current_readings();
        engine.force_anomaly(AnomalyKind::Temp);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.active, Some(AnomalyKind::Temp));
        assert!(snapshot.lock.is_none());
    }

    #[test]
    fn test_forced_anomaly_overwritten_by_pending_respawn() {
        let engine = engine(Some(AnomalyKind::Co2));
        engine.submit_action(1).unwrap();
        engine.force_anomaly(AnomalyKind::Temp);
        let episode = engine.snapshot().episode;

        engine.clock().advance_secs(20.0);
        engine.tick();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.episode, episode + 1);
        assert!(snapshot.lock.is_none());
    }

    #[test]
    fn test_trigger_random_anomaly() {
        let engine = engine(None);
        let kind = engine.trigger_random_anomaly();
        assert_eq!(engine.active_anomaly(), Some(kind));
    }

    #[test]
    fn test_huge_delay_never_respawns() {
        let config = EngineConfig {
            seed: Some(4),
            respawn_delay_secs: 1e300,
            ..Default::default()
        };
        let engine = AnomalyEngine::with_clock(config, ManualClock::new());
        engine.current_readings();
        assert!(matches!(
            engine.submit_action(1),
            Ok(ActionOutcome::Resolved { .. })
        ));
        assert_eq!(engine.snapshot().respawn_due, Some(Duration::MAX));

        engine.clock().advance_secs(1e6);
        assert_eq!(engine.tick(), None);
    }

    #[test]
    fn test_start_uses_configured_ticker_interval() {
        let config = EngineConfig {
            seed: Some(6),
            respawn_delay_secs: 2.0,
            ticker_interval_ms: 1,
            ..Default::default()
        };
        let engine = AnomalyEngine::start_with_clock(config, ManualClock::new());
        assert_eq!(engine.config().ticker_interval(), Duration::from_millis(1));
        engine.submit_action(1).unwrap();
        engine.clock().advance_secs(2.0);

        let mut fired = false;
        for _ in 0..500 {
            if engine.snapshot().active.is_some() {
                fired = true;
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert!(fired, "started engine never respawned on its own");
    }

    #[test]
    fn test_ticker_fires_without_requests() {
        let config = EngineConfig {
            seed: Some(1),
            respawn_delay_secs: 1.0,
            ..Default::default()
        };
        let engine = Arc::new(AnomalyEngine::with_clock(config, ManualClock::new()));
        engine.submit_action(1).unwrap();
        engine.clock().advance_secs(1.0);

        let handle = spawn_ticker(&engine, Duration::from_millis(1));
        let mut fired = false;
        for _ in 0..500 {
            if engine.snapshot().active.is_some() {
                fired = true;
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert!(fired, "ticker never applied the respawn");

        drop(engine);
        handle.join().unwrap();
    }
}
