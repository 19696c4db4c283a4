//! Process-wide simulation state and its transitions.
//!
//! `SimulationState` is plain data owned by the engine behind a single
//! mutex. Every method here assumes the caller already holds that mutex.

use std::time::Duration;

use eclss_logic::anomaly::AnomalyKind;
use eclss_logic::sampling::{sample_anomaly, AnomalyLock};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

pub struct SimulationState {
    /// `None` means no anomaly is active.
    pub(crate) active: Option<AnomalyKind>,
    /// Frozen sample for the active episode, once the first read has taken it.
    pub(crate) lock: Option<AnomalyLock>,
    /// When the next anomaly spawns, measured on the engine clock.
    pub(crate) respawn_due: Option<Duration>,
    /// Incremented every time an anomaly becomes active.
    pub(crate) episode: u64,
    pub(crate) rng: StdRng,
}

/// Serializable copy of the state, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub active: Option<AnomalyKind>,
    pub lock: Option<AnomalyLock>,
    pub respawn_due: Option<Duration>,
    pub episode: u64,
}

impl SimulationState {
    pub fn new(initial: Option<AnomalyKind>, rng: StdRng) -> Self {
        Self {
            active: initial,
            lock: None,
            respawn_due: None,
            episode: u64::from(initial.is_some()),
            rng,
        }
    }

    /// Start a new episode of `kind` with an empty lock.
    pub fn activate(&mut self, kind: AnomalyKind) {
        self.active = Some(kind);
        self.lock = None;
        self.episode += 1;
    }

    pub fn random_kind(&mut self) -> AnomalyKind {
        let kinds = AnomalyKind::all();
        kinds[self.rng.gen_range(0..kinds.len())]
    }

    /// Return the episode's lock, sampling it first if this is the first read.
    pub fn ensure_lock(&mut self) -> Option<AnomalyLock> {
        let kind = self.active?;
        if self.lock.is_none() {
            let lock = sample_anomaly(kind.definition(), &mut self.rng);
            log::info!(
                "Episode {} ({}) locked: {} = {} {:?}",
                self.episode,
                kind,
                lock.metric,
                lock.value,
                lock.status
            );
            self.lock = Some(lock);
        }
        self.lock
    }

    /// Clear the active anomaly and arm the respawn deadline.
    pub fn resolve(&mut self, now: Duration, delay: Duration) {
        self.active = None;
        self.lock = None;
        self.respawn_due = Some(now.checked_add(delay).unwrap_or(Duration::MAX));
    }

    /// Fire the respawn if its deadline has passed. Returns the new kind.
    pub fn apply_due_respawn(&mut self, now: Duration) -> Option<AnomalyKind> {
        let due = self.respawn_due?;
        if now < due {
            return None;
        }
        self.respawn_due = None;
        let kind = self.random_kind();
        self.activate(kind);
        Some(kind)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            active: self.active,
            lock: self.lock,
            respawn_due: self.respawn_due,
            episode: self.episode,
        }
    }
}
