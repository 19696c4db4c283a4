//! ECLSS Core - Life-Support Anomaly Engine
//!
//! Holds the single shared simulation behind one mutex and exposes the game
//! operations: read metrics, describe the active anomaly, list recommended
//! actions and judge a submitted action. Rules live in `eclss-logic`; this
//! crate owns state, time and respawn scheduling.
//!
//! # Example
//!
//! ```rust,no_run
//! use eclss_core::prelude::*;
//!
//! // Shared engine with its respawn ticker already running
//! let engine = AnomalyEngine::start(EngineConfig::default());
//!
//! // First read of an episode samples and locks the anomalous metric
//! let readings = engine.current_readings();
//! let actions = engine.recommendations();
//!
//! if let Some(choice) = actions.first() {
//!     let _ = engine.submit_action(choice.id);
//! }
//! # let _ = readings;
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod state;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::EngineConfig;
    pub use crate::engine::{spawn_ticker, ActionOutcome, AnomalyEngine};
    pub use crate::state::StateSnapshot;
    pub use eclss_logic::anomaly::AnomalyKind;
    pub use eclss_logic::error::ActionError;
}
