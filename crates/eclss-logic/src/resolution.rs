//! Action judging: whether a submitted solution fixes the active anomaly.
//!
//! Pure: takes the active definition and lock, returns a verdict. State
//! transitions (clearing the lock, scheduling respawn) belong to the engine.

use rand::Rng;

use crate::anomaly::{AnomalyDefinition, AnomalyKind};
use crate::error::ActionError;
use crate::sampling::AnomalyLock;
use crate::view::solution_views;

/// Facts handed out with a successful fix.
pub const NASA_FACTS: [&str; 3] = [
    "Every kilogram of CO₂ removed saves 1 kg of lithium hydroxide on resupply missions.",
    "Cabin pressure is maintained using nitrogen (N₂) and oxygen (O₂).",
    "The ATCS uses water-based loops to cool cabin air and electronics.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    /// Known solution, wrong call. Carries the button label.
    Incorrect { label: &'static str },
}

/// Judge `action_id` against the active anomaly and its lock.
pub fn judge_action(
    definition: &AnomalyDefinition,
    lock: Option<&AnomalyLock>,
    action_id: i64,
) -> Result<Verdict, ActionError> {
    let solution = definition
        .solution(action_id)
        .ok_or(ActionError::UnknownActionId(action_id))?;

    let is_correct = solution_views(definition, lock)
        .iter()
        .any(|v| v.id == action_id && v.is_correct);

    if is_correct {
        Ok(Verdict::Correct)
    } else {
        Ok(Verdict::Incorrect {
            label: solution.label(),
        })
    }
}

pub fn resolution_message(kind: AnomalyKind) -> String {
    format!(
        "✅ CORRECTIVE ACTION EXECUTED. The '{}' anomaly is resolved. Systems returning to nominal.",
        kind
    )
}

pub fn failure_message(label: &str, kind: AnomalyKind) -> String {
    format!(
        "🚨 ACTION FAILED: {} resulted in a system spike. The {} anomaly remains active.",
        label, kind
    )
}

pub fn pick_fact(rng: &mut impl Rng) -> &'static str {
    NASA_FACTS[rng.gen_range(0..NASA_FACTS.len())]
}
