//! Per-request views of the active anomaly.
//!
//! Correctness flags and the thermal priority are recomputed from the current
//! lock every time a view is built, so no catalog data is ever mutated.

use serde::Serialize;

use crate::anomaly::{AnomalyDefinition, AnomalyKind, Constraint, Direction, Priority};
use crate::metrics::{MetricKind, MetricStatus};
use crate::sampling::AnomalyLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionView {
    pub id: i64,
    pub text: &'static str,
    pub is_correct: bool,
}

/// What the alert panel shows for the active anomaly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyView {
    pub kind: AnomalyKind,
    pub metric: MetricKind,
    pub title: &'static str,
    pub message: &'static str,
    pub priority: Option<Priority>,
    pub constraints: Constraint,
    pub solutions: Vec<SolutionView>,
}

// A lock for another metric belongs to a different episode and is ignored.
fn lock_for<'a>(
    definition: &AnomalyDefinition,
    lock: Option<&'a AnomalyLock>,
) -> Option<&'a AnomalyLock> {
    lock.filter(|l| l.metric == definition.metric)
}

fn sampled(
    definition: &AnomalyDefinition,
    lock: Option<&AnomalyLock>,
) -> (Option<MetricStatus>, Option<Direction>) {
    match lock_for(definition, lock) {
        Some(l) => (Some(l.status), l.direction),
        None => (None, None),
    }
}

pub fn solution_views(
    definition: &AnomalyDefinition,
    lock: Option<&AnomalyLock>,
) -> Vec<SolutionView> {
    let (_, direction) = sampled(definition, lock);
    definition
        .solutions
        .iter()
        .map(|s| SolutionView {
            id: s.id,
            text: s.text,
            is_correct: s.correct.evaluate(direction),
        })
        .collect()
}

pub fn anomaly_view(definition: &AnomalyDefinition, lock: Option<&AnomalyLock>) -> AnomalyView {
    let (status, _) = sampled(definition, lock);
    AnomalyView {
        kind: definition.kind,
        metric: definition.metric,
        title: definition.title,
        message: definition.message,
        priority: definition.priority_for(status),
        constraints: definition.constraint,
        solutions: solution_views(definition, lock),
    }
}
