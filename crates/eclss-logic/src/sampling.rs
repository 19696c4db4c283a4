//! Anomaly sampling: the one random draw made per anomaly episode.
//!
//! The result is an [`AnomalyLock`]: the frozen value, status and (for the
//! thermal anomaly) deviation direction that every later read reuses.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyDefinition, Constraint, Direction, ValueRange};
use crate::metrics::{round2, MetricKind, MetricStatus, Readings};

/// Frozen sample for the active anomaly's metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyLock {
    pub metric: MetricKind,
    pub value: f64,
    pub status: MetricStatus,
    /// Only set for directional (thermal) anomalies.
    pub direction: Option<Direction>,
}

impl AnomalyLock {
    /// Overwrite the locked metric in a set of readings.
    pub fn apply(&self, readings: &mut Readings) {
        if let Some(reading) = readings.get_mut(&self.metric) {
            reading.value = self.value;
            reading.status = self.status;
        }
    }
}

/// A candidate range the sampler may draw from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    pub range: ValueRange,
    pub status: MetricStatus,
    pub direction: Option<Direction>,
}

/// All branches an anomaly can sample from.
pub fn candidate_branches(constraint: &Constraint) -> Vec<Branch> {
    match constraint {
        Constraint::Simple { range, status } => vec![Branch {
            range: *range,
            status: *status,
            direction: None,
        }],
        Constraint::Complex(envelope) => envelope
            .branches()
            .iter()
            .map(|sub| Branch {
                range: sub.range,
                status: sub.status,
                direction: Some(sub.direction),
            })
            .collect(),
    }
}

/// Pick a branch uniformly, then a value uniformly within it.
pub fn sample_anomaly(definition: &AnomalyDefinition, rng: &mut impl Rng) -> AnomalyLock {
    let branches = candidate_branches(&definition.constraint);
    let branch = branches[rng.gen_range(0..branches.len())];
    let value = round2(rng.gen_range(branch.range.min..=branch.range.max));

    AnomalyLock {
        metric: definition.metric,
        value,
        status: branch.status,
        direction: branch.direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyKind;
    use crate::metrics::generate_baseline_readings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_simple_constraint_single_branch() {
        let branches = candidate_branches(&AnomalyKind::Co2.definition().constraint);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].status, MetricStatus::Caution);
        assert_eq!(branches[0].direction, None);
    }

    #[test]
    fn test_thermal_has_four_branches() {
        let branches = candidate_branches(&AnomalyKind::Temp.definition().constraint);
        assert_eq!(branches.len(), 4);
        let lows = branches
            .iter()
            .filter(|b| b.direction == Some(Direction::Low))
            .count();
        let criticals = branches
            .iter()
            .filter(|b| b.status == MetricStatus::Critical)
            .count();
        assert_eq!(lows, 2);
        assert_eq!(criticals, 2);
    }

    #[test]
    fn test_co2_sample_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let lock = sample_anomaly(AnomalyKind::Co2.definition(), &mut rng);
            assert_eq!(lock.metric, MetricKind::CarbonDioxide);
            assert_eq!(lock.status, MetricStatus::Caution);
            assert!((0.45..=0.65).contains(&lock.value));
        }
    }

    #[test]
    fn test_pressure_sample_is_critical() {
        let mut rng = StdRng::seed_from_u64(5);
        let lock = sample_anomaly(AnomalyKind::Pressure.definition(), &mut rng);
        assert_eq!(lock.status, MetricStatus::Critical);
        assert!((96.0..=98.0).contains(&lock.value));
    }

    #[test]
    fn test_thermal_samples_reach_both_directions() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..200 {
            let lock = sample_anomaly(AnomalyKind::Temp.definition(), &mut rng);
            match lock.direction {
                Some(Direction::Low) => {
                    seen_low = true;
                    assert!(lock.value <= 18.0);
                }
                Some(Direction::High) => {
                    seen_high = true;
                    assert!(lock.value >= 26.0);
                }
                None => panic!("thermal lock must carry a direction"),
            }
        }
        assert!(seen_low && seen_high);
    }

    #[test]
    fn test_lock_apply_overwrites_only_its_metric() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut readings = generate_baseline_readings(&mut rng);
        let before = readings.clone();
        let lock = AnomalyLock {
            metric: MetricKind::CarbonDioxide,
            value: 0.5,
            status: MetricStatus::Caution,
            direction: None,
        };
        lock.apply(&mut readings);

        for (kind, reading) in &readings {
            if *kind == MetricKind::CarbonDioxide {
                assert_eq!(reading.value, 0.5);
                assert_eq!(reading.status, MetricStatus::Caution);
            } else {
                assert_eq!(reading, &before[kind]);
            }
        }
    }
}
