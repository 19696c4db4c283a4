//! Anomaly catalog: the three life-support faults the simulator can raise.
//!
//! Definitions are immutable `'static` templates. Anything that depends on
//! the sampled episode (priority of the thermal anomaly, which solution is
//! correct) is derived later from an [`AnomalyLock`](crate::sampling::AnomalyLock)
//! and never written back here.

use serde::{Deserialize, Serialize};

use crate::metrics::{MetricKind, MetricStatus};

/// Kinds of anomaly the engine can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnomalyKind {
    Co2,
    Pressure,
    Temp,
}

impl AnomalyKind {
    pub fn definition(&self) -> &'static AnomalyDefinition {
        match self {
            Self::Co2 => &CO2_SCRUBBER,
            Self::Pressure => &LOW_PRESSURE,
            Self::Temp => &THERMAL,
        }
    }

    pub fn all() -> &'static [AnomalyKind] {
        &[Self::Co2, Self::Pressure, Self::Temp]
    }

    /// Short tag used in player-facing messages ("CO2", "PRESSURE", "TEMP").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Co2 => "CO2",
            Self::Pressure => "PRESSURE",
            Self::Temp => "TEMP",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Alert priority shown alongside an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Medium,
    High,
    Critical,
}

/// Which way a reading has deviated from nominal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Low,
    High,
}

/// Closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One directional slice of the thermal envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubRange {
    pub range: ValueRange,
    pub status: MetricStatus,
    pub direction: Direction,
}

/// Status → priority table for the thermal anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorityMap {
    pub caution: Priority,
    pub critical: Priority,
}

impl PriorityMap {
    pub fn priority_for(&self, status: MetricStatus) -> Option<Priority> {
        match status {
            MetricStatus::Nominal => None,
            MetricStatus::Caution => Some(self.caution),
            MetricStatus::Critical => Some(self.critical),
        }
    }
}

/// Multi-branch temperature envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThermalEnvelope {
    pub nominal: ValueRange,
    pub caution_low: SubRange,
    pub caution_high: SubRange,
    pub critical_low: SubRange,
    pub critical_high: SubRange,
    pub priority_map: PriorityMap,
}

impl ThermalEnvelope {
    /// Candidate branches in sampling order.
    pub fn branches(&self) -> [SubRange; 4] {
        [
            self.critical_low,
            self.critical_high,
            self.caution_low,
            self.caution_high,
        ]
    }
}

/// How an anomaly's reading is constrained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Constraint {
    /// One range, one fixed status.
    Simple {
        range: ValueRange,
        status: MetricStatus,
    },
    /// Directional branches with status-derived priority.
    Complex(ThermalEnvelope),
}

/// When a solution counts as the corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Correctness {
    Always,
    Never,
    /// Correct only when the sampled branch deviates in this direction.
    When(Direction),
}

impl Correctness {
    pub fn evaluate(&self, direction: Option<Direction>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::When(wanted) => direction == Some(*wanted),
        }
    }
}

/// A player action offered for an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolutionTemplate {
    pub id: i64,
    pub text: &'static str,
    pub correct: Correctness,
}

impl SolutionTemplate {
    /// Button label: the text up to the first parenthesis.
    pub fn label(&self) -> &'static str {
        self.text
            .split('(')
            .next()
            .map(str::trim)
            .unwrap_or(self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyDefinition {
    pub kind: AnomalyKind,
    pub metric: MetricKind,
    pub title: &'static str,
    pub message: &'static str,
    /// Fixed priority for simple anomalies; the thermal one derives it.
    pub priority: Option<Priority>,
    pub constraint: Constraint,
    pub solutions: &'static [SolutionTemplate],
}

impl AnomalyDefinition {
    pub fn solution(&self, id: i64) -> Option<&'static SolutionTemplate> {
        self.solutions.iter().find(|s| s.id == id)
    }

    /// Priority given the sampled status (if any).
    pub fn priority_for(&self, status: Option<MetricStatus>) -> Option<Priority> {
        match &self.constraint {
            Constraint::Simple { .. } => self.priority,
            Constraint::Complex(envelope) => {
                status.and_then(|s| envelope.priority_map.priority_for(s))
            }
        }
    }
}

static CO2_SCRUBBER: AnomalyDefinition = AnomalyDefinition {
    kind: AnomalyKind::Co2,
    metric: MetricKind::CarbonDioxide,
    title: "CO₂ SCRUBBER INEFFICIENCY",
    message: "Elevated CO₂ readings indicate the Carbon Dioxide Removal Assembly (CDRA) is not fully scrubbing the cabin atmosphere. Immediate crew action is required to prevent hypoxia.",
    priority: Some(Priority::High),
    constraint: Constraint::Simple {
        range: ValueRange::new(0.45, 0.65),
        status: MetricStatus::Caution,
    },
    solutions: &[
        SolutionTemplate {
            id: 1,
            text: "Activate Secondary CO₂ Scrubber (Corrective Action)",
            correct: Correctness::Always,
        },
        SolutionTemplate {
            id: 2,
            text: "Reroute Airflow to Water Processor (Deferral/Wrong)",
            correct: Correctness::Never,
        },
        SolutionTemplate {
            id: 3,
            text: "Disable Cabin Ventilation (Wrong Action)",
            correct: Correctness::Never,
        },
    ],
};

static LOW_PRESSURE: AnomalyDefinition = AnomalyDefinition {
    kind: AnomalyKind::Pressure,
    metric: MetricKind::CabinPressure,
    title: "LOW CABIN PRESSURE WARNING",
    message: "Cabin pressure is dropping below the minimum nominal threshold. This suggests a micro-meteoroid strike or seal failure. Pressurization must be restored immediately.",
    priority: Some(Priority::Critical),
    constraint: Constraint::Simple {
        range: ValueRange::new(96.0, 98.0),
        status: MetricStatus::Critical,
    },
    solutions: &[
        SolutionTemplate {
            id: 1,
            text: "Initiate Cabin Pressurization Sequence (Corrective Action)",
            correct: Correctness::Always,
        },
        SolutionTemplate {
            id: 2,
            text: "Open External Vent Valves (Wrong Action)",
            correct: Correctness::Never,
        },
        SolutionTemplate {
            id: 3,
            text: "Airlock Cycling Check (Deferral)",
            correct: Correctness::Never,
        },
    ],
};

static THERMAL: AnomalyDefinition = AnomalyDefinition {
    kind: AnomalyKind::Temp,
    metric: MetricKind::CabinTemperature,
    title: "THERMAL ANOMALY DETECTED",
    message: "Cabin temperature is outside the nominal safe range. If temperature rises too high, electronics and crew health are at risk. If temperature drops too low, life support systems and crew safety may be compromised.",
    priority: None,
    constraint: Constraint::Complex(ThermalEnvelope {
        nominal: ValueRange::new(18.0, 26.0),
        caution_low: SubRange {
            range: ValueRange::new(10.0, 18.0),
            status: MetricStatus::Caution,
            direction: Direction::Low,
        },
        caution_high: SubRange {
            range: ValueRange::new(26.0, 40.0),
            status: MetricStatus::Caution,
            direction: Direction::High,
        },
        critical_low: SubRange {
            range: ValueRange::new(3.0, 10.0),
            status: MetricStatus::Critical,
            direction: Direction::Low,
        },
        critical_high: SubRange {
            range: ValueRange::new(40.0, 175.0),
            status: MetricStatus::Critical,
            direction: Direction::High,
        },
        priority_map: PriorityMap {
            caution: Priority::Medium,
            critical: Priority::High,
        },
    }),
    solutions: &[
        SolutionTemplate {
            id: 1,
            text: "Activate Secondary ATCS Pump and Heat Exchanger (Corrective Action for High Temp)",
            correct: Correctness::When(Direction::High),
        },
        SolutionTemplate {
            id: 2,
            text: "Reduce Cabin Heat Loss by Activating Emergency Insulation Panels (Corrective Action for Low Temp)",
            correct: Correctness::When(Direction::Low),
        },
        SolutionTemplate {
            id: 3,
            text: "Take No Immediate Action (Incorrect – Situation Requires Intervention)",
            correct: Correctness::Never,
        },
    ],
};
