//! Life-support metric table and baseline reading generation.
//!
//! Six cabin metrics are tracked. Each has a nominal band; baseline readings
//! are drawn uniformly inside that band and tagged `NOMINAL`. Anomalies
//! overwrite exactly one of them (see [`crate::sampling`]).

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Health classification of a single reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricStatus {
    Nominal,
    Caution,
    Critical,
}

/// The six tracked life-support metrics.
///
/// Serialized as the display name, which is also the key used in every
/// readings mapping. Ordering follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "Cabin Pressure (kPa)")]
    CabinPressure,
    #[serde(rename = "O₂ Partial Pressure (kPa)")]
    OxygenPartialPressure,
    #[serde(rename = "CO₂ Concentration (%)")]
    CarbonDioxide,
    #[serde(rename = "Cabin Temperature (°C)")]
    CabinTemperature,
    #[serde(rename = "Relative Humidity (%)")]
    RelativeHumidity,
    #[serde(rename = "Water Reserves (L)")]
    WaterReserves,
}

/// Static nominal band for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

impl MetricKind {
    pub fn spec(&self) -> MetricSpec {
        match self {
            Self::CabinPressure => MetricSpec {
                name: "Cabin Pressure (kPa)",
                min: 98.6,
                max: 103.4,
                unit: "kPa",
            },
            Self::OxygenPartialPressure => MetricSpec {
                name: "O₂ Partial Pressure (kPa)",
                min: 19.5,
                max: 23.8,
                unit: "kPa",
            },
            Self::CarbonDioxide => MetricSpec {
                name: "CO₂ Concentration (%)",
                min: 0.00,
                max: 0.40,
                unit: "%",
            },
            // Baseline band only; the thermal anomaly has its own wider envelope.
            Self::CabinTemperature => MetricSpec {
                name: "Cabin Temperature (°C)",
                min: 21.0,
                max: 24.0,
                unit: "°C",
            },
            Self::RelativeHumidity => MetricSpec {
                name: "Relative Humidity (%)",
                min: 40.0,
                max: 60.0,
                unit: "%",
            },
            Self::WaterReserves => MetricSpec {
                name: "Water Reserves (L)",
                min: 500.0,
                max: 1200.0,
                unit: "L",
            },
        }
    }

    pub fn all() -> &'static [MetricKind] {
        &[
            Self::CabinPressure,
            Self::OxygenPartialPressure,
            Self::CarbonDioxide,
            Self::CabinTemperature,
            Self::RelativeHumidity,
            Self::WaterReserves,
        ]
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One sensor-like reading as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub value: f64,
    pub unit: String,
    pub status: MetricStatus,
}

/// Readings for every metric, keyed by metric.
pub type Readings = BTreeMap<MetricKind, MetricReading>;

/// Round to two decimal places, the precision every reading is served at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Draw a fresh nominal reading for every metric.
pub fn generate_baseline_readings(rng: &mut impl Rng) -> Readings {
    MetricKind::all()
        .iter()
        .map(|kind| {
            let spec = kind.spec();
            let value = round2(rng.gen_range(spec.min..=spec.max));
            (
                *kind,
                MetricReading {
                    value,
                    unit: spec.unit.to_string(),
                    status: MetricStatus::Nominal,
                },
            )
        })
        .collect()
}
