//! Pure anomaly rules for the ECLSS simulator.
//!
//! This crate holds everything about the life-support anomaly game that does
//! not need shared state or a clock: the metric table, the anomaly catalog,
//! the once-per-episode sampler, per-request views and action judging.
//! Functions take plain data and a random source and return results.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`anomaly`] | CO2 / pressure / thermal anomaly catalog and constraint model |
//! | [`error`] | Action submission errors |
//! | [`metrics`] | Six cabin metrics, nominal bands, baseline readings |
//! | [`resolution`] | Action verdicts, result messages, fact pool |
//! | [`sampling`] | Branch selection and the frozen [`sampling::AnomalyLock`] |
//! | [`view`] | Per-request anomaly and recommendation views |

pub mod anomaly;
pub mod error;
pub mod metrics;
pub mod resolution;
pub mod sampling;
pub mod view;
