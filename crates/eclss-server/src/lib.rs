//! ECLSS Server - request layer
//!
//! Maps the dashboard's four routes onto the anomaly engine and renders JSON.
//! All game logic lives in the engine; this crate only validates input and
//! shapes output.

mod routes;

pub use routes::*;
