//! Runtime glue that wires batch configs, record handlers, progress rendering,
//! telemetry, and runner orchestration.

pub mod config;
pub mod handler;
pub mod progress;
pub mod runner;
pub mod telemetry;
