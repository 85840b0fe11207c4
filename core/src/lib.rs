//! Synthetic magnetometer pipeline for the flight-control simulation harness.
//!
//! A fixed-rate driver turns a truth field into noisy, delayed, miscalibrated
//! readings and fans them out either to in-process accumulation sinks or to
//! simulated bus nodes. Draining the sinks is a separate entry point so the
//! consumer can run at its own cadence.

pub mod device;
pub mod distribution;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use pipeline::{PipelineDriver, ReadHandle, TickOutcome};
pub use prelude::{BusError, MagResult, MagSimError};
