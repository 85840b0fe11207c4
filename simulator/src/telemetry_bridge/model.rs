use magcore::distribution::MagneticFieldStrength;
use magcore::pipeline::DrainedReading;
use magcore::telemetry::PipelineMetrics;
use serde::Serialize;

/// Latest consumer-side view of the simulated magnetometers.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TelemetryModel {
    pub readings: Vec<DrainedReading>,
    pub bus_messages: Vec<MagneticFieldStrength>,
    pub metrics: PipelineMetrics,
}
