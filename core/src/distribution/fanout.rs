use crate::distribution::bus::BusNode;
use crate::distribution::sink::AccumulationSink;
use crate::math::Vector3f;
use crate::telemetry::MetricsRecorder;
use log::warn;
use std::sync::Arc;

/// Where a logical instance's readings go. Resolved once at setup.
#[derive(Debug, Clone)]
pub enum InstanceBinding {
    /// In-process instance drained through the accumulation sink.
    Accumulate { instance: u8 },
    /// Networked node publishing under its own sensor id.
    BusNode { node: Arc<BusNode>, sensor_id: u8 },
}

/// A single synthesized reading routed to one binding.
#[derive(Debug)]
pub enum Emission<'a> {
    Accumulate {
        instance: u8,
        field: Vector3f,
        weight: u32,
    },
    Publish {
        node: &'a BusNode,
        sensor_id: u8,
        field_ga: [f64; 3],
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutCounts {
    pub accumulated: usize,
    pub published: usize,
    pub failed: usize,
}

/// Routes emissions to the accumulation sink or the bus.
pub struct DistributionFanout {
    sink: Arc<dyn AccumulationSink>,
    metrics: Arc<MetricsRecorder>,
}

impl DistributionFanout {
    pub fn new(sink: Arc<dyn AccumulationSink>, metrics: Arc<MetricsRecorder>) -> Self {
        Self { sink, metrics }
    }

    pub fn sink(&self) -> Arc<dyn AccumulationSink> {
        self.sink.clone()
    }

    pub fn accumulate(&self, instance: u8, field: Vector3f, weight: u32) {
        self.sink.accumulate(instance, field, weight);
        self.metrics.record_accumulated();
    }

    /// Best-effort publish: failures are logged and counted, never returned.
    pub fn publish(&self, node: &BusNode, sensor_id: u8, field_ga: [f64; 3]) -> bool {
        match node.publish(sensor_id, field_ga) {
            Ok(()) => {
                self.metrics.record_published();
                true
            }
            Err(err) => {
                warn!(
                    "publish to node {}:{} sensor {} dropped: {}",
                    node.bus(),
                    node.address(),
                    sensor_id,
                    err
                );
                self.metrics.record_publish_failure();
                false
            }
        }
    }

    pub fn dispatch(&self, emissions: &[Emission<'_>]) -> FanoutCounts {
        let mut counts = FanoutCounts::default();
        for emission in emissions {
            match emission {
                Emission::Accumulate {
                    instance,
                    field,
                    weight,
                } => {
                    self.accumulate(*instance, *field, *weight);
                    counts.accumulated += 1;
                }
                Emission::Publish {
                    node,
                    sensor_id,
                    field_ga,
                } => {
                    if self.publish(node, *sensor_id, *field_ga) {
                        counts.published += 1;
                    } else {
                        counts.failed += 1;
                    }
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::bus::{FailingTransport, RecordingTransport};
    use crate::distribution::sink::AveragingSink;

    #[test]
    fn dispatch_reaches_every_binding() {
        let sink = Arc::new(AveragingSink::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let fanout = DistributionFanout::new(sink.clone(), metrics.clone());

        let (transport, log) = RecordingTransport::new();
        let node = BusNode::new(0, 42, transport);
        let emissions = vec![
            Emission::Accumulate {
                instance: 0,
                field: Vector3f::new(1.0, 2.0, 3.0),
                weight: 10,
            },
            Emission::Accumulate {
                instance: 1,
                field: Vector3f::new(4.0, 5.0, 6.0),
                weight: 10,
            },
            Emission::Publish {
                node: &node,
                sensor_id: 3,
                field_ga: [0.1, 0.2, 0.3],
            },
        ];

        let counts = fanout.dispatch(&emissions);
        assert_eq!(
            counts,
            FanoutCounts {
                accumulated: 2,
                published: 1,
                failed: 0
            }
        );
        assert_eq!(sink.pending(0), 1);
        assert_eq!(sink.pending(1), 1);
        assert_eq!(log.len(), 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.accumulated, 2);
        assert_eq!(snapshot.published, 1);
    }

    #[test]
    fn publish_failure_is_swallowed() {
        let sink = Arc::new(AveragingSink::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let fanout = DistributionFanout::new(sink, metrics.clone());
        let node = BusNode::new(1, 7, FailingTransport::default());

        assert!(!fanout.publish(&node, 0, [0.0; 3]));
        assert!(node.is_idle());
        assert_eq!(metrics.snapshot().publish_failures, 1);
    }
}
