use crate::device::BindingPlan;
use crate::distribution::{AccumulationSink, DistributionFanout, FanoutCounts, InstanceBinding};
use crate::math::Vector3f;
use crate::pipeline::clock::Clock;
use crate::pipeline::params::{read_params, FieldSource, SharedParams};
use crate::prelude::{elapsed_ms, SAMPLE_INTERVAL_MS};
use crate::processing::SampleSynthesizer;
use crate::telemetry::{LogManager, MetricsRecorder};
use serde::Serialize;
use std::sync::Arc;

/// Timing state advanced only by the tick entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub last_sample_time: Option<u32>,
    pub last_store_time: Option<u32>,
    pub store_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Called again before the sample interval elapsed; nothing changed.
    Gated,
    Executed {
        corrected: Vector3f,
        stored: bool,
        delay_fallback: bool,
        counts: FanoutCounts,
    },
}

/// Periodic producer: samples the truth field at 100 Hz regardless of how
/// often it is called and fans the result out to every binding.
pub struct PipelineDriver {
    clock: Box<dyn Clock>,
    field: Box<dyn FieldSource>,
    params: SharedParams,
    synthesizer: SampleSynthesizer,
    fanout: DistributionFanout,
    bindings: Vec<InstanceBinding>,
    instances: Vec<u8>,
    last_sample_time: Option<u32>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl PipelineDriver {
    pub fn new(
        plan: BindingPlan,
        sink: Arc<dyn AccumulationSink>,
        params: SharedParams,
        field: impl FieldSource + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        let metrics = Arc::new(MetricsRecorder::new());
        let instances = plan.accumulate_instances();
        let logger = LogManager::for_source("pipeline");
        logger.record(&format!(
            "{} in-process instance(s), {} bus node(s)",
            instances.len(),
            plan.bus_node_count()
        ));

        Self {
            clock: Box::new(clock),
            field: Box::new(field),
            params,
            synthesizer: SampleSynthesizer::new(0),
            fanout: DistributionFanout::new(sink, metrics.clone()),
            bindings: plan.into_bindings(),
            instances,
            last_sample_time: None,
            metrics,
            logger,
        }
    }

    /// Reseeds the noise generator. Only meaningful before the first tick.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.synthesizer = SampleSynthesizer::new(seed);
        self
    }

    pub fn read_handle(&self) -> ReadHandle {
        ReadHandle {
            sink: self.fanout.sink(),
            instances: self.instances.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    pub fn state(&self) -> PipelineState {
        PipelineState {
            last_sample_time: self.last_sample_time,
            last_store_time: self.synthesizer.last_store_time(),
            store_index: self.synthesizer.delay_line().cursor(),
        }
    }

    pub fn correction_builds(&self) -> u64 {
        self.synthesizer.correction().builds()
    }

    /// Tick entry point, driven by the external scheduler.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now_ms();
        self.tick_at(now)
    }

    pub fn tick_at(&mut self, now: u32) -> TickOutcome {
        if let Some(last) = self.last_sample_time {
            if elapsed_ms(now, last) < SAMPLE_INTERVAL_MS {
                self.metrics.record_gated();
                return TickOutcome::Gated;
            }
        }
        self.last_sample_time = Some(now);

        let params = read_params(&self.params);
        let truth = self.field.body_field(now);
        let outcome = self.synthesizer.synthesize(now, truth, &params);
        self.metrics
            .set_correction_builds(self.synthesizer.correction().builds());

        let emissions = SampleSynthesizer::emissions(outcome.corrected, &params, &self.bindings);
        let counts = self.fanout.dispatch(&emissions);
        self.metrics
            .record_tick(outcome.stored, outcome.delay_fallback);
        self.logger.trace_tick(format_args!(
            "t={}ms corrected={:?} stored={} fallback={} accumulated={} published={}",
            now,
            outcome.corrected,
            outcome.stored,
            outcome.delay_fallback,
            counts.accumulated,
            counts.published
        ));

        TickOutcome::Executed {
            corrected: outcome.corrected,
            stored: outcome.stored,
            delay_fallback: outcome.delay_fallback,
            counts,
        }
    }
}

/// A drained per-instance reading, in milligauss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrainedReading {
    pub instance: u8,
    pub field: Vector3f,
}

/// Consumer-side entry point. Touches only the accumulation sink, so it can
/// run on its own cadence alongside the driver.
#[derive(Clone)]
pub struct ReadHandle {
    sink: Arc<dyn AccumulationSink>,
    instances: Vec<u8>,
    metrics: Arc<MetricsRecorder>,
}

impl ReadHandle {
    pub fn instances(&self) -> &[u8] {
        &self.instances
    }

    /// Drains every in-process instance that has accumulated samples.
    pub fn read(&self) -> Vec<DrainedReading> {
        self.metrics.record_drain();
        self.instances
            .iter()
            .filter_map(|&instance| {
                self.sink
                    .drain(instance)
                    .map(|field| DrainedReading { instance, field })
            })
            .collect()
    }
}
