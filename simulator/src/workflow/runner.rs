use crate::generator::field::EarthFieldGenerator;
use crate::telemetry_bridge::bridge::TelemetryBridge;
use crate::telemetry_bridge::model::TelemetryModel;
use crate::workflow::config::SimulationConfig;
use anyhow::{anyhow, Context};
use log::{info, warn};
use magcore::device::BindingPlan;
use magcore::distribution::bus::{BusNode, MessageLog, RecordingTransport};
use magcore::distribution::{AveragingSink, MagneticFieldStrength};
use magcore::pipeline::params::shared;
use magcore::pipeline::{
    Clock, DrainedReading, ManualClock, MonotonicClock, PipelineDriver, ReadHandle, SharedParams,
};
use magcore::telemetry::PipelineMetrics;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::{interval, sleep, MissedTickBehavior};

const BUS_LOG_CAPACITY: usize = 256;

/// A fully wired pipeline: producer, consumer handle, and bus message logs.
pub struct SimulationRig {
    pub driver: PipelineDriver,
    pub reader: ReadHandle,
    pub bus_logs: Vec<MessageLog>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OfflineReport {
    pub ticks: usize,
    pub reads: usize,
    pub last_readings: Vec<DrainedReading>,
    pub bus_messages: usize,
    pub last_bus_message: Option<MagneticFieldStrength>,
    pub metrics: PipelineMetrics,
}

#[derive(Clone)]
pub struct Runner {
    config: SimulationConfig,
    params: SharedParams,
}

impl Runner {
    pub fn new(config: SimulationConfig) -> Self {
        let params = shared(config.params.clone());
        Self { config, params }
    }

    /// Live parameter handle; edits are picked up on the next tick.
    pub fn params(&self) -> SharedParams {
        self.params.clone()
    }

    pub fn build(&self, clock: impl Clock + 'static) -> anyhow::Result<SimulationRig> {
        let mut nodes: HashMap<(u8, u8), Arc<BusNode>> = HashMap::new();
        let mut bus_logs = Vec::new();
        let plan = BindingPlan::from_device_ids(&self.config.device_ids, |bus, address| {
            nodes
                .entry((bus, address))
                .or_insert_with(|| {
                    let (transport, log) = RecordingTransport::with_capacity(BUS_LOG_CAPACITY);
                    bus_logs.push(log);
                    Arc::new(BusNode::new(bus, address, transport))
                })
                .clone()
        })
        .context("resolving magnetometer device ids")?;

        let field = EarthFieldGenerator::new(self.config.field.clone(), self.config.seed);
        let driver = PipelineDriver::new(
            plan,
            Arc::new(AveragingSink::new()),
            self.params.clone(),
            field,
            clock,
        )
        .with_seed(self.config.seed);
        let reader = driver.read_handle();

        Ok(SimulationRig {
            driver,
            reader,
            bus_logs,
        })
    }

    /// Steps a manual clock through `ticks` scheduler invocations, draining
    /// on the configured read interval.
    pub fn run_offline(&self, ticks: usize) -> anyhow::Result<OfflineReport> {
        let clock = ManualClock::starting_at(0);
        let mut rig = self.build(clock.clone())?;
        let mut report = OfflineReport {
            ticks,
            ..OfflineReport::default()
        };

        let mut since_read = 0;
        for _ in 0..ticks {
            clock.advance(self.config.tick_interval_ms);
            rig.driver.tick();
            since_read += self.config.tick_interval_ms;
            if since_read >= self.config.read_interval_ms {
                since_read = 0;
                let readings = rig.reader.read();
                report.reads += 1;
                if !readings.is_empty() {
                    report.last_readings = readings;
                }
            }
        }

        report.bus_messages = rig.bus_logs.iter().map(MessageLog::len).sum();
        report.last_bus_message = rig.bus_logs.iter().filter_map(MessageLog::latest).last();
        report.metrics = rig.driver.metrics().snapshot();
        Ok(report)
    }

    /// Runs the tick and read entry points on independent timers until
    /// Ctrl+C or the configured duration elapses.
    pub async fn run_realtime(&self, bridge: Arc<TelemetryBridge>) -> anyhow::Result<PipelineMetrics> {
        let SimulationRig {
            mut driver,
            reader,
            bus_logs,
        } = self.build(MonotonicClock::new())?;
        let metrics = driver.metrics();
        let tick_period = Duration::from_millis(u64::from(self.config.tick_interval_ms));
        let read_period = Duration::from_millis(u64::from(self.config.read_interval_ms));

        let mut producer = tokio::spawn(async move {
            let mut timer = interval(tick_period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                driver.tick();
            }
        });

        let consumer_metrics = metrics.clone();
        let consumer = tokio::spawn(async move {
            let mut timer = interval(read_period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                let readings = reader.read();
                if readings.is_empty() {
                    continue;
                }
                let model = TelemetryModel {
                    readings,
                    bus_messages: bus_logs.iter().filter_map(MessageLog::latest).collect(),
                    metrics: consumer_metrics.snapshot(),
                };
                if let Err(err) = bridge.publish(model) {
                    warn!("telemetry bridge update failed: {:#}", err);
                }
            }
        });

        info!(
            "real-time run started (tick {:?}, read {:?})",
            tick_period, read_period
        );
        let deadline = async {
            match self.config.duration_ms {
                Some(ms) => sleep(Duration::from_millis(ms)).await,
                None => std::future::pending::<()>().await,
            }
        };
        let outcome = tokio::select! {
            result = signal::ctrl_c() => result.context("awaiting Ctrl+C to exit"),
            _ = deadline => Ok(()),
            joined = &mut producer => match joined {
                Ok(()) => Err(anyhow!("producer task exited unexpectedly")),
                Err(err) => Err(anyhow!(err).context("producer task failed")),
            },
        };

        producer.abort();
        consumer.abort();
        outcome?;
        Ok(metrics.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magcore::device::DeviceId;
    use magcore::math::Vector3f;
    use magcore::pipeline::TickOutcome;

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            device_ids: vec![
                DeviceId::encode(4, 0, 0, 1),
                DeviceId::encode(4, 0, 0, 2),
                DeviceId::encode(3, 0, 125, 1),
                DeviceId::encode(3, 0, 125, 2),
            ],
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn build_shares_nodes_per_address() {
        let runner = Runner::new(quiet_config());
        let mut rig = runner.build(ManualClock::starting_at(100)).unwrap();
        assert_eq!(rig.bus_logs.len(), 1);
        assert_eq!(rig.reader.instances(), &[0, 1]);

        let TickOutcome::Executed { counts, .. } = rig.driver.tick() else {
            panic!("first tick must execute");
        };
        assert_eq!(counts.accumulated, 2);
        assert_eq!(counts.published, 2);
        assert_eq!(rig.bus_logs[0].len(), 2);
    }

    #[test]
    fn offline_run_gates_to_sensor_rate() {
        let runner = Runner::new(quiet_config());
        let report = runner.run_offline(1_000).unwrap();

        // 1 kHz scheduler, 100 Hz sensor
        assert_eq!(report.metrics.ticks, 100);
        assert_eq!(report.metrics.gated, 900);
        assert_eq!(report.reads, 50);
        assert_eq!(report.bus_messages, 200);
        assert_eq!(report.last_readings.len(), 2);
        for reading in &report.last_readings {
            assert_eq!(reading.field, Vector3f::new(200.0, 0.0, 400.0));
        }
        let message = report.last_bus_message.unwrap();
        assert_eq!(message.magnetic_field_ga, [0.2, 0.0, 0.4]);
    }

    #[test]
    fn param_edits_reach_running_rig() {
        let runner = Runner::new(quiet_config());
        let clock = ManualClock::starting_at(100);
        let mut rig = runner.build(clock.clone()).unwrap();
        rig.driver.tick();
        rig.reader.read();

        runner.params().write().unwrap().offsets = Vector3f::new(0.0, 0.0, 100.0);
        clock.advance(10);
        rig.driver.tick();
        let readings = rig.reader.read();
        assert_eq!(readings[1].field, Vector3f::new(200.0, 0.0, 300.0));
    }
}
