use anyhow::Context;
use clap::Parser;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use telemetry_bridge::bridge::TelemetryBridge;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::SimulationConfig;
use workflow::runner::Runner;

mod generator;
mod telemetry_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic magnetometer simulation driver")]
struct Args {
    /// Load a simulation config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Step a manual clock instead of running in real time
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Scheduler invocations for an offline run
    #[arg(long, default_value_t = 1000)]
    ticks: usize,
    /// Append the offline report as a JSON line to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Override the noise seed
    #[arg(long)]
    seed: Option<u64>,
    /// Stop a real-time run after this many milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,
    /// Serve readings and accept parameter edits over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config.as_ref() {
        SimulationConfig::load(path)?
    } else {
        SimulationConfig::default()
    };
    config.apply_overrides(args.seed, args.duration_ms);
    config.validate().context("validating simulation config")?;

    let runner = Runner::new(config);

    if args.offline {
        let report = runner.run_offline(args.ticks)?;
        println!(
            "Offline run -> ticks {}, executed {}, gated {}, reads {}, bus messages {}, fallbacks {}",
            report.ticks,
            report.metrics.ticks,
            report.metrics.gated,
            report.reads,
            report.bus_messages,
            report.metrics.delay_fallbacks
        );
        for reading in &report.last_readings {
            println!("  instance {} -> {:?} mG", reading.instance, reading.field);
        }

        if let Some(report_path) = args.report {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&report_path)
                .with_context(|| format!("opening report {}", report_path.display()))?;
            let line = serde_json::to_string(&report).context("serializing offline report")?;
            writeln!(file, "{}", line)?;
        }
        return Ok(());
    }

    let bridge = Arc::new(TelemetryBridge::new(runner.params()));
    if args.serve {
        bridge.serve(args.bind)?;
    }
    bridge.publish_status("simulation running (Ctrl+C to stop)...");

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating simulation runtime")?;
    let metrics = runtime.block_on(runner.run_realtime(bridge))?;
    info!(
        "run finished: {} ticks, {} gated, {} published, {} publish failures",
        metrics.ticks, metrics.gated, metrics.published, metrics.publish_failures
    );

    Ok(())
}
