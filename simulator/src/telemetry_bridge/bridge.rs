use crate::telemetry_bridge::model::TelemetryModel;
use anyhow::{anyhow, Context, Result};
use log::info;
use magcore::pipeline::params::read_params;
use magcore::pipeline::{MagParams, SharedParams};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

/// Bridge that serves the latest readings over HTTP and accepts operator
/// parameter edits.
pub struct TelemetryBridge {
    state: Arc<RwLock<TelemetryModel>>,
    params: SharedParams,
}

impl TelemetryBridge {
    pub fn new(params: SharedParams) -> Self {
        Self {
            state: Arc::new(RwLock::new(TelemetryModel::default())),
            params,
        }
    }

    /// Starts the HTTP endpoint on its own thread and runtime.
    pub fn serve(&self, addr: SocketAddr) -> Result<()> {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let params = self.params.clone();
        let params_filter = warp::any().map(move || params.clone());

        let readings_route = warp::path("readings")
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<TelemetryModel>>| {
                let model = state.read().map(|guard| guard.clone()).unwrap_or_default();
                warp::reply::json(&model)
            });

        let get_params_route = warp::path("params")
            .and(warp::get())
            .and(params_filter.clone())
            .map(|params: SharedParams| warp::reply::json(&read_params(&params)));

        let set_params_route = warp::path("params")
            .and(warp::post())
            .and(warp::body::json())
            .and(params_filter)
            .map(|update: MagParams, params: SharedParams| match update.validate() {
                Ok(()) => match params.write() {
                    Ok(mut guard) => {
                        *guard = update;
                        info!("operator updated magnetometer parameters");
                        warp::reply::with_status(
                            warp::reply::json(&json!({"status": "ok"})),
                            StatusCode::OK,
                        )
                    }
                    Err(_) => warp::reply::with_status(
                        warp::reply::json(&json!({"status": "error", "message": "parameters unavailable"})),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ),
                },
                Err(err) => warp::reply::with_status(
                    warp::reply::json(&json!({"status": "error", "message": err.to_string()})),
                    StatusCode::BAD_REQUEST,
                ),
            });

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building telemetry bridge runtime")?;
        thread::spawn(move || {
            let routes = readings_route.or(get_params_route).or(set_params_route);
            runtime.block_on(async move {
                warp::serve(routes).run(addr).await;
            });
        });

        info!("telemetry bridge listening on http://{}", addr);
        Ok(())
    }

    pub fn publish(&self, model: TelemetryModel) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| anyhow!("telemetry state lock poisoned"))?;
        *guard = model;
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        info!("[bridge] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> TelemetryModel {
        self.state.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::SimulationConfig;
    use crate::workflow::runner::Runner;
    use magcore::pipeline::ManualClock;

    #[test]
    fn bridge_updates_state() {
        let runner = Runner::new(SimulationConfig::default());
        let bridge = TelemetryBridge::new(runner.params());
        let mut rig = runner.build(ManualClock::starting_at(50)).unwrap();
        rig.driver.tick();

        let model = TelemetryModel {
            readings: rig.reader.read(),
            bus_messages: rig.bus_logs.iter().filter_map(|log| log.latest()).collect(),
            metrics: rig.driver.metrics().snapshot(),
        };
        bridge.publish(model).unwrap();

        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.readings.len(), 2);
        assert_eq!(snapshot.bus_messages.len(), 1);
        assert_eq!(snapshot.metrics.ticks, 1);
    }
}
