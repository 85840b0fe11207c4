use log::{debug, info};
use std::fmt;

/// Thin wrapper over the `log` facade that tags messages with their source.
pub struct LogManager {
    source: &'static str,
}

impl LogManager {
    pub fn new() -> Self {
        Self::for_source("magsim")
    }

    pub fn for_source(source: &'static str) -> Self {
        Self { source }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.source, message);
    }

    pub fn trace_tick(&self, args: fmt::Arguments<'_>) {
        debug!("[{}] {}", self.source, args);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
