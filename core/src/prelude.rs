/// Minimum spacing between executed ticks (100 Hz sensor rate).
pub const SAMPLE_INTERVAL_MS: u32 = 10;
/// Minimum spacing between delay-line stores.
pub const STORE_INTERVAL_MS: u32 = 10;
/// Number of samples retained by the delay line.
pub const DELAY_LINE_CAPACITY: usize = 50;
/// A delay-line match is usable only when strictly closer than this.
pub const DELAY_VALIDITY_MS: u32 = 1000;
/// Weight handed to the accumulation sink with every in-process sample.
pub const ACCUMULATE_WEIGHT: u32 = 10;
/// Upper bound on in-process (non-networked) instances.
pub const MAX_ACCUMULATED_INSTANCES: usize = 3;

/// Milliseconds elapsed from `since` to `now` on a wrapping 32-bit clock.
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Setup and configuration failures. The tick path itself never fails.
#[derive(thiserror::Error, Debug)]
pub enum MagSimError {
    #[error("no magnetometer instances configured")]
    NoInstances,
    #[error("invalid device id {0:#010x}")]
    InvalidDeviceId(u32),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures reported by a bus transport.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

pub type MagResult<T> = Result<T, MagSimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_handles_clock_wrap() {
        assert_eq!(elapsed_ms(15, 5), 10);
        assert_eq!(elapsed_ms(4, u32::MAX - 5), 10);
    }
}
