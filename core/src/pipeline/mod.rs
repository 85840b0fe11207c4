pub mod clock;
pub mod driver;
pub mod params;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use driver::{DrainedReading, PipelineDriver, PipelineState, ReadHandle, TickOutcome};
pub use params::{ConstantField, FieldSource, MagParams, SharedParams};
