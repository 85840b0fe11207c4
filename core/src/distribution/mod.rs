pub mod bus;
pub mod fanout;
pub mod sink;

pub use bus::{BusNode, BusTransport, MagneticFieldStrength, RecordingTransport};
pub use fanout::{DistributionFanout, Emission, FanoutCounts, InstanceBinding};
pub use sink::{AccumulationSink, AveragingSink};
