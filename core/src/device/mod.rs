pub mod binding;

pub use binding::{BindingPlan, BusType, DeviceId};
