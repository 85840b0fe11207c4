use crate::math::Vector3f;
use crate::prelude::BusError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Wire message broadcast by a networked magnetometer node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticFieldStrength {
    pub sensor_id: u8,
    pub magnetic_field_ga: [f64; 3],
}

impl MagneticFieldStrength {
    pub fn from_milligauss(sensor_id: u8, field: Vector3f) -> Self {
        Self {
            sensor_id,
            magnetic_field_ga: [
                f64::from(field.x) / 1000.0,
                f64::from(field.y) / 1000.0,
                f64::from(field.z) / 1000.0,
            ],
        }
    }
}

/// Publish primitive behind a simulated bus node.
pub trait BusTransport: Send {
    fn broadcast(&mut self, message: &MagneticFieldStrength) -> Result<(), BusError>;
}

/// A simulated networked sensor endpoint. The transport mutex is the node's
/// exclusive publish lock.
pub struct BusNode {
    bus: u8,
    address: u8,
    transport: Mutex<Box<dyn BusTransport>>,
}

impl BusNode {
    pub fn new(bus: u8, address: u8, transport: impl BusTransport + 'static) -> Self {
        let transport: Box<dyn BusTransport> = Box::new(transport);
        Self {
            bus,
            address,
            transport: Mutex::new(transport),
        }
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Builds and sends one message while holding the node lock.
    pub fn publish(&self, sensor_id: u8, field_ga: [f64; 3]) -> Result<(), BusError> {
        let mut transport = self.transport.lock().map_err(|_| {
            BusError::Unavailable(format!("node {}:{} lock poisoned", self.bus, self.address))
        })?;
        let message = MagneticFieldStrength {
            sensor_id,
            magnetic_field_ga: field_ga,
        };
        transport.broadcast(&message)
    }

    /// True when no publish currently holds the node lock.
    pub fn is_idle(&self) -> bool {
        self.transport.try_lock().is_ok()
    }
}

impl std::fmt::Debug for BusNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusNode")
            .field("bus", &self.bus)
            .field("address", &self.address)
            .finish()
    }
}

/// Read side of a [`RecordingTransport`].
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Arc<Mutex<Vec<MagneticFieldStrength>>>,
}

impl MessageLog {
    pub fn messages(&self) -> Vec<MagneticFieldStrength> {
        if let Ok(messages) = self.messages.lock() {
            messages.clone()
        } else {
            Vec::new()
        }
    }

    pub fn latest(&self) -> Option<MagneticFieldStrength> {
        self.messages.lock().ok()?.last().copied()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map_or(0, |messages| messages.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loopback transport that keeps the most recent `capacity` messages.
pub struct RecordingTransport {
    log: MessageLog,
    capacity: usize,
}

impl RecordingTransport {
    pub fn new() -> (Self, MessageLog) {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> (Self, MessageLog) {
        let log = MessageLog::default();
        let transport = Self {
            log: log.clone(),
            capacity: capacity.max(1),
        };
        (transport, log)
    }
}

impl BusTransport for RecordingTransport {
    fn broadcast(&mut self, message: &MagneticFieldStrength) -> Result<(), BusError> {
        let mut messages = self
            .log
            .messages
            .lock()
            .map_err(|_| BusError::SendFailed("message log poisoned".into()))?;
        if messages.len() >= self.capacity {
            messages.remove(0);
        }
        messages.push(*message);
        Ok(())
    }
}

/// Transport that rejects every message.
#[derive(Debug, Default)]
pub struct FailingTransport;

impl BusTransport for FailingTransport {
    fn broadcast(&mut self, _message: &MagneticFieldStrength) -> Result<(), BusError> {
        Err(BusError::SendFailed("bus offline".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_records_message() {
        let (transport, log) = RecordingTransport::new();
        let node = BusNode::new(1, 125, transport);
        node.publish(2, [0.2, 0.0, 0.4]).unwrap();

        let message = log.latest().unwrap();
        assert_eq!(message.sensor_id, 2);
        assert_eq!(message.magnetic_field_ga, [0.2, 0.0, 0.4]);
        assert!(node.is_idle());
    }

    #[test]
    fn failed_publish_releases_lock() {
        let node = BusNode::new(0, 10, FailingTransport::default());
        assert!(node.publish(0, [0.0; 3]).is_err());
        assert!(node.is_idle());
        assert!(node.publish(0, [0.0; 3]).is_err());
    }

    #[test]
    fn recording_transport_is_bounded() {
        let (transport, log) = RecordingTransport::with_capacity(2);
        let node = BusNode::new(0, 1, transport);
        for id in 0..3 {
            node.publish(id, [0.0; 3]).unwrap();
        }
        let ids: Vec<u8> = log.messages().iter().map(|m| m.sensor_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn milligauss_convert_to_gauss() {
        let message = MagneticFieldStrength::from_milligauss(3, Vector3f::new(200.0, -500.0, 400.0));
        assert_eq!(message.magnetic_field_ga, [0.2, -0.5, 0.4]);
    }
}
