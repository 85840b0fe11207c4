use crate::distribution::{BusNode, InstanceBinding};
use crate::prelude::{MagResult, MagSimError, MAX_ACCUMULATED_INSTANCES};
use crate::telemetry::LogManager;
use log::warn;
use std::sync::Arc;

/// Transport family encoded in the low three bits of a device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    Unknown,
    I2c,
    Spi,
    Uavcan,
    Sitl,
    Msp,
    Serial,
    Other(u8),
}

impl BusType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => BusType::Unknown,
            1 => BusType::I2c,
            2 => BusType::Spi,
            3 => BusType::Uavcan,
            4 => BusType::Sitl,
            5 => BusType::Msp,
            6 => BusType::Serial,
            other => BusType::Other(other),
        }
    }
}

/// Packed 32-bit device identifier: bus type (bits 0-2), bus (3-7),
/// address (8-15), device type (16-23).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub raw: u32,
    pub bus_type: BusType,
    pub bus: u8,
    pub address: u8,
    pub devtype: u8,
}

impl DeviceId {
    pub fn decode(raw: u32) -> Self {
        Self {
            raw,
            bus_type: BusType::from_bits((raw & 0x07) as u8),
            bus: ((raw >> 3) & 0x1f) as u8,
            address: ((raw >> 8) & 0xff) as u8,
            devtype: ((raw >> 16) & 0xff) as u8,
        }
    }

    pub fn encode(bus_type_bits: u8, bus: u8, address: u8, devtype: u8) -> u32 {
        u32::from(bus_type_bits & 0x07)
            | (u32::from(bus & 0x1f) << 3)
            | (u32::from(address) << 8)
            | (u32::from(devtype) << 16)
    }

    pub fn is_networked(&self) -> bool {
        self.bus_type == BusType::Uavcan
    }
}

/// Instance bindings resolved once at start-up.
#[derive(Debug, Clone)]
pub struct BindingPlan {
    bindings: Vec<InstanceBinding>,
}

impl BindingPlan {
    pub fn new(bindings: Vec<InstanceBinding>) -> MagResult<Self> {
        if bindings.is_empty() {
            return Err(MagSimError::NoInstances);
        }
        Ok(Self { bindings })
    }

    /// Resolves configured device ids. Zero ids are unused slots; networked
    /// ids bind to the node returned by `node_for(bus, address)` and publish
    /// as sensor `devtype - 1`; every other id becomes the next in-process
    /// instance, up to the in-process limit.
    pub fn from_device_ids<F>(device_ids: &[u32], mut node_for: F) -> MagResult<Self>
    where
        F: FnMut(u8, u8) -> Arc<BusNode>,
    {
        let logger = LogManager::for_source("bindings");
        let mut bindings = Vec::new();
        let mut next_instance: u8 = 0;

        for &raw in device_ids.iter().filter(|&&raw| raw != 0) {
            let id = DeviceId::decode(raw);
            if id.is_networked() {
                let sensor_id = id
                    .devtype
                    .checked_sub(1)
                    .ok_or(MagSimError::InvalidDeviceId(raw))?;
                let node = node_for(id.bus, id.address);
                logger.record(&format!(
                    "device {:#x} -> bus node {}:{} sensor {}",
                    raw, id.bus, id.address, sensor_id
                ));
                bindings.push(InstanceBinding::BusNode { node, sensor_id });
                continue;
            }

            if usize::from(next_instance) >= MAX_ACCUMULATED_INSTANCES {
                warn!("device {:#x} ignored: in-process instance limit reached", raw);
                continue;
            }
            logger.record(&format!("device {:#x} -> instance {}", raw, next_instance));
            bindings.push(InstanceBinding::Accumulate {
                instance: next_instance,
            });
            next_instance += 1;
        }

        Self::new(bindings)
    }

    pub fn bindings(&self) -> &[InstanceBinding] {
        &self.bindings
    }

    pub fn into_bindings(self) -> Vec<InstanceBinding> {
        self.bindings
    }

    pub fn accumulate_instances(&self) -> Vec<u8> {
        self.bindings
            .iter()
            .filter_map(|binding| match binding {
                InstanceBinding::Accumulate { instance } => Some(*instance),
                InstanceBinding::BusNode { .. } => None,
            })
            .collect()
    }

    pub fn bus_node_count(&self) -> usize {
        self.bindings.len() - self.accumulate_instances().len()
    }
}
