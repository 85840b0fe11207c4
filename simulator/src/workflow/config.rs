use crate::generator::field::FieldConfig;
use anyhow::Context;
use magcore::device::DeviceId;
use magcore::pipeline::MagParams;
use magcore::{MagResult, MagSimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Packed device ids; zero entries are unused slots.
    pub device_ids: Vec<u32>,
    pub params: MagParams,
    pub field: FieldConfig,
    pub tick_interval_ms: u32,
    pub read_interval_ms: u32,
    /// Real-time runs stop after this long; `None` runs until Ctrl+C.
    pub duration_ms: Option<u64>,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            device_ids: vec![
                DeviceId::encode(4, 0, 0, 1),
                DeviceId::encode(4, 0, 0, 2),
                DeviceId::encode(3, 0, 125, 1),
            ],
            params: MagParams::default(),
            field: FieldConfig::default(),
            tick_interval_ms: 1,
            read_interval_ms: 20,
            duration_ms: None,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulation config {}", path_ref.display()))?;
        let config: SimulationConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulation config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating simulation config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, seed: Option<u64>, duration_ms: Option<u64>) {
        if let Some(seed) = seed {
            self.seed = seed;
        }
        if duration_ms.is_some() {
            self.duration_ms = duration_ms;
        }
    }

    pub fn validate(&self) -> MagResult<()> {
        if self.tick_interval_ms == 0 || self.read_interval_ms == 0 {
            return Err(MagSimError::InvalidConfig(
                "tick and read intervals must be positive".into(),
            ));
        }
        if self.device_ids.iter().all(|&id| id == 0) {
            return Err(MagSimError::NoInstances);
        }
        self.field.validate()?;
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magcore::math::{Rotation, Vector3f};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimulationConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.device_ids.len(), 3);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"device_ids: [97539, 0]\n\
              params:\n  noise: 2.5\n  delay_ms: 30\n  offsets: [5.0, 13.0, -18.0]\n  orientation: yaw45\n\
              field:\n  yaw_rate_dps: 10.0\n\
              read_interval_ms: 50\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = SimulationConfig::load(&path).unwrap();
        assert_eq!(cfg.device_ids, vec![97539, 0]);
        assert_eq!(cfg.params.delay_ms, 30);
        assert_eq!(cfg.params.offsets, Vector3f::new(5.0, 13.0, -18.0));
        assert_eq!(cfg.params.orientation, Rotation::Yaw45);
        assert_eq!(cfg.field.yaw_rate_dps, 10.0);
        assert_eq!(cfg.read_interval_ms, 50);
        assert_eq!(cfg.tick_interval_ms, 1);
    }

    #[test]
    fn config_without_devices_is_rejected() {
        let cfg = SimulationConfig {
            device_ids: vec![0, 0],
            ..SimulationConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn infinite_heading_wander_is_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"field:\n  heading_wander_dps: .inf\n").unwrap();
        let path = temp.into_temp_path();
        let err = SimulationConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("heading_wander_dps"));
    }

    #[test]
    fn overrides_replace_seed_and_duration() {
        let mut cfg = SimulationConfig::default();
        cfg.apply_overrides(Some(9), None);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.duration_ms, None);
        cfg.apply_overrides(None, Some(250));
        assert_eq!(cfg.duration_ms, Some(250));
    }
}
