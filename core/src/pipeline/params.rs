use crate::math::{Rotation, Vector3f};
use crate::prelude::{MagResult, MagSimError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Operator-tunable magnetometer simulation parameters. Fields are in
/// milligauss unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagParams {
    pub noise: f32,
    pub delay_ms: u32,
    /// Hard-iron offset subtracted after soft-iron correction.
    pub offsets: Vector3f,
    /// Soft-iron diagonal; all zeros means no scaling.
    pub diagonals: Vector3f,
    pub offdiagonals: Vector3f,
    /// Synthetic misalignment undone on the primary instance.
    pub orientation: Rotation,
    pub board_orientation: Rotation,
    /// Gain error applied to the primary instance.
    pub scaling: f32,
}

impl Default for MagParams {
    fn default() -> Self {
        Self {
            noise: 0.0,
            delay_ms: 0,
            offsets: Vector3f::ZERO,
            diagonals: Vector3f::ZERO,
            offdiagonals: Vector3f::ZERO,
            orientation: Rotation::None,
            board_orientation: Rotation::None,
            scaling: 1.0,
        }
    }
}

impl MagParams {
    pub fn validate(&self) -> MagResult<()> {
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(MagSimError::InvalidConfig(format!(
                "noise must be a non-negative number, got {}",
                self.noise
            )));
        }
        if !self.scaling.is_finite() {
            return Err(MagSimError::InvalidConfig("scaling must be finite".into()));
        }
        Ok(())
    }
}

/// Parameters shared with the operator; read afresh on every tick.
pub type SharedParams = Arc<RwLock<MagParams>>;

pub fn shared(params: MagParams) -> SharedParams {
    Arc::new(RwLock::new(params))
}

pub fn read_params(params: &SharedParams) -> MagParams {
    match params.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Source of the true body-frame magnetic field, in milligauss.
pub trait FieldSource: Send {
    fn body_field(&mut self, now_ms: u32) -> Vector3f;
}

impl<F> FieldSource for F
where
    F: FnMut(u32) -> Vector3f + Send,
{
    fn body_field(&mut self, now_ms: u32) -> Vector3f {
        self(now_ms)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantField(pub Vector3f);

impl FieldSource for ConstantField {
    fn body_field(&mut self, _now_ms: u32) -> Vector3f {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_params_fill_defaults() {
        let params: MagParams =
            serde_json::from_str(r#"{"delay_ms": 50, "offsets": [5.0, 13.0, -18.0]}"#).unwrap();
        assert_eq!(params.delay_ms, 50);
        assert_eq!(params.offsets, Vector3f::new(5.0, 13.0, -18.0));
        assert_eq!(params.scaling, 1.0);
        assert_eq!(params.orientation, Rotation::None);
    }

    #[test]
    fn negative_noise_is_rejected() {
        let params = MagParams {
            noise: -1.0,
            ..MagParams::default()
        };
        assert!(params.validate().is_err());
        assert!(MagParams::default().validate().is_ok());
    }

    #[test]
    fn shared_params_reflect_edits() {
        let params = shared(MagParams::default());
        params.write().unwrap().delay_ms = 20;
        assert_eq!(read_params(&params).delay_ms, 20);
    }
}
