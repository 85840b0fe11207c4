use magcore::math::Vector3f;
use magcore::pipeline::FieldSource;
use magcore::{MagResult, MagSimError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound on configured yaw rates.
const MAX_RATE_DPS: f32 = 3600.0;

/// Vehicle motion used to derive the body-frame truth field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Earth field in the local NED frame, milligauss.
    pub earth_field: Vector3f,
    pub initial_heading_deg: f32,
    pub yaw_rate_dps: f32,
    /// Peak random yaw-rate perturbation per step.
    pub heading_wander_dps: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            earth_field: Vector3f::new(200.0, 0.0, 400.0),
            initial_heading_deg: 0.0,
            yaw_rate_dps: 0.0,
            heading_wander_dps: 0.0,
        }
    }
}

impl FieldConfig {
    pub fn validate(&self) -> MagResult<()> {
        let f = self.earth_field;
        if !(f.x.is_finite() && f.y.is_finite() && f.z.is_finite()) {
            return Err(MagSimError::InvalidConfig("earth_field must be finite".into()));
        }
        if !self.initial_heading_deg.is_finite() {
            return Err(MagSimError::InvalidConfig(
                "initial_heading_deg must be finite".into(),
            ));
        }
        for (name, value) in [
            ("yaw_rate_dps", self.yaw_rate_dps),
            ("heading_wander_dps", self.heading_wander_dps),
        ] {
            if !value.is_finite() || value < 0.0 || value > MAX_RATE_DPS {
                return Err(MagSimError::InvalidConfig(format!(
                    "{} must be within 0..={} deg/s, got {}",
                    name, MAX_RATE_DPS, value
                )));
            }
        }
        Ok(())
    }
}

/// Rotates an NED field into a level body frame with the given heading.
pub fn body_from_heading(ned: Vector3f, heading_deg: f32) -> Vector3f {
    let (s, c) = heading_deg.to_radians().sin_cos();
    Vector3f::new(c * ned.x + s * ned.y, -s * ned.x + c * ned.y, ned.z)
}

/// Truth source for a level vehicle turning at a configurable rate.
pub struct EarthFieldGenerator {
    config: FieldConfig,
    heading_deg: f32,
    last_ms: Option<u32>,
    rng: StdRng,
}

impl EarthFieldGenerator {
    pub fn new(config: FieldConfig, seed: u64) -> Self {
        Self {
            heading_deg: config.initial_heading_deg.rem_euclid(360.0),
            config,
            last_ms: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn heading_deg(&self) -> f32 {
        self.heading_deg
    }
}

impl FieldSource for EarthFieldGenerator {
    fn body_field(&mut self, now_ms: u32) -> Vector3f {
        if let Some(last) = self.last_ms {
            let dt = now_ms.wrapping_sub(last) as f32 / 1000.0;
            let wander = self.config.heading_wander_dps;
            let jitter = if wander > 0.0 {
                self.rng.gen_range(-wander..wander)
            } else {
                0.0
            };
            self.heading_deg =
                (self.heading_deg + (self.config.yaw_rate_dps + jitter) * dt).rem_euclid(360.0);
        }
        self.last_ms = Some(now_ms);
        body_from_heading(self.config.earth_field, self.heading_deg)
    }
}
