use crate::math::matrix::MatrixHelper;
use crate::math::vector::Vector3f;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Sensor or board mounting orientation. Discriminants follow the numbering
/// used by the flight-control parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None = 0,
    Yaw45 = 1,
    Yaw90 = 2,
    Yaw135 = 3,
    Yaw180 = 4,
    Yaw225 = 5,
    Yaw270 = 6,
    Yaw315 = 7,
    Roll180 = 8,
    Roll180Yaw45 = 9,
    Roll180Yaw90 = 10,
    Roll180Yaw135 = 11,
    Pitch180 = 12,
    Roll180Yaw225 = 13,
    Roll180Yaw270 = 14,
    Roll180Yaw315 = 15,
    Roll90 = 16,
    Roll90Yaw45 = 17,
    Roll90Yaw90 = 18,
    Roll90Yaw135 = 19,
    Roll270 = 20,
    Roll270Yaw45 = 21,
    Roll270Yaw90 = 22,
    Roll270Yaw135 = 23,
    Pitch90 = 24,
    Pitch270 = 25,
}

impl Rotation {
    /// Roll, pitch and yaw in degrees.
    pub fn euler_deg(self) -> (f32, f32, f32) {
        match self {
            Rotation::None => (0.0, 0.0, 0.0),
            Rotation::Yaw45 => (0.0, 0.0, 45.0),
            Rotation::Yaw90 => (0.0, 0.0, 90.0),
            Rotation::Yaw135 => (0.0, 0.0, 135.0),
            Rotation::Yaw180 => (0.0, 0.0, 180.0),
            Rotation::Yaw225 => (0.0, 0.0, 225.0),
            Rotation::Yaw270 => (0.0, 0.0, 270.0),
            Rotation::Yaw315 => (0.0, 0.0, 315.0),
            Rotation::Roll180 => (180.0, 0.0, 0.0),
            Rotation::Roll180Yaw45 => (180.0, 0.0, 45.0),
            Rotation::Roll180Yaw90 => (180.0, 0.0, 90.0),
            Rotation::Roll180Yaw135 => (180.0, 0.0, 135.0),
            Rotation::Pitch180 => (0.0, 180.0, 0.0),
            Rotation::Roll180Yaw225 => (180.0, 0.0, 225.0),
            Rotation::Roll180Yaw270 => (180.0, 0.0, 270.0),
            Rotation::Roll180Yaw315 => (180.0, 0.0, 315.0),
            Rotation::Roll90 => (90.0, 0.0, 0.0),
            Rotation::Roll90Yaw45 => (90.0, 0.0, 45.0),
            Rotation::Roll90Yaw90 => (90.0, 0.0, 90.0),
            Rotation::Roll90Yaw135 => (90.0, 0.0, 135.0),
            Rotation::Roll270 => (270.0, 0.0, 0.0),
            Rotation::Roll270Yaw45 => (270.0, 0.0, 45.0),
            Rotation::Roll270Yaw90 => (270.0, 0.0, 90.0),
            Rotation::Roll270Yaw135 => (270.0, 0.0, 135.0),
            Rotation::Pitch90 => (0.0, 90.0, 0.0),
            Rotation::Pitch270 => (0.0, 270.0, 0.0),
        }
    }

    /// Direction cosine matrix for the Z-Y-X Euler sequence. Entries within
    /// 1e-6 of zero are snapped so right-angle rotations are exact.
    pub fn matrix(self) -> Array2<f32> {
        let (roll, pitch, yaw) = self.euler_deg();
        let (sr, cr) = roll.to_radians().sin_cos();
        let (sp, cp) = pitch.to_radians().sin_cos();
        let (sy, cy) = yaw.to_radians().sin_cos();

        let mut m = MatrixHelper::from_rows([
            [cp * cy, sr * sp * cy - cr * sy, cr * sp * cy + sr * sy],
            [cp * sy, sr * sp * sy + cr * cy, cr * sp * sy - sr * cy],
            [-sp, sr * cp, cr * cp],
        ]);
        m.mapv_inplace(|value| if value.abs() < 1e-6 { 0.0 } else { value });
        m
    }

    pub fn rotate(self, v: Vector3f) -> Vector3f {
        if self == Rotation::None {
            return v;
        }
        MatrixHelper::mul_vec(self.matrix().view(), v)
    }

    pub fn rotate_inverse(self, v: Vector3f) -> Vector3f {
        if self == Rotation::None {
            return v;
        }
        MatrixHelper::mul_vec(self.matrix().t(), v)
    }
}
