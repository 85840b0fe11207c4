use crate::math::{MatrixHelper, Vector3f};
use log::warn;
use ndarray::Array2;

const UNIT_DIAGONAL: Vector3f = Vector3f::new(1.0, 1.0, 1.0);

/// Soft-iron correction matrix derived from calibration parameters and
/// rebuilt only when those parameters change bit-for-bit.
#[derive(Debug, Clone)]
pub struct CorrectionMatrixCache {
    matrix: Array2<f32>,
    last_diagonals: Option<Vector3f>,
    last_offdiagonals: Option<Vector3f>,
    builds: u64,
}

impl CorrectionMatrixCache {
    pub fn new() -> Self {
        Self {
            matrix: MatrixHelper::identity3(),
            last_diagonals: None,
            last_offdiagonals: None,
            builds: 0,
        }
    }

    /// Symmetric calibration matrix, before inversion.
    pub fn build(diagonals: Vector3f, offdiagonals: Vector3f) -> Array2<f32> {
        let (d, o) = (diagonals, offdiagonals);
        MatrixHelper::from_rows([[d.x, o.x, o.y], [o.x, d.y, o.z], [o.y, o.z, d.z]])
    }

    /// Inverted correction matrix for the given parameters. A zero diagonal
    /// means no soft-iron scaling and is read as `(1, 1, 1)`; a singular
    /// matrix degrades to the identity.
    pub fn get(&mut self, diagonals: Vector3f, offdiagonals: Vector3f) -> &Array2<f32> {
        let diagonals = if diagonals.is_zero() {
            UNIT_DIAGONAL
        } else {
            diagonals
        };

        let unchanged = self
            .last_diagonals
            .zip(self.last_offdiagonals)
            .map_or(false, |(d, o)| d.bits_eq(&diagonals) && o.bits_eq(&offdiagonals));
        if unchanged {
            return &self.matrix;
        }

        let built = Self::build(diagonals, offdiagonals);
        self.matrix = MatrixHelper::invert3(built.view()).unwrap_or_else(|| {
            warn!(
                "singular soft-iron matrix (diag {:?}, offdiag {:?}); using identity",
                diagonals, offdiagonals
            );
            MatrixHelper::identity3()
        });
        self.last_diagonals = Some(diagonals);
        self.last_offdiagonals = Some(offdiagonals);
        self.builds += 1;
        &self.matrix
    }

    /// How many times the matrix has been rebuilt.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

impl Default for CorrectionMatrixCache {
    fn default() -> Self {
        Self::new()
    }
}
