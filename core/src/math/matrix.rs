use crate::math::vector::Vector3f;
use ndarray::{arr1, array, Array2, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiply two 2D arrays (all f32 for simplicity).
    pub fn multiply(lhs: ArrayView2<f32>, rhs: ArrayView2<f32>) -> Array2<f32> {
        lhs.dot(&rhs)
    }

    pub fn identity3() -> Array2<f32> {
        Array2::eye(3)
    }

    pub fn from_rows(rows: [[f32; 3]; 3]) -> Array2<f32> {
        array![
            [rows[0][0], rows[0][1], rows[0][2]],
            [rows[1][0], rows[1][1], rows[1][2]],
            [rows[2][0], rows[2][1], rows[2][2]],
        ]
    }

    pub fn determinant3(m: ArrayView2<f32>) -> f32 {
        debug_assert_eq!(m.dim(), (3, 3));
        m[[0, 0]] * (m[[1, 1]] * m[[2, 2]] - m[[1, 2]] * m[[2, 1]])
            - m[[0, 1]] * (m[[1, 0]] * m[[2, 2]] - m[[1, 2]] * m[[2, 0]])
            + m[[0, 2]] * (m[[1, 0]] * m[[2, 1]] - m[[1, 1]] * m[[2, 0]])
    }

    /// Cofactor inverse of a 3x3 matrix. Returns `None` when the determinant
    /// is within `f32::EPSILON` of zero.
    pub fn invert3(m: ArrayView2<f32>) -> Option<Array2<f32>> {
        let det = Self::determinant3(m);
        if det.abs() < f32::EPSILON {
            return None;
        }

        let adjugate = array![
            [
                m[[1, 1]] * m[[2, 2]] - m[[1, 2]] * m[[2, 1]],
                m[[0, 2]] * m[[2, 1]] - m[[0, 1]] * m[[2, 2]],
                m[[0, 1]] * m[[1, 2]] - m[[0, 2]] * m[[1, 1]],
            ],
            [
                m[[1, 2]] * m[[2, 0]] - m[[1, 0]] * m[[2, 2]],
                m[[0, 0]] * m[[2, 2]] - m[[0, 2]] * m[[2, 0]],
                m[[0, 2]] * m[[1, 0]] - m[[0, 0]] * m[[1, 2]],
            ],
            [
                m[[1, 0]] * m[[2, 1]] - m[[1, 1]] * m[[2, 0]],
                m[[0, 1]] * m[[2, 0]] - m[[0, 0]] * m[[2, 1]],
                m[[0, 0]] * m[[1, 1]] - m[[0, 1]] * m[[1, 0]],
            ],
        ];

        Some(adjugate / det)
    }

    pub fn mul_vec(m: ArrayView2<f32>, v: Vector3f) -> Vector3f {
        let out = m.dot(&arr1(&v.to_array()));
        Vector3f::new(out[0], out[1], out[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_recovers_identity() {
        let m = MatrixHelper::from_rows([[2.0, 0.1, 0.2], [0.1, 1.5, 0.3], [0.2, 0.3, 1.0]]);
        let inv = MatrixHelper::invert3(m.view()).unwrap();
        let product = MatrixHelper::multiply(inv.view(), m.view());
        let eye = MatrixHelper::identity3();
        for (a, b) in product.iter().zip(eye.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = MatrixHelper::from_rows([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]]);
        assert!(MatrixHelper::invert3(m.view()).is_none());
    }

    #[test]
    fn mul_vec_applies_rows() {
        let m = MatrixHelper::from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let v = MatrixHelper::mul_vec(m.view(), Vector3f::new(1.0, 2.0, 3.0));
        assert_eq!(v, Vector3f::new(-2.0, 1.0, 3.0));
    }
}
