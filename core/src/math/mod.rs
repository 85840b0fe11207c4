pub mod matrix;
pub mod rotation;
pub mod vector;

pub use matrix::MatrixHelper;
pub use rotation::Rotation;
pub use vector::Vector3f;
