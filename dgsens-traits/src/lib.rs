use nalgebra::RealField;

pub use nalgebra;

/// Scalar type used throughout `dgsens`.
///
/// A trait alias for real fields that are cheap to copy, such as `f32` and `f64`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
