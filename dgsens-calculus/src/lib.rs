//! Numerical differentiation for verifying derivatives of discretized operators.

/// Central finite differences for first derivatives
pub mod calculus;
/// High-order stencils for mixed second partial derivatives
pub mod stencil;
