//! Finite-difference verification of second derivatives of discretized residuals.
//!
//! The central question answered by this crate is whether the Hessian
//! $\pdd{(\vec \psi \cdot \vec R)}{w_i}{w_j}$ of a discontinuous Galerkin residual $\vec R(\vec w)$,
//! contracted with a dual vector $\vec \psi$, agrees with an independent high-order
//! finite-difference approximation. The residual is treated as a black box behind
//! [`system::DgSystem`], and every residual evaluation is a collective operation over all
//! ranks of a [`comm::Communicator`].
//!
//! The building blocks, leaves first:
//!
//! - [`dofs`] and [`vector`]: ownership of degrees of freedom and distributed vectors.
//! - [`sparse`]: sparsity queries, the distributed sparse accumulator and finalized matrices.
//! - [`perturbation`]: scoped perturbation of the solution and the collective
//!   [`perturbation::ResidualService`].
//! - [`stencil`]: the 25-sample mixed partial evaluator.
//! - [`hessian`]: the finite-difference Hessian assembler.
//! - [`compare`] and [`io`]: norm-based comparison against a reference and dense dumps.
//! - [`verify`]: the end-to-end verification driver and suite.
pub mod comm;
pub mod compare;
pub mod dofs;
pub mod error;
pub mod hessian;
pub mod io;
pub mod perturbation;
pub mod sparse;
pub mod stencil;
pub mod system;
pub mod vector;
pub mod verify;

pub use error::MatrixError;

pub mod calculus {
    pub use dgsens_calculus::*;
}

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
