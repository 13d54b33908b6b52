//! Linear scalar conservation laws.
//!
//! These models act on every state independently, so they are valid for any number of states
//! (e.g. vector-valued linear advection).
use crate::{from_f64, ManufacturedSolution, Physics, PhysicsParameters};
use dgsens_traits::Real;
use nalgebra::{SMatrix, SVector};

fn advection_speed<T: Real, const DIM: usize>(parameters: &PhysicsParameters) -> SVector<T, DIM> {
    SVector::from_fn(|d, _| from_f64(parameters.advection_velocity[d % 3]))
}

/// Linear advection with constant velocity $\vec c$.
///
/// Convective flux $\vec F_{conv} = \vec c \, u$, no dissipative flux.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearAdvection<T: Real, const DIM: usize, const NSTATE: usize> {
    pub velocity: SVector<T, DIM>,
    pub manufactured: ManufacturedSolution<T, DIM, NSTATE>,
}

impl<T: Real, const DIM: usize, const NSTATE: usize> LinearAdvection<T, DIM, NSTATE> {
    pub fn from_parameters(parameters: &PhysicsParameters) -> Self {
        Self {
            velocity: advection_speed(parameters),
            manufactured: ManufacturedSolution::unit(),
        }
    }
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Physics<T, DIM, NSTATE> for LinearAdvection<T, DIM, NSTATE> {
    fn convective_flux(&self, solution: &SVector<T, NSTATE>) -> SMatrix<T, NSTATE, DIM> {
        solution * self.velocity.transpose()
    }

    fn convective_eigenvalues(&self, _solution: &SVector<T, NSTATE>, normal: &SVector<T, DIM>) -> SVector<T, NSTATE> {
        SVector::repeat(self.velocity.dot(normal))
    }

    fn max_convective_eigenvalue(&self, _solution: &SVector<T, NSTATE>) -> T {
        self.velocity.norm()
    }

    fn dissipative_flux(
        &self,
        _solution: &SVector<T, NSTATE>,
        _solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SMatrix<T, NSTATE, DIM> {
        SMatrix::zeros()
    }

    fn manufactured_solution(&self) -> &ManufacturedSolution<T, DIM, NSTATE> {
        &self.manufactured
    }
}

/// Poisson-type diffusion, $\vec F_{diss} = -\kappa \nabla u$.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Diffusion<T: Real, const DIM: usize, const NSTATE: usize> {
    pub diffusion_coefficient: T,
    pub manufactured: ManufacturedSolution<T, DIM, NSTATE>,
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Diffusion<T, DIM, NSTATE> {
    pub fn from_parameters(parameters: &PhysicsParameters) -> Self {
        Self {
            diffusion_coefficient: from_f64(parameters.diffusion_coefficient),
            manufactured: ManufacturedSolution::unit(),
        }
    }
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Physics<T, DIM, NSTATE> for Diffusion<T, DIM, NSTATE> {
    fn convective_flux(&self, _solution: &SVector<T, NSTATE>) -> SMatrix<T, NSTATE, DIM> {
        SMatrix::zeros()
    }

    fn convective_eigenvalues(&self, _solution: &SVector<T, NSTATE>, _normal: &SVector<T, DIM>) -> SVector<T, NSTATE> {
        SVector::zeros()
    }

    fn max_convective_eigenvalue(&self, _solution: &SVector<T, NSTATE>) -> T {
        T::zero()
    }

    fn dissipative_flux(
        &self,
        _solution: &SVector<T, NSTATE>,
        solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SMatrix<T, NSTATE, DIM> {
        solution_gradient * (-self.diffusion_coefficient)
    }

    fn manufactured_solution(&self) -> &ManufacturedSolution<T, DIM, NSTATE> {
        &self.manufactured
    }
}

/// Linear advection combined with diffusion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConvectionDiffusion<T: Real, const DIM: usize, const NSTATE: usize> {
    pub advection: LinearAdvection<T, DIM, NSTATE>,
    pub diffusion: Diffusion<T, DIM, NSTATE>,
}

impl<T: Real, const DIM: usize, const NSTATE: usize> ConvectionDiffusion<T, DIM, NSTATE> {
    pub fn from_parameters(parameters: &PhysicsParameters) -> Self {
        Self {
            advection: LinearAdvection::from_parameters(parameters),
            diffusion: Diffusion::from_parameters(parameters),
        }
    }
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Physics<T, DIM, NSTATE> for ConvectionDiffusion<T, DIM, NSTATE> {
    fn convective_flux(&self, solution: &SVector<T, NSTATE>) -> SMatrix<T, NSTATE, DIM> {
        self.advection.convective_flux(solution)
    }

    fn convective_eigenvalues(&self, solution: &SVector<T, NSTATE>, normal: &SVector<T, DIM>) -> SVector<T, NSTATE> {
        self.advection.convective_eigenvalues(solution, normal)
    }

    fn max_convective_eigenvalue(&self, solution: &SVector<T, NSTATE>) -> T {
        self.advection.max_convective_eigenvalue(solution)
    }

    fn dissipative_flux(
        &self,
        solution: &SVector<T, NSTATE>,
        solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SMatrix<T, NSTATE, DIM> {
        self.diffusion.dissipative_flux(solution, solution_gradient)
    }

    fn manufactured_solution(&self) -> &ManufacturedSolution<T, DIM, NSTATE> {
        &self.advection.manufactured
    }
}
