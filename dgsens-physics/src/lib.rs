//! Flux physics for discontinuous Galerkin discretizations.
//!
//! All models describe the steady conservation law
//! $$
//! \nabla \cdot \left( \vec F_{conv}(\vec u) + \vec F_{diss}(\vec u, \nabla \vec u) \right) = \vec s(\vec x),
//! $$
//! where the source term $\vec s$ is chosen so that a known manufactured solution satisfies the
//! equation exactly.
//!
//! Fluxes are stored as `NSTATE x DIM` matrices: row `s` holds the flux vector of state `s`.
use dgsens_calculus::calculus::approximate_derivative_fd4;
use dgsens_traits::Real;
use nalgebra::{Point, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::f64::consts::{E, PI};
use std::fmt;
use std::fmt::Display;

pub mod euler;
pub mod manufactured;
pub mod navier_stokes;
pub mod scalar;

pub use euler::Euler;
pub use manufactured::ManufacturedSolution;
pub use navier_stokes::NavierStokes;
pub use scalar::{ConvectionDiffusion, Diffusion, LinearAdvection};

/// Step used when differentiating the manufactured fluxes in space.
pub const SOURCE_TERM_STEP: f64 = 1e-3;

/// Convective and dissipative fluxes of a conservation law with `NSTATE` states in `DIM` dimensions.
pub trait Physics<T, const DIM: usize, const NSTATE: usize>
where
    T: Real,
{
    /// Convective flux $\vec F_{conv}(\vec u)$.
    fn convective_flux(&self, solution: &SVector<T, NSTATE>) -> SMatrix<T, NSTATE, DIM>;

    /// Eigenvalues of the convective flux Jacobian projected onto `normal`.
    fn convective_eigenvalues(&self, solution: &SVector<T, NSTATE>, normal: &SVector<T, DIM>) -> SVector<T, NSTATE>;

    /// Spectral radius of the convective flux Jacobian over all unit normals.
    fn max_convective_eigenvalue(&self, solution: &SVector<T, NSTATE>) -> T;

    /// Dissipative flux $\vec F_{diss}(\vec u, \nabla \vec u)$.
    ///
    /// `solution_gradient` is `NSTATE x DIM`, row `s` is the gradient of state `s`.
    fn dissipative_flux(
        &self,
        solution: &SVector<T, NSTATE>,
        solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SMatrix<T, NSTATE, DIM>;

    /// The manufactured solution that defines the source term.
    fn manufactured_solution(&self) -> &ManufacturedSolution<T, DIM, NSTATE>;

    /// Source term $\vec s(\vec x)$.
    ///
    /// The default implementation ignores `solution` and returns the divergence of the total
    /// flux evaluated on the manufactured solution.
    fn source_term(&self, position: &Point<T, DIM>, solution: &SVector<T, NSTATE>) -> SVector<T, NSTATE> {
        let _ = solution;
        manufactured_source_term(self, position)
    }

    /// Exact functional of the manufactured solution over the unit cube, see
    /// [`ManufacturedSolution::integral_output`].
    fn integral_output(&self, linear: bool) -> T {
        self.manufactured_solution().integral_output(linear)
    }
}

/// Total flux $\vec F_{conv} + \vec F_{diss}$ of the manufactured solution at `position`.
pub fn manufactured_total_flux<T, P, const DIM: usize, const NSTATE: usize>(
    physics: &P,
    position: &Point<T, DIM>,
) -> SMatrix<T, NSTATE, DIM>
where
    T: Real,
    P: Physics<T, DIM, NSTATE> + ?Sized,
{
    let manufactured = physics.manufactured_solution();
    let u = manufactured.value(position);
    let u_grad = manufactured.gradient(position);
    physics.convective_flux(&u) + physics.dissipative_flux(&u, &u_grad)
}

/// Divergence of the total flux of the manufactured solution, using fourth-order central
/// differences with step [`SOURCE_TERM_STEP`].
pub fn manufactured_source_term<T, P, const DIM: usize, const NSTATE: usize>(
    physics: &P,
    position: &Point<T, DIM>,
) -> SVector<T, NSTATE>
where
    T: Real,
    P: Physics<T, DIM, NSTATE> + ?Sized,
{
    let h = T::from_f64(SOURCE_TERM_STEP).expect("step must fit in T");
    let mut source = SVector::zeros();
    for d in 0..DIM {
        let flux_d = |x_d: T| {
            let mut x = *position;
            x[d] = x_d;
            manufactured_total_flux(physics, &x).column(d).into_owned()
        };
        source += approximate_derivative_fd4(flux_d, position[d], h);
    }
    source
}

/// The partial differential equations supported by [`create_physics`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdeType {
    Advection,
    Diffusion,
    ConvectionDiffusion,
    Euler,
    NavierStokes,
}

impl PdeType {
    /// Number of states the equation needs in `dim` dimensions, or `None` if any count works.
    pub fn required_states(&self, dim: usize) -> Option<usize> {
        match self {
            PdeType::Advection | PdeType::Diffusion | PdeType::ConvectionDiffusion => None,
            PdeType::Euler | PdeType::NavierStokes => Some(dim + 2),
        }
    }
}

impl Display for PdeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PdeType::Advection => "advection",
            PdeType::Diffusion => "diffusion",
            PdeType::ConvectionDiffusion => "convection_diffusion",
            PdeType::Euler => "euler",
            PdeType::NavierStokes => "navier_stokes",
        };
        write!(f, "{}", name)
    }
}

/// Physical constants shared by all models.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParameters {
    /// Advection velocity; only the first `DIM` components are used.
    pub advection_velocity: [f64; 3],
    pub diffusion_coefficient: f64,
    pub gamma_gas: f64,
    pub mach_inf: f64,
    pub reynolds_inf: f64,
    pub prandtl_number: f64,
}

impl Default for PhysicsParameters {
    fn default() -> Self {
        Self {
            advection_velocity: [E / 2.0, -PI / 4.0, 2.0f64.sqrt()],
            diffusion_coefficient: 5.0,
            gamma_gas: 1.4,
            mach_inf: 0.5,
            reynolds_inf: 50000.0,
            prandtl_number: 0.72,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// The model requires a different number of states for the given dimension.
    IncompatibleStateDimension { dim: usize, nstate: usize, expected: usize },
}

impl Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::IncompatibleStateDimension { dim, nstate, expected } => write!(
                f,
                "Model in {} dimensions requires {} states, but {} were requested.",
                dim, expected, nstate
            ),
        }
    }
}

impl Error for PhysicsError {}

pub(crate) fn check_state_dimension<const DIM: usize, const NSTATE: usize>(
    expected: usize,
) -> Result<(), PhysicsError> {
    if NSTATE == expected {
        Ok(())
    } else {
        Err(PhysicsError::IncompatibleStateDimension {
            dim: DIM,
            nstate: NSTATE,
            expected,
        })
    }
}

pub(crate) fn from_f64<T: Real>(value: f64) -> T {
    T::from_f64(value).expect("value must fit in T")
}

/// Creates the physics model for `pde_type`.
pub fn create_physics<T, const DIM: usize, const NSTATE: usize>(
    pde_type: PdeType,
    parameters: &PhysicsParameters,
) -> Result<Box<dyn Physics<T, DIM, NSTATE>>, PhysicsError>
where
    T: Real,
{
    log::debug!("Creating {} physics with dim = {}, nstate = {}", pde_type, DIM, NSTATE);
    let physics: Box<dyn Physics<T, DIM, NSTATE>> = match pde_type {
        PdeType::Advection => Box::new(LinearAdvection::from_parameters(parameters)),
        PdeType::Diffusion => Box::new(Diffusion::from_parameters(parameters)),
        PdeType::ConvectionDiffusion => Box::new(ConvectionDiffusion::from_parameters(parameters)),
        PdeType::Euler => Box::new(Euler::from_parameters(parameters)?),
        PdeType::NavierStokes => Box::new(NavierStokes::from_parameters(parameters)?),
    };
    Ok(physics)
}
