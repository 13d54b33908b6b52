use crate::{check_state_dimension, from_f64, ManufacturedSolution, Physics, PhysicsError, PhysicsParameters};
use dgsens_traits::Real;
use nalgebra::{SMatrix, SVector};
use numeric_literals::replace_float_literals;

/// The compressible Euler equations for a calorically perfect gas.
///
/// The conservative state is $\vec u = (\rho, \rho \vec v, e)$, so `NSTATE` must equal `DIM + 2`.
/// The convective flux in direction $d$ is
/// $$
/// \vec f_d = \left( \rho v_d, \; \rho \vec v v_d + p \vec e_d, \; v_d (e + p) \right),
/// \qquad p = (\gamma - 1) \left( e - \tfrac{1}{2} \rho \| \vec v \|^2 \right),
/// $$
/// and there is no dissipative flux.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Euler<T: Real, const DIM: usize, const NSTATE: usize> {
    pub gamma_gas: T,
    pub manufactured: ManufacturedSolution<T, DIM, NSTATE>,
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Euler<T, DIM, NSTATE> {
    pub fn new(gamma_gas: T) -> Result<Self, PhysicsError> {
        check_state_dimension::<DIM, NSTATE>(DIM + 2)?;
        Ok(Self {
            gamma_gas,
            manufactured: gas_manufactured_solution(),
        })
    }

    pub fn from_parameters(parameters: &PhysicsParameters) -> Result<Self, PhysicsError> {
        Self::new(from_f64(parameters.gamma_gas))
    }

    pub fn density(&self, solution: &SVector<T, NSTATE>) -> T {
        solution[0]
    }

    pub fn total_energy(&self, solution: &SVector<T, NSTATE>) -> T {
        solution[DIM + 1]
    }

    pub fn momentum(&self, solution: &SVector<T, NSTATE>) -> SVector<T, DIM> {
        solution.fixed_rows::<DIM>(1).into_owned()
    }

    pub fn compute_velocities(&self, solution: &SVector<T, NSTATE>) -> SVector<T, DIM> {
        self.momentum(solution) / self.density(solution)
    }

    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn compute_pressure(&self, solution: &SVector<T, NSTATE>) -> T {
        let density = self.density(solution);
        let velocities = self.compute_velocities(solution);
        (self.gamma_gas - 1.0) * (self.total_energy(solution) - 0.5 * density * velocities.norm_squared())
    }

    pub fn compute_sound(&self, solution: &SVector<T, NSTATE>) -> T {
        (self.gamma_gas * self.compute_pressure(solution) / self.density(solution)).sqrt()
    }
}

/// Manufactured state with positive density and pressure for gas dynamics.
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(crate) fn gas_manufactured_solution<T: Real, const DIM: usize, const NSTATE: usize>(
) -> ManufacturedSolution<T, DIM, NSTATE> {
    let base = SVector::from_fn(|s, _| {
        if s == 0 {
            1.0
        } else if s == NSTATE - 1 {
            30.0
        } else {
            0.3
        }
    });
    let amplitude = SVector::from_fn(|s, _| {
        if s == 0 {
            0.1
        } else if s == NSTATE - 1 {
            0.5
        } else {
            0.05
        }
    });
    ManufacturedSolution::new(base, amplitude)
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Physics<T, DIM, NSTATE> for Euler<T, DIM, NSTATE> {
    fn convective_flux(&self, solution: &SVector<T, NSTATE>) -> SMatrix<T, NSTATE, DIM> {
        let density = self.density(solution);
        let energy = self.total_energy(solution);
        let velocities = self.compute_velocities(solution);
        let pressure = self.compute_pressure(solution);

        let mut flux = SMatrix::zeros();
        for d in 0..DIM {
            flux[(0, d)] = density * velocities[d];
            for k in 0..DIM {
                flux[(1 + k, d)] = density * velocities[k] * velocities[d];
            }
            flux[(1 + d, d)] += pressure;
            flux[(DIM + 1, d)] = velocities[d] * (energy + pressure);
        }
        flux
    }

    fn convective_eigenvalues(&self, solution: &SVector<T, NSTATE>, normal: &SVector<T, DIM>) -> SVector<T, NSTATE> {
        let normal_velocity = self.compute_velocities(solution).dot(normal);
        let acoustic = self.compute_sound(solution) * normal.norm();
        let mut eigenvalues = SVector::repeat(normal_velocity);
        eigenvalues[0] = normal_velocity - acoustic;
        eigenvalues[NSTATE - 1] = normal_velocity + acoustic;
        eigenvalues
    }

    fn max_convective_eigenvalue(&self, solution: &SVector<T, NSTATE>) -> T {
        self.compute_velocities(solution).norm() + self.compute_sound(solution)
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
