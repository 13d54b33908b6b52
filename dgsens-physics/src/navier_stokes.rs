use crate::euler::Euler;
use crate::{from_f64, ManufacturedSolution, Physics, PhysicsError, PhysicsParameters};
use dgsens_traits::Real;
use nalgebra::{SMatrix, SVector};
use numeric_literals::replace_float_literals;

/// Sutherland's constant (110.4 K) relative to the free-stream temperature (273.15 K).
const SUTHERLAND_RATIO: f64 = 110.4 / 273.15;

/// The compressible Navier-Stokes equations, non-dimensionalized by free-stream quantities.
///
/// The convective part is [`Euler`]. The viscous stress follows Stokes' hypothesis,
/// $$
/// \vec \tau = \frac{\mu(T)}{Re} \left( \nabla \vec v + \nabla \vec v^T - \tfrac{2}{3} (\nabla \cdot \vec v) \vec I \right),
/// $$
/// with Sutherland's law for $\mu(T)$ and the Fourier heat flux
/// $\vec q = - \frac{\mu}{(\gamma - 1) M^2 Pr Re} \nabla T$, where $T = \gamma M^2 p / \rho$.
/// The dissipative flux is the negated viscous flux, $(0, -\vec \tau, -\vec \tau \vec v + \vec q)$.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NavierStokes<T: Real, const DIM: usize, const NSTATE: usize> {
    pub euler: Euler<T, DIM, NSTATE>,
    pub mach_inf: T,
    pub reynolds_inf: T,
    pub prandtl_number: T,
}

impl<T: Real, const DIM: usize, const NSTATE: usize> NavierStokes<T, DIM, NSTATE> {
    pub fn new(gamma_gas: T, mach_inf: T, reynolds_inf: T, prandtl_number: T) -> Result<Self, PhysicsError> {
        Ok(Self {
            euler: Euler::new(gamma_gas)?,
            mach_inf,
            reynolds_inf,
            prandtl_number,
        })
    }

    pub fn from_parameters(parameters: &PhysicsParameters) -> Result<Self, PhysicsError> {
        Self::new(
            from_f64(parameters.gamma_gas),
            from_f64(parameters.mach_inf),
            from_f64(parameters.reynolds_inf),
            from_f64(parameters.prandtl_number),
        )
    }

    /// Non-dimensional temperature $T = \gamma M^2 p / \rho$, equal to one in the free stream.
    pub fn compute_temperature(&self, solution: &SVector<T, NSTATE>) -> T {
        let gamma = self.euler.gamma_gas;
        gamma * self.mach_inf * self.mach_inf * self.euler.compute_pressure(solution) / self.euler.density(solution)
    }

    /// Sutherland's law in non-dimensional form.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn compute_viscosity(&self, temperature: T) -> T {
        let s = T::from_f64(SUTHERLAND_RATIO).expect("literal must fit in T");
        temperature.powf(1.5) * (1.0 + s) / (temperature + s)
    }

    /// Velocity gradient $\partial v_k / \partial x_d$ as a `DIM x DIM` matrix.
    pub fn compute_velocity_gradient(
        &self,
        solution: &SVector<T, NSTATE>,
        solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SMatrix<T, DIM, DIM> {
        let density = self.euler.density(solution);
        let velocities = self.euler.compute_velocities(solution);
        let density_gradient = solution_gradient.row(0);
        SMatrix::from_fn(|k, d| (solution_gradient[(1 + k, d)] - velocities[k] * density_gradient[d]) / density)
    }

    /// Gradient of the non-dimensional temperature.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn compute_temperature_gradient(
        &self,
        solution: &SVector<T, NSTATE>,
        solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SVector<T, DIM> {
        let gamma = self.euler.gamma_gas;
        let density = self.euler.density(solution);
        let pressure = self.euler.compute_pressure(solution);
        let velocities = self.euler.compute_velocities(solution);

        let density_gradient = solution_gradient.row(0).transpose();
        let energy_gradient = solution_gradient.row(DIM + 1).transpose();
        // grad(rho |v|^2 / 2) = sum_k (v_k grad(rho v_k) - v_k^2 / 2 grad(rho))
        let mut kinetic_gradient = SVector::<T, DIM>::zeros();
        for k in 0..DIM {
            let momentum_gradient = solution_gradient.row(1 + k).transpose();
            kinetic_gradient += momentum_gradient * velocities[k];
            kinetic_gradient -= &density_gradient * (0.5 * velocities[k] * velocities[k]);
        }
        let pressure_gradient = (energy_gradient - kinetic_gradient) * (gamma - 1.0);

        let scale = gamma * self.mach_inf * self.mach_inf;
        (pressure_gradient / density - density_gradient * (pressure / (density * density))) * scale
    }
}

impl<T: Real, const DIM: usize, const NSTATE: usize> Physics<T, DIM, NSTATE> for NavierStokes<T, DIM, NSTATE> {
    fn convective_flux(&self, solution: &SVector<T, NSTATE>) -> SMatrix<T, NSTATE, DIM> {
        self.euler.convective_flux(solution)
    }

    fn convective_eigenvalues(&self, solution: &SVector<T, NSTATE>, normal: &SVector<T, DIM>) -> SVector<T, NSTATE> {
        self.euler.convective_eigenvalues(solution, normal)
    }

    fn max_convective_eigenvalue(&self, solution: &SVector<T, NSTATE>) -> T {
        self.euler.max_convective_eigenvalue(solution)
    }

    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    fn dissipative_flux(
        &self,
        solution: &SVector<T, NSTATE>,
        solution_gradient: &SMatrix<T, NSTATE, DIM>,
    ) -> SMatrix<T, NSTATE, DIM> {
        let gamma = self.euler.gamma_gas;
        let velocities = self.euler.compute_velocities(solution);
        let temperature = self.compute_temperature(solution);
        let viscosity = self.compute_viscosity(temperature) / self.reynolds_inf;

        let velocity_gradient = self.compute_velocity_gradient(solution, solution_gradient);
        let divergence = velocity_gradient.trace();
        let mut stress = (velocity_gradient + velocity_gradient.transpose()) * viscosity;
        for d in 0..DIM {
            stress[(d, d)] -= 2.0 / 3.0 * viscosity * divergence;
        }

        let conductivity =
            viscosity / ((gamma - 1.0) * self.mach_inf * self.mach_inf * self.prandtl_number);
        let heat_flux = self.compute_temperature_gradient(solution, solution_gradient) * (-conductivity);

        let mut flux = SMatrix::zeros();
        for d in 0..DIM {
            for k in 0..DIM {
                flux[(1 + k, d)] = -stress[(k, d)];
            }
            flux[(DIM + 1, d)] = -stress.column(d).dot(&velocities) + heat_flux[d];
        }
        flux
    }

    fn manufactured_solution(&self) -> &ManufacturedSolution<T, DIM, NSTATE> {
        &self.euler.manufactured
    }
}
