use crate::from_f64;
use dgsens_traits::Real;
use nalgebra::{Point, SMatrix, SVector};
use numeric_literals::replace_float_literals;

/// A smooth manufactured solution built from a product of sines.
///
/// Every state is an affine function of the same sine product
/// $$
/// p(\vec x) = \prod_{d} \sin(a_d x_d + b_d), \qquad u_s(\vec x) = \bar u_s + \hat u_s \, p(\vec x),
/// $$
/// so that base values can keep e.g. density and energy positive for the Euler equations.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ManufacturedSolution<T, const DIM: usize, const NSTATE: usize>
where
    T: Real,
{
    pub frequencies: SVector<T, DIM>,
    pub offsets: SVector<T, DIM>,
    pub base: SVector<T, NSTATE>,
    pub amplitude: SVector<T, NSTATE>,
}

impl<T, const DIM: usize, const NSTATE: usize> ManufacturedSolution<T, DIM, NSTATE>
where
    T: Real,
{
    /// Manufactured solution with the given base values and amplitudes and the default
    /// frequencies $(0.59, 1.62, 2.28) / d$ and offsets $(1, 1.2, 1.5)$.
    pub fn new(base: SVector<T, NSTATE>, amplitude: SVector<T, NSTATE>) -> Self {
        let frequencies = [0.59, 2.0 * 0.81, 3.0 * 0.76];
        let offsets = [1.0, 1.2, 1.5];
        let dim = DIM as f64;
        Self {
            frequencies: SVector::from_fn(|d, _| from_f64(frequencies[d % 3] / dim)),
            offsets: SVector::from_fn(|d, _| from_f64(offsets[d % 3])),
            base,
            amplitude,
        }
    }

    /// Every state equal to the plain sine product.
    pub fn unit() -> Self {
        Self::new(SVector::zeros(), SVector::repeat(T::one()))
    }

    fn sine_product(&self, position: &Point<T, DIM>) -> (T, SVector<T, DIM>) {
        let phases = self.frequencies.component_mul(&position.coords) + self.offsets;
        let sines = phases.map(|phase| phase.sin());
        let value = sines.product();
        let gradient = SVector::from_fn(|d, _| {
            let mut derivative = self.frequencies[d] * phases[d].cos();
            for (k, sine) in sines.iter().enumerate() {
                if k != d {
                    derivative *= *sine;
                }
            }
            derivative
        });
        (value, gradient)
    }

    pub fn value(&self, position: &Point<T, DIM>) -> SVector<T, NSTATE> {
        let (p, _) = self.sine_product(position);
        self.base + self.amplitude * p
    }

    /// Gradient as an `NSTATE x DIM` matrix.
    pub fn gradient(&self, position: &Point<T, DIM>) -> SMatrix<T, NSTATE, DIM> {
        let (_, p_grad) = self.sine_product(position);
        self.amplitude * p_grad.transpose()
    }

    /// Laplacian of every state, using $\Delta p = -|\vec a|^2 p$.
    pub fn laplacian(&self, position: &Point<T, DIM>) -> SVector<T, NSTATE> {
        let (p, _) = self.sine_product(position);
        self.amplitude * (-self.frequencies.norm_squared() * p)
    }

    /// Integral over the unit cube $[0, 1]^{DIM}$, summed over states, of $u_s$ when `linear`
    /// and of $u_s^2$ otherwise.
    ///
    /// Uses the closed forms of the sine product moments
    /// $$
    /// \int p = \prod_d \frac{\cos b_d - \cos(a_d + b_d)}{a_d}, \qquad
    /// \int p^2 = \prod_d \left( \frac{1}{2} - \frac{\sin 2(a_d + b_d) - \sin 2 b_d}{4 a_d} \right).
    /// $$
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn integral_output(&self, linear: bool) -> T {
        let mut first_moment = T::one();
        let mut second_moment = T::one();
        for d in 0..DIM {
            let (a, b) = (self.frequencies[d], self.offsets[d]);
            first_moment *= (b.cos() - (a + b).cos()) / a;
            second_moment *= 0.5 - ((2.0 * (a + b)).sin() - (2.0 * b).sin()) / (4.0 * a);
        }
        let mut integral = T::zero();
        for s in 0..NSTATE {
            let (base, amplitude) = (self.base[s], self.amplitude[s]);
            integral += if linear {
                base + amplitude * first_moment
            } else {
                base * base + 2.0 * base * amplitude * first_moment + amplitude * amplitude * second_moment
            };
        }
        integral
    }
}
