//! Stencils for mixed second partial derivatives.
//!
//! A mixed partial $\pdd{f}{x_i}{x_j}$ is estimated from samples of $f$ on the
//! $5 \times 5$ grid of perturbations $(x_i + d_i h, x_j + d_j h)$ with
//! $d_i, d_j \in \{-2, -1, 0, 1, 2\}$. The coefficients are kept as static tables so that
//! they can be inspected and tested independently of whatever produces the samples.
use dgsens_traits::Real;
use nalgebra::{DMatrix, DVectorView, DVectorViewMut};

/// Number of samples taken per index pair.
pub const GRID_SAMPLES: usize = 25;

/// Largest absolute step multiple in each direction of the grid.
pub const GRID_RADIUS: i32 = 2;

/// The perturbation grid $\{-2, \dots, 2\}^2$ in row-major order, i.e. $d_j$ varies fastest.
pub const PERTURBATION_GRID: [(i32, i32); GRID_SAMPLES] = perturbation_grid();

const fn perturbation_grid() -> [(i32, i32); GRID_SAMPLES] {
    let mut grid = [(0, 0); GRID_SAMPLES];
    let mut di = -GRID_RADIUS;
    while di <= GRID_RADIUS {
        let mut dj = -GRID_RADIUS;
        while dj <= GRID_RADIUS {
            grid[grid_index(di, dj)] = (di, dj);
            dj += 1;
        }
        di += 1;
    }
    grid
}

/// Position of the perturbation `(di, dj)` in [`PERTURBATION_GRID`].
///
/// # Panics
///
/// Panics if either offset lies outside `-2..=2`.
pub const fn grid_index(di: i32, dj: i32) -> usize {
    assert!(di >= -GRID_RADIUS && di <= GRID_RADIUS);
    assert!(dj >= -GRID_RADIUS && dj <= GRID_RADIUS);
    ((di + GRID_RADIUS) * (2 * GRID_RADIUS + 1) + (dj + GRID_RADIUS)) as usize
}

/// A group of four signed samples sharing one weight.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StencilGroup {
    pub weight: f64,
    /// Entries `(di, dj, sign)`; samples are summed with their sign before weighting.
    pub samples: [(i32, i32, i32); 4],
}

/// A weighted combination of grid samples approximating a mixed second derivative.
///
/// The estimate is
/// $$
/// \pdd{f}{x_i}{x_j} \approx \frac{1}{D h^2} \sum_g w_g \sum_{k} s_{g,k} f(d_{g,k}),
/// $$
/// where $D$ is the denominator, $w_g$ the group weights and $s_{g,k} = \pm 1$.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MixedPartialStencil {
    pub groups: [StencilGroup; 4],
    pub denominator: f64,
}

/// Fourth-order accurate stencil for mixed partials using 16 of the 25 grid samples.
///
/// Taken from Pavel Holoborodko's tables of high-order mixed-derivative formulas
/// (<http://www.holoborodko.com/pavel/2014/11/04/computing-mixed-derivatives-by-finite-differences/>).
/// The weights cancel the third-order truncation terms that the plain four-point cross
/// stencil leaves behind.
pub const MIXED_PARTIAL_STENCIL: MixedPartialStencil = MixedPartialStencil {
    groups: [
        StencilGroup {
            weight: -63.0,
            samples: [(1, -2, 1), (2, -1, 1), (-2, 1, 1), (-1, 2, 1)],
        },
        StencilGroup {
            weight: 63.0,
            samples: [(-1, -2, 1), (-2, -1, 1), (2, 1, 1), (1, 2, 1)],
        },
        StencilGroup {
            weight: 44.0,
            samples: [(2, -2, 1), (-2, 2, 1), (-2, -2, -1), (2, 2, -1)],
        },
        StencilGroup {
            weight: 74.0,
            samples: [(-1, -1, 1), (1, 1, 1), (1, -1, -1), (-1, 1, -1)],
        },
    ],
    denominator: 600.0,
};

impl MixedPartialStencil {
    /// Iterates over every `(di, dj, coefficient)` with the group weight and sign folded in.
    pub fn coefficients(&self) -> impl Iterator<Item = (i32, i32, f64)> + '_ {
        self.groups.iter().flat_map(|group| {
            group
                .samples
                .iter()
                .map(move |&(di, dj, sign)| (di, dj, group.weight * f64::from(sign)))
        })
    }

    /// Combines samples taken on [`PERTURBATION_GRID`] with step size `h`.
    ///
    /// `samples[grid_index(di, dj)]` must hold $f$ at the perturbation `(di, dj)`.
    pub fn combine<T>(&self, samples: &[T; GRID_SAMPLES], h: T) -> T
    where
        T: Real,
    {
        let scalar = |value: f64| T::from_f64(value).expect("stencil coefficient must fit in T");
        let mut total = T::zero();
        for group in &self.groups {
            let mut term = T::zero();
            for &(di, dj, sign) in &group.samples {
                let sample = samples[grid_index(di, dj)];
                if sign > 0 {
                    term += sample;
                } else {
                    term -= sample;
                }
            }
            total += term * scalar(group.weight);
        }
        total / (scalar(self.denominator) * h * h)
    }
}

/// Approximates $\pdd{f}{x_i}{x_j}$ for $f: \mathbb{R}^n \rightarrow \mathbb{R}$ with
/// [`MIXED_PARTIAL_STENCIL`].
///
/// For `i == j` both perturbations act on the same entry and are accumulated, which yields the
/// pure second derivative. The vector `x` is restored after every sample.
pub fn approximate_mixed_partial_fd<'a, T>(
    mut f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    i: usize,
    j: usize,
    h: T,
) -> T
where
    T: Real,
{
    let mut x = x.into();
    let x_i = x[i];
    let x_j = x[j];
    let multiple = |d: i32| T::from_i32(d).expect("grid offset must fit in T");

    let mut samples = [T::zero(); GRID_SAMPLES];
    for (sample, &(di, dj)) in samples.iter_mut().zip(PERTURBATION_GRID.iter()) {
        x[i] = x_i + multiple(di) * h;
        if i == j {
            x[j] += multiple(dj) * h;
        } else {
            x[j] = x_j + multiple(dj) * h;
        }
        *sample = f(DVectorView::from(&x));
        x[i] = x_i;
        x[j] = x_j;
    }

    MIXED_PARTIAL_STENCIL.combine(&samples, h)
}

/// Approximates the dense Hessian of $f: \mathbb{R}^n \rightarrow \mathbb{R}$.
///
/// Only the upper triangle is sampled; the result is symmetric by construction.
pub fn approximate_hessian_fd<'a, T>(
    mut f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DMatrix<T>
where
    T: Real,
{
    let mut x = x.into();
    let n = x.len();
    let mut hessian = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let h_ij = approximate_mixed_partial_fd(&mut f, DVectorViewMut::from(&mut x), i, j, h);
            hessian[(i, j)] = h_ij;
            hessian[(j, i)] = h_ij;
        }
    }
    hessian
}
