//! Estimating one mixed second derivative of the dual-weighted residual.
use crate::perturbation::{Perturbation, ResidualService};
use dgsens_calculus::stencil::{GRID_SAMPLES, MIXED_PARTIAL_STENCIL, PERTURBATION_GRID};

/// Estimates $\pdd{(\vec \psi \cdot \vec R)}{w_i}{w_j}$ from 25 collective residual samples.
///
/// Samples are taken on the full $5 \times 5$ perturbation grid in row-major order, even
/// though [`MIXED_PARTIAL_STENCIL`] only weights 16 of them, so that every rank performs the
/// same sequence of collectives for every pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MixedPartialEvaluator {
    step: f64,
}

impl MixedPartialEvaluator {
    /// # Panics
    ///
    /// Panics if `step` is not positive and finite.
    pub fn new(step: f64) -> Self {
        assert!(step > 0.0 && step.is_finite(), "Finite difference step must be positive");
        Self { step }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Collects the dual-weighted residual at every grid perturbation of `(i, j)`.
    ///
    /// For `i == j` both offsets act on the same entry and add up. Collective.
    ///
    /// A failing sample does not end the sweep: the remaining samples are still requested, so
    /// that a rank whose sample failed issues as many collectives as its peers. The first
    /// error is returned afterwards.
    pub fn sample_grid<R>(&self, service: &mut R, i: usize, j: usize) -> eyre::Result<[f64; GRID_SAMPLES]>
    where
        R: ResidualService + ?Sized,
    {
        let mut samples = [0.0; GRID_SAMPLES];
        let mut first_error = None;
        for (sample, &(di, dj)) in samples.iter_mut().zip(PERTURBATION_GRID.iter()) {
            let perturbations = [
                Perturbation::new(i, f64::from(di) * self.step),
                Perturbation::new(j, f64::from(dj) * self.step),
            ];
            match service.sample(&perturbations) {
                Ok(value) => *sample = value,
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(samples),
        }
    }

    /// Collective.
    pub fn evaluate<R>(&self, service: &mut R, i: usize, j: usize) -> eyre::Result<f64>
    where
        R: ResidualService + ?Sized,
    {
        let samples = self.sample_grid(service, i, j)?;
        Ok(MIXED_PARTIAL_STENCIL.combine(&samples, self.step))
    }
}
