//! Perturbing the solution of a [`DgSystem`] and sampling its dual-weighted residual.
use crate::comm::Communicator;
use crate::dofs::DofPartition;
use crate::system::{AssemblyRequest, DgSystem};

/// An offset added to one global entry of the solution.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Perturbation {
    pub index: usize,
    pub offset: f64,
}

impl Perturbation {
    pub fn new(index: usize, offset: f64) -> Self {
        Self { index, offset }
    }
}

/// Exclusive access to a system whose solution is temporarily perturbed.
///
/// Offsets are added in order to the locally relevant entries they target, so repeated
/// indices accumulate. Entries that are not relevant on this rank are left alone. The
/// original values are restored when the guard is dropped, on every exit path.
#[derive(Debug)]
pub struct ScopedPerturbation<'a, S>
where
    S: DgSystem + ?Sized,
{
    system: &'a mut S,
    saved: Vec<(usize, f64)>,
}

impl<'a, S> ScopedPerturbation<'a, S>
where
    S: DgSystem + ?Sized,
{
    pub fn new(system: &'a mut S, perturbations: &[Perturbation]) -> Self {
        let mut saved: Vec<(usize, f64)> = Vec::with_capacity(perturbations.len());
        let solution = system.solution_mut();
        for perturbation in perturbations {
            if let Some(value) = solution.get_mut(perturbation.index) {
                if !saved.iter().any(|(index, _)| *index == perturbation.index) {
                    saved.push((perturbation.index, *value));
                }
                *value += perturbation.offset;
            }
        }
        Self { system, saved }
    }

    /// Indices perturbed on this rank.
    pub fn perturbed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.saved.iter().map(|(index, _)| *index)
    }

    pub fn system(&mut self) -> &mut S {
        &mut *self.system
    }
}

impl<'a, S> Drop for ScopedPerturbation<'a, S>
where
    S: DgSystem + ?Sized,
{
    fn drop(&mut self) {
        let solution = self.system.solution_mut();
        for &(index, value) in self.saved.iter().rev() {
            solution.set(index, value);
        }
    }
}

/// Evaluates $\vec \psi \cdot \vec R(\vec w + \vec \delta)$ for perturbations $\vec \delta$.
///
/// Every call to [`sample`](Self::sample) is collective. Implementations perform the
/// collective on every rank, also on ranks that hold none of the perturbed entries, so that
/// callers never need to decide locally whether to participate.
pub trait ResidualService {
    type Comm: Communicator;

    fn communicator(&self) -> &Self::Comm;

    fn partition(&self) -> &DofPartition;

    fn n_dofs(&self) -> usize {
        self.partition().n_dofs()
    }

    /// The dual-weighted residual at the perturbed state. The state is unperturbed again
    /// when this returns, also on error.
    fn sample(&mut self, perturbations: &[Perturbation]) -> eyre::Result<f64>;
}

/// The [`ResidualService`] of a [`DgSystem`], assembling only the residual for each sample.
#[derive(Debug)]
pub struct CollectiveResidual<'a, S>
where
    S: DgSystem + ?Sized,
{
    system: &'a mut S,
    samples_taken: usize,
}

impl<'a, S> CollectiveResidual<'a, S>
where
    S: DgSystem + ?Sized,
{
    pub fn new(system: &'a mut S) -> Self {
        Self {
            system,
            samples_taken: 0,
        }
    }

    pub fn samples_taken(&self) -> usize {
        self.samples_taken
    }

    pub fn system(&self) -> &S {
        &*self.system
    }
}

impl<'a, S> ResidualService for CollectiveResidual<'a, S>
where
    S: DgSystem + ?Sized,
{
    type Comm = S::Comm;

    fn communicator(&self) -> &S::Comm {
        self.system.communicator()
    }

    fn partition(&self) -> &DofPartition {
        self.system.partition()
    }

    fn sample(&mut self, perturbations: &[Perturbation]) -> eyre::Result<f64> {
        self.samples_taken += 1;
        let mut guard = ScopedPerturbation::new(&mut *self.system, perturbations);
        let system = guard.system();
        system.assemble_residual(AssemblyRequest::RESIDUAL_ONLY)?;
        Ok(system
            .right_hand_side()
            .dot(system.dual(), system.communicator()))
    }
}
