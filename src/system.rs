//! The interface to a discretized system whose residual is being differentiated.
use crate::comm::Communicator;
use crate::dofs::DofPartition;
use crate::sparse::DistributedCsrMatrix;
use crate::vector::DistributedVector;
use crate::MatrixError;
use eyre::{bail, ensure, WrapErr};
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use std::sync::Arc;

/// Selects which derivatives an assembly computes in addition to the residual.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AssemblyRequest {
    pub jacobian: bool,
    pub jacobian_transpose: bool,
    pub hessian: bool,
}

impl AssemblyRequest {
    pub const RESIDUAL_ONLY: Self = Self {
        jacobian: false,
        jacobian_transpose: false,
        hessian: false,
    };

    /// Residual and the dual-weighted second derivative $\pdd{(\vec \psi \cdot \vec R)}{\vec w}{\vec w}$.
    pub const HESSIAN: Self = Self {
        jacobian: false,
        jacobian_transpose: false,
        hessian: true,
    };
}

/// A discretized system $\vec R(\vec w)$ distributed over the ranks of a communicator.
///
/// [`assemble_residual`](Self::assemble_residual) is a collective operation: every rank must
/// call it the same number of times and in the same order.
pub trait DgSystem {
    type Comm: Communicator;

    fn communicator(&self) -> &Self::Comm;

    fn partition(&self) -> &Arc<DofPartition>;

    /// The state $\vec w$ at which the residual is assembled.
    fn solution(&self) -> &DistributedVector;

    fn solution_mut(&mut self) -> &mut DistributedVector;

    /// The dual vector $\vec \psi$.
    fn dual(&self) -> &DistributedVector;

    fn dual_mut(&mut self) -> &mut DistributedVector;

    /// The residual computed by the last assembly.
    fn right_hand_side(&self) -> &DistributedVector;

    /// Assembles the residual at the current solution, plus the requested derivatives.
    ///
    /// An implementation that fails on some ranks only must still complete the collectives
    /// its peers perform in the same call.
    fn assemble_residual(&mut self, request: AssemblyRequest) -> eyre::Result<()>;

    /// The dual-weighted Hessian from the last assembly that requested it.
    fn d2r_dw_dw(&self) -> Option<&DistributedCsrMatrix>;

    /// Structural nonzeros of the dual-weighted Hessian as seen by this rank.
    ///
    /// Ranks may disagree about entries outside the rows they own.
    fn d2r_dw_dw_sparsity_pattern(&self) -> &SparsityPattern;
}

type ResidualFn = Box<dyn Fn(DVectorView<f64>, DVectorViewMut<f64>) + Send + Sync>;
type HessianFn = Box<dyn Fn(DVectorView<f64>, DVectorView<f64>) -> CsrMatrix<f64> + Send + Sync>;

/// A [`DgSystem`] defined by closures over the full global state.
///
/// Every rank evaluates the closures on the same global state: values are gathered from their
/// owners and then overlaid with the locally relevant copies, so a perturbation applied by
/// any rank holding an entry is seen by all ranks. Each rank then keeps the residual rows
/// and Hessian rows it owns.
pub struct FunctionSystem<C> {
    communicator: C,
    partition: Arc<DofPartition>,
    solution: DistributedVector,
    dual: DistributedVector,
    right_hand_side: DistributedVector,
    residual: ResidualFn,
    hessian: Option<HessianFn>,
    local_pattern: SparsityPattern,
    d2r_dw_dw: Option<DistributedCsrMatrix>,
    assembly_count: usize,
}

impl<C> std::fmt::Debug for FunctionSystem<C>
where
    C: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSystem")
            .field("communicator", &self.communicator)
            .field("partition", &self.partition)
            .field("assembly_count", &self.assembly_count)
            .finish_non_exhaustive()
    }
}

impl<C: Communicator> FunctionSystem<C> {
    /// Number of residual assemblies performed on this rank.
    pub fn assembly_count(&self) -> usize {
        self.assembly_count
    }

    fn global_state(&self) -> DVector<f64> {
        let mut state = self.solution.gather(&self.communicator);
        for (index, value) in self.solution.iter_relevant() {
            state[index] = value;
        }
        state
    }
}

impl<C: Communicator> DgSystem for FunctionSystem<C> {
    type Comm = C;

    fn communicator(&self) -> &C {
        &self.communicator
    }

    fn partition(&self) -> &Arc<DofPartition> {
        &self.partition
    }

    fn solution(&self) -> &DistributedVector {
        &self.solution
    }

    fn solution_mut(&mut self) -> &mut DistributedVector {
        &mut self.solution
    }

    fn dual(&self) -> &DistributedVector {
        &self.dual
    }

    fn dual_mut(&mut self) -> &mut DistributedVector {
        &mut self.dual
    }

    fn right_hand_side(&self) -> &DistributedVector {
        &self.right_hand_side
    }

    fn assemble_residual(&mut self, request: AssemblyRequest) -> eyre::Result<()> {
        if request.jacobian || request.jacobian_transpose {
            bail!("Jacobian assembly is not supported by closure-defined systems");
        }
        self.assembly_count += 1;

        let n = self.partition.n_dofs();
        let state = self.global_state();
        let mut residual = DVector::zeros(n);
        (self.residual)(DVectorView::from(&state), DVectorViewMut::from(&mut residual));
        for index in self.partition.locally_relevant().iter() {
            self.right_hand_side.set(index, residual[index]);
        }

        if request.hessian {
            let hessian_fn = match &self.hessian {
                Some(hessian_fn) => hessian_fn,
                None => bail!("Hessian requested, but no Hessian was provided"),
            };
            let dual = self.dual.gather(&self.communicator);
            let hessian = hessian_fn(DVectorView::from(&state), DVectorView::from(&dual));
            if (hessian.nrows(), hessian.ncols()) != (n, n) {
                return Err(MatrixError::DimensionMismatch {
                    expected: (n, n),
                    actual: (hessian.nrows(), hessian.ncols()),
                })
                .wrap_err("Invalid Hessian");
            }
            self.d2r_dw_dw = Some(DistributedCsrMatrix::from_global_csr(Arc::clone(&self.partition), &hessian)?);
        }
        Ok(())
    }

    fn d2r_dw_dw(&self) -> Option<&DistributedCsrMatrix> {
        self.d2r_dw_dw.as_ref()
    }

    fn d2r_dw_dw_sparsity_pattern(&self) -> &SparsityPattern {
        &self.local_pattern
    }
}

/// Builder for [`FunctionSystem`].
///
/// The residual closure writes $\vec R(\vec w)$ for the full state $\vec w$ into its second
/// argument. The optional Hessian closure receives $\vec w$ and the dual $\vec \psi$ and
/// returns $\pdd{(\vec \psi \cdot \vec R)}{\vec w}{\vec w}$.
#[derive(Default)]
pub struct FunctionSystemBuilder {
    residual: Option<ResidualFn>,
    hessian: Option<HessianFn>,
    pattern: Option<SparsityPattern>,
    solution: Option<DVector<f64>>,
    dual: Option<DVector<f64>>,
}

impl FunctionSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_residual<F>(self, residual: F) -> Self
    where
        F: Fn(DVectorView<f64>, DVectorViewMut<f64>) + Send + Sync + 'static,
    {
        Self {
            residual: Some(Box::new(residual)),
            ..self
        }
    }

    pub fn with_hessian<F>(self, hessian: F) -> Self
    where
        F: Fn(DVectorView<f64>, DVectorView<f64>) -> CsrMatrix<f64> + Send + Sync + 'static,
    {
        Self {
            hessian: Some(Box::new(hessian)),
            ..self
        }
    }

    /// Global sparsity pattern of the Hessian. It also determines the number of dofs and the
    /// ghost entries of each rank.
    pub fn with_sparsity_pattern(self, pattern: SparsityPattern) -> Self {
        Self {
            pattern: Some(pattern),
            ..self
        }
    }

    /// Initial solution, zero by default.
    pub fn with_solution(self, solution: DVector<f64>) -> Self {
        Self {
            solution: Some(solution),
            ..self
        }
    }

    /// Initial dual, zero by default.
    pub fn with_dual(self, dual: DVector<f64>) -> Self {
        Self {
            dual: Some(dual),
            ..self
        }
    }

    /// Builds the rank-local part of the system, using a contiguous block partition.
    pub fn build<C: Communicator>(self, communicator: C) -> eyre::Result<FunctionSystem<C>> {
        let residual = self.residual.ok_or_else(|| eyre::eyre!("Missing residual"))?;
        let pattern = self
            .pattern
            .ok_or_else(|| eyre::eyre!("Missing sparsity pattern"))?;
        let n = pattern.major_dim();
        ensure!(
            pattern.minor_dim() == n,
            "Hessian sparsity pattern must be square, got {}x{}",
            n,
            pattern.minor_dim()
        );

        let solution = self.solution.unwrap_or_else(|| DVector::zeros(n));
        let dual = self.dual.unwrap_or_else(|| DVector::zeros(n));
        ensure!(solution.len() == n, "Solution has length {}, expected {}", solution.len(), n);
        ensure!(dual.len() == n, "Dual has length {}, expected {}", dual.len(), n);

        let partition = Arc::new(
            DofPartition::contiguous(n, communicator.rank(), communicator.size()).with_ghosts_from_pattern(&pattern),
        );
        let local_pattern = owned_rows(&pattern, &partition)?;

        Ok(FunctionSystem {
            communicator,
            solution: DistributedVector::from_global(Arc::clone(&partition), &solution),
            dual: DistributedVector::from_global(Arc::clone(&partition), &dual),
            right_hand_side: DistributedVector::zeros(Arc::clone(&partition)),
            residual,
            hessian: self.hessian,
            local_pattern,
            d2r_dw_dw: None,
            assembly_count: 0,
            partition,
        })
    }
}

/// The rows of `pattern` owned by this rank; all other rows are empty.
fn owned_rows(pattern: &SparsityPattern, partition: &DofPartition) -> eyre::Result<SparsityPattern> {
    let mut offsets = Vec::with_capacity(pattern.major_dim() + 1);
    let mut column_indices = Vec::new();
    offsets.push(0);
    for row in 0..pattern.major_dim() {
        if partition.is_owned(row) {
            column_indices.extend_from_slice(pattern.lane(row));
        }
        offsets.push(column_indices.len());
    }
    SparsityPattern::try_from_offsets_and_indices(pattern.major_dim(), pattern.minor_dim(), offsets, column_indices)
        .wrap_err("Failed to restrict sparsity pattern to owned rows")
}
