//! Finite-difference assembly of the dual-weighted Hessian.
use crate::comm::Communicator;
use crate::perturbation::ResidualService;
use crate::sparse::{DistributedCsrMatrix, SparseAccumulator, SparsityOracle};
use crate::stencil::MixedPartialEvaluator;
use eyre::{ensure, eyre};
use log::{debug, info, trace};
use std::sync::Arc;

/// Magnitude below which finite-difference entries are not stored.
pub const DEFAULT_DROP_TOLERANCE: f64 = 1e-12;

/// Assembles $\pdd{(\vec \psi \cdot \vec R)}{\vec w}{\vec w}$ by finite differences on the
/// nonzeros of a sparsity pattern.
///
/// Pairs $i \leq j$ are visited in row-major order. Since ranks only see part of the pattern,
/// the existence of each pair is agreed on by a global OR before any rank decides to skip it,
/// and every rank then evaluates the pair collectively. Each rank deposits into the rows it
/// owns, mirroring off-diagonal entries. Entries smaller than the drop tolerance in
/// magnitude are not deposited; the threshold is absolute.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FiniteDifferenceHessian {
    evaluator: MixedPartialEvaluator,
    drop_tolerance: f64,
}

impl FiniteDifferenceHessian {
    pub fn new(step: f64) -> Self {
        Self {
            evaluator: MixedPartialEvaluator::new(step),
            drop_tolerance: DEFAULT_DROP_TOLERANCE,
        }
    }

    pub fn with_drop_tolerance(self, drop_tolerance: f64) -> Self {
        Self { drop_tolerance, ..self }
    }

    pub fn evaluator(&self) -> &MixedPartialEvaluator {
        &self.evaluator
    }

    pub fn drop_tolerance(&self) -> f64 {
        self.drop_tolerance
    }

    /// Collective.
    pub fn assemble<R, P>(&self, service: &mut R, pattern: &P) -> eyre::Result<DistributedCsrMatrix>
    where
        R: ResidualService + ?Sized,
        P: SparsityOracle + ?Sized,
    {
        let n = service.n_dofs();
        ensure!(
            pattern.nrows() == n && pattern.ncols() == n,
            "Sparsity pattern is {}x{}, but the system has {} dofs",
            pattern.nrows(),
            pattern.ncols(),
            n
        );

        let partition = Arc::new(service.partition().clone());
        let is_root = service.communicator().rank() == 0;
        let mut accumulator = SparseAccumulator::new(Arc::clone(&partition), n);
        let mut n_evaluated = 0;
        let mut n_dropped = 0;

        for i in 0..n {
            if is_root {
                info!("Evaluating row {} of {}", i + 1, n);
            }
            for j in i..n {
                let exists = service.communicator().all_reduce_or(pattern.exists(i, j));
                if !exists {
                    continue;
                }

                // A rank may fail on its own; all ranks must leave the loop together
                let result = self.evaluator.evaluate(service, i, j);
                if service.communicator().all_reduce_or(result.is_err()) {
                    return match result {
                        Err(error) => Err(error.wrap_err(format!("Failed to evaluate entry ({}, {})", i, j))),
                        Ok(_) => Err(eyre!("Evaluation of entry ({}, {}) failed on another rank", i, j)),
                    };
                }
                let value = result?;
                n_evaluated += 1;
                if value.abs() < self.drop_tolerance {
                    n_dropped += 1;
                    trace!("Dropping ({}, {}) = {:e}", i, j, value);
                    continue;
                }
                debug!("FD entry ({}, {}) = {:e}", i, j, value);

                if partition.is_owned(i) {
                    accumulator.add(i, j, value);
                }
                if i != j && partition.is_owned(j) {
                    accumulator.add(j, i, value);
                }
            }
        }

        if is_root {
            info!(
                "Evaluated {} entries by finite differences, dropped {} below {:e}",
                n_evaluated, n_dropped, self.drop_tolerance
            );
        }
        Ok(accumulator.compress(service.communicator()))
    }
}
