//! Sparse matrices whose rows are distributed over ranks.
use crate::comm::Communicator;
use crate::dofs::DofPartition;
use crate::error::MatrixError;
use nalgebra::DMatrix;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::{CooMatrix, CsrMatrix, SparseEntry};
use std::sync::Arc;

/// Structural nonzero queries on a matrix.
pub trait SparsityOracle {
    fn nrows(&self) -> usize;

    fn ncols(&self) -> usize;

    /// Whether `(i, j)` is a structural nonzero. Out-of-bounds entries do not exist.
    fn exists(&self, i: usize, j: usize) -> bool;
}

impl SparsityOracle for SparsityPattern {
    fn nrows(&self) -> usize {
        self.major_dim()
    }

    fn ncols(&self) -> usize {
        self.minor_dim()
    }

    fn exists(&self, i: usize, j: usize) -> bool {
        i < self.major_dim() && self.lane(i).binary_search(&j).is_ok()
    }
}

impl<T> SparsityOracle for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.pattern().major_dim()
    }

    fn ncols(&self) -> usize {
        self.pattern().minor_dim()
    }

    fn exists(&self, i: usize, j: usize) -> bool {
        self.pattern().exists(i, j)
    }
}

type Triplet = (usize, usize, f64);

/// Additive triplet storage for a row-distributed matrix under construction.
///
/// Any rank may add to any row. The matrix can only be read after
/// [`compress`](Self::compress), which ships entries to the owners of their rows and sums
/// duplicates.
#[derive(Debug, Clone)]
pub struct SparseAccumulator {
    partition: Arc<DofPartition>,
    ncols: usize,
    triplets: Vec<Triplet>,
}

impl SparseAccumulator {
    /// An empty `n_dofs x ncols` accumulator, where `n_dofs` is the size of the partition.
    pub fn new(partition: Arc<DofPartition>, ncols: usize) -> Self {
        Self {
            partition,
            ncols,
            triplets: Vec::new(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.partition.n_dofs()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of entries added on this rank so far, counting duplicates.
    pub fn n_local_entries(&self) -> usize {
        self.triplets.len()
    }

    /// # Panics
    ///
    /// Panics if `(i, j)` is out of bounds.
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        assert!(i < self.nrows() && j < self.ncols, "Entry ({i}, {j}) out of bounds");
        self.triplets.push((i, j, value));
    }

    /// Combines the contributions of all ranks, adding entries with equal indices.
    ///
    /// Collective.
    pub fn compress(self, comm: &impl Communicator) -> DistributedCsrMatrix {
        let (local, remote): (Vec<Triplet>, Vec<Triplet>) = self
            .triplets
            .into_iter()
            .partition(|(i, _, _)| self.partition.is_owned(*i));

        let mut coo = CooMatrix::new(self.partition.n_dofs(), self.ncols);
        for (i, j, v) in local {
            coo.push(i, j, v);
        }
        for shipped in comm.all_gather(remote) {
            for (i, j, v) in shipped {
                if self.partition.is_owned(i) {
                    coo.push(i, j, v);
                }
            }
        }

        DistributedCsrMatrix {
            partition: self.partition,
            local: CsrMatrix::from(&coo),
        }
    }
}

/// A finalized sparse matrix of which each rank stores the rows it owns.
///
/// The local CSR matrix has the global shape; rows owned by other ranks are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedCsrMatrix {
    partition: Arc<DofPartition>,
    local: CsrMatrix<f64>,
}

impl DistributedCsrMatrix {
    pub fn zeros(partition: Arc<DofPartition>, ncols: usize) -> Self {
        let local = CsrMatrix::zeros(partition.n_dofs(), ncols);
        Self { partition, local }
    }

    /// Keeps the owned rows of a matrix that every rank knows in full.
    pub fn from_global_csr(partition: Arc<DofPartition>, global: &CsrMatrix<f64>) -> Result<Self, MatrixError> {
        if global.nrows() != partition.n_dofs() {
            return Err(MatrixError::DimensionMismatch {
                expected: (partition.n_dofs(), global.ncols()),
                actual: (global.nrows(), global.ncols()),
            });
        }
        let mut coo = CooMatrix::new(global.nrows(), global.ncols());
        for (i, j, v) in global.triplet_iter() {
            if partition.is_owned(i) {
                coo.push(i, j, *v);
            }
        }
        Ok(Self {
            partition,
            local: CsrMatrix::from(&coo),
        })
    }

    pub fn partition(&self) -> &Arc<DofPartition> {
        &self.partition
    }

    pub fn nrows(&self) -> usize {
        self.local.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.local.ncols()
    }

    /// The owned rows, embedded in a matrix of global shape.
    pub fn local_matrix(&self) -> &CsrMatrix<f64> {
        &self.local
    }

    /// Number of explicitly stored entries on this rank.
    pub fn nnz_local(&self) -> usize {
        self.local.nnz()
    }

    /// Entry `(i, j)` if row `i` is owned by this rank. Entries outside the sparsity
    /// pattern are zero.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if !self.partition.is_owned(i) {
            return None;
        }
        match self.local.get_entry(i, j)? {
            SparseEntry::NonZero(value) => Some(*value),
            SparseEntry::Zero => Some(0.0),
        }
    }

    /// Collective.
    pub fn frobenius_norm(&self, comm: &impl Communicator) -> f64 {
        let local: f64 = self.local.values().iter().map(|v| v * v).sum();
        comm.all_reduce_sum(local).sqrt()
    }

    /// Maximum absolute column sum. Collective.
    pub fn l1_norm(&self, comm: &impl Communicator) -> f64 {
        let mut column_sums = vec![0.0; self.ncols()];
        for (_, j, v) in self.local.triplet_iter() {
            column_sums[j] += v.abs();
        }
        comm.all_reduce_sum_in_place(&mut column_sums);
        column_sums.into_iter().fold(0.0, f64::max)
    }

    /// Maximum absolute row sum. Collective.
    pub fn linfty_norm(&self, comm: &impl Communicator) -> f64 {
        let local = self
            .local
            .row_iter()
            .map(|row| row.values().iter().map(|v| v.abs()).sum())
            .fold(0.0, f64::max);
        comm.all_reduce_max(local)
    }

    /// Computes `self += alpha * other` entrywise on the union of both sparsity patterns.
    pub fn add_scaled(&mut self, alpha: f64, other: &DistributedCsrMatrix) -> Result<(), MatrixError> {
        if (self.nrows(), self.ncols()) != (other.nrows(), other.ncols()) {
            return Err(MatrixError::DimensionMismatch {
                expected: (self.nrows(), self.ncols()),
                actual: (other.nrows(), other.ncols()),
            });
        }
        if self.partition != other.partition {
            return Err(MatrixError::PartitionMismatch);
        }

        let mut coo = CooMatrix::new(self.nrows(), self.ncols());
        for (i, j, v) in self.local.triplet_iter() {
            coo.push(i, j, *v);
        }
        for (i, j, v) in other.local.triplet_iter() {
            coo.push(i, j, alpha * *v);
        }
        self.local = CsrMatrix::from(&coo);
        Ok(())
    }

    /// Assembles the full dense matrix on every rank. Collective.
    pub fn to_dense(&self, comm: &impl Communicator) -> DMatrix<f64> {
        let triplets: Vec<Triplet> = self.local.triplet_iter().map(|(i, j, v)| (i, j, *v)).collect();
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for rank_triplets in comm.all_gather(triplets) {
            for (i, j, v) in rank_triplets {
                dense[(i, j)] += v;
            }
        }
        dense
    }
}
