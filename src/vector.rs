//! Vectors distributed over the ranks of a [`Communicator`].
use crate::comm::Communicator;
use crate::dofs::DofPartition;
use nalgebra::DVector;
use std::sync::Arc;

/// A vector holding the locally relevant entries of a global vector.
///
/// Owned entries are authoritative. Ghost entries are local copies that may go stale after
/// bulk edits until [`update_ghost_values`](Self::update_ghost_values) is called.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedVector {
    partition: Arc<DofPartition>,
    values: Vec<f64>,
}

impl DistributedVector {
    pub fn zeros(partition: Arc<DofPartition>) -> Self {
        let values = vec![0.0; partition.locally_relevant().n_elements()];
        Self { partition, values }
    }

    /// Picks the locally relevant entries of a global vector.
    ///
    /// # Panics
    ///
    /// Panics if the length of `global` differs from the number of dofs.
    pub fn from_global(partition: Arc<DofPartition>, global: &DVector<f64>) -> Self {
        assert_eq!(global.len(), partition.n_dofs(), "Global vector must have one entry per dof");
        let values = partition
            .locally_relevant()
            .iter()
            .map(|i| global[i])
            .collect();
        Self { partition, values }
    }

    pub fn partition(&self) -> &Arc<DofPartition> {
        &self.partition
    }

    /// Global length.
    pub fn len(&self) -> usize {
        self.partition.n_dofs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of global entry `index`, or `None` if it is not locally relevant.
    pub fn get(&self, index: usize) -> Option<f64> {
        let local = self.partition.locally_relevant().index_within_set(index)?;
        Some(self.values[local])
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut f64> {
        let local = self.partition.locally_relevant().index_within_set(index)?;
        Some(&mut self.values[local])
    }

    /// Sets entry `index` if it is locally relevant, and reports whether it was.
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        match self.get_mut(index) {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// `(global index, value)` for every locally relevant entry.
    pub fn iter_relevant(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.partition
            .locally_relevant()
            .iter()
            .zip(self.values.iter().copied())
    }

    /// `(global index, value)` for every locally owned entry.
    pub fn iter_owned(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.iter_relevant()
            .filter(move |(i, _)| self.partition.is_owned(*i))
    }

    /// Overwrites ghost entries with the values held by their owners.
    ///
    /// Collective.
    pub fn update_ghost_values(&mut self, comm: &impl Communicator) {
        let owned: Vec<(usize, f64)> = self.iter_owned().collect();
        for rank_values in comm.all_gather(owned) {
            for (index, value) in rank_values {
                self.set(index, value);
            }
        }
    }

    /// Inner product over all ranks, summing owned entries only.
    ///
    /// Collective. Every rank obtains the same value.
    ///
    /// # Panics
    ///
    /// Panics if the vectors are partitioned differently.
    pub fn dot(&self, other: &DistributedVector, comm: &impl Communicator) -> f64 {
        assert_eq!(self.partition, other.partition, "Vectors must share their partition");
        let local: f64 = self
            .iter_relevant()
            .zip(other.values.iter())
            .filter(|((i, _), _)| self.partition.is_owned(*i))
            .map(|((_, a), b)| a * b)
            .sum();
        comm.all_reduce_sum(local)
    }

    /// Assembles the full global vector on every rank from the owned entries.
    ///
    /// Collective.
    pub fn gather(&self, comm: &impl Communicator) -> DVector<f64> {
        let mut global = DVector::zeros(self.len());
        let owned: Vec<(usize, f64)> = self.iter_owned().collect();
        for rank_values in comm.all_gather(owned) {
            for (index, value) in rank_values {
                global[index] = value;
            }
        }
        global
    }
}
