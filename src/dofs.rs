//! Ownership of degrees of freedom across ranks.
use itertools::Itertools;
use nalgebra_sparse::pattern::SparsityPattern;
use std::ops::Range;

/// A sorted set of global indices drawn from `0 .. size`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    size: usize,
    indices: Vec<usize>,
}

impl IndexSet {
    /// The empty subset of `0 .. size`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            indices: Vec::new(),
        }
    }

    /// Builds a set from arbitrary, possibly unsorted and repeated, indices.
    ///
    /// # Panics
    ///
    /// Panics if an index is not smaller than `size`.
    pub fn from_indices(size: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<_> = indices.into_iter().collect();
        assert!(
            indices.iter().all(|&i| i < size),
            "Index out of bounds for index set of size {size}"
        );
        indices.sort_unstable();
        indices.dedup();
        Self { size, indices }
    }

    pub fn from_range(size: usize, range: Range<usize>) -> Self {
        Self::from_indices(size, range)
    }

    /// Size of the index space the set is a subset of.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn n_elements(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_element(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Position of `index` among the elements of the set.
    pub fn index_within_set(&self, index: usize) -> Option<usize> {
        self.indices.binary_search(&index).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_subset_of(&self, other: &IndexSet) -> bool {
        self.iter().all(|i| other.is_element(i))
    }

    /// # Panics
    ///
    /// Panics if the sets are subsets of index spaces of different sizes.
    pub fn union(&self, other: &IndexSet) -> IndexSet {
        assert_eq!(self.size, other.size, "Index sets must share the index space");
        Self {
            size: self.size,
            indices: self.iter().merge(other.iter()).dedup().collect(),
        }
    }
}

/// The degrees of freedom a single rank owns, and those it can read.
///
/// Owned indices are written by this rank only. Relevant indices are a superset that also
/// contains ghost entries owned elsewhere but needed locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofPartition {
    n_dofs: usize,
    locally_owned: IndexSet,
    locally_relevant: IndexSet,
}

impl DofPartition {
    /// # Panics
    ///
    /// Panics if the sets do not live in `0 .. n_dofs` or if an owned index is not relevant.
    pub fn new(n_dofs: usize, locally_owned: IndexSet, locally_relevant: IndexSet) -> Self {
        assert_eq!(locally_owned.size(), n_dofs);
        assert_eq!(locally_relevant.size(), n_dofs);
        assert!(
            locally_owned.is_subset_of(&locally_relevant),
            "Locally owned dofs must be locally relevant"
        );
        Self {
            n_dofs,
            locally_owned,
            locally_relevant,
        }
    }

    /// A single rank owning everything.
    pub fn serial(n_dofs: usize) -> Self {
        Self::contiguous(n_dofs, 0, 1)
    }

    /// Balanced block partition of `0 .. n_dofs` over `size` ranks, without ghosts.
    ///
    /// The first `n_dofs % size` ranks own one more index than the others.
    pub fn contiguous(n_dofs: usize, rank: usize, size: usize) -> Self {
        assert!(rank < size, "Rank {rank} out of bounds for group of size {size}");
        let base = n_dofs / size;
        let remainder = n_dofs % size;
        let begin = rank * base + rank.min(remainder);
        let end = begin + base + usize::from(rank < remainder);
        let owned = IndexSet::from_range(n_dofs, begin..end);
        Self::new(n_dofs, owned.clone(), owned)
    }

    /// Extends the relevant set by every column coupled to an owned row in `pattern`.
    pub fn with_ghosts_from_pattern(self, pattern: &SparsityPattern) -> Self {
        assert_eq!(pattern.major_dim(), self.n_dofs, "Pattern must have one row per dof");
        let ghosts = self
            .locally_owned
            .iter()
            .flat_map(|row| pattern.lane(row).iter().copied());
        let locally_relevant = IndexSet::from_indices(self.n_dofs, self.locally_relevant.iter().chain(ghosts));
        Self::new(self.n_dofs, self.locally_owned, locally_relevant)
    }

    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    pub fn locally_owned(&self) -> &IndexSet {
        &self.locally_owned
    }

    pub fn locally_relevant(&self) -> &IndexSet {
        &self.locally_relevant
    }

    pub fn is_owned(&self, index: usize) -> bool {
        self.locally_owned.is_element(index)
    }

    pub fn is_relevant(&self, index: usize) -> bool {
        self.locally_relevant.is_element(index)
    }
}
