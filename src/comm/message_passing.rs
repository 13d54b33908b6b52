use super::Communicator;
use mpi::collective::{CommunicatorCollectives, SystemOperation};
use mpi::datatype::PartitionMut;
use mpi::Count;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A rank of an MPI communicator.
///
/// Gathers of arbitrary payloads are serialized with `bincode` and exchanged as variable-count
/// byte buffers. The scalar and slice reductions map directly onto `MPI_Allreduce`, so their
/// results agree on every rank but the summation order is left to the MPI implementation.
///
/// ```ignore
/// let universe = mpi::initialize().unwrap();
/// let comm = MpiCommunicator::new(universe.world());
/// ```
pub struct MpiCommunicator<C> {
    comm: C,
}

impl<C> std::fmt::Debug for MpiCommunicator<C>
where
    C: mpi::traits::Communicator,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpiCommunicator")
            .field("rank", &self.rank())
            .field("size", &self.size())
            .finish()
    }
}

impl<C> MpiCommunicator<C>
where
    C: mpi::traits::Communicator,
{
    pub fn new(comm: C) -> Self {
        Self { comm }
    }

    pub fn inner(&self) -> &C {
        &self.comm
    }

    pub fn into_inner(self) -> C {
        self.comm
    }
}

impl<C> Communicator for MpiCommunicator<C>
where
    C: mpi::traits::Communicator,
{
    fn rank(&self) -> usize {
        mpi::traits::Communicator::rank(&self.comm) as usize
    }

    fn size(&self) -> usize {
        mpi::traits::Communicator::size(&self.comm) as usize
    }

    /// # Panics
    ///
    /// Panics if a payload cannot be encoded, or if a received payload does not decode as `T`,
    /// which happens when ranks call different collectives.
    fn all_gather<T>(&self, local: T) -> Vec<T>
    where
        T: Clone + Send + Serialize + DeserializeOwned + 'static,
    {
        let encoded = bincode::serialize(&local).expect("Collective payload must be serializable");
        let count = Count::try_from(encoded.len()).expect("Collective payload exceeds the MPI count range");

        let mut counts = vec![0 as Count; self.size()];
        self.comm.all_gather_into(&count, &mut counts[..]);
        let displacements: Vec<Count> = counts
            .iter()
            .scan(0, |offset, &count| {
                let displacement = *offset;
                *offset += count;
                Some(displacement)
            })
            .collect();

        let total = counts.iter().map(|&count| count as usize).sum();
        let mut bytes = vec![0u8; total];
        {
            let mut partition = PartitionMut::new(&mut bytes[..], &counts[..], &displacements[..]);
            self.comm
                .all_gather_varcount_into(&encoded[..], &mut partition);
        }

        counts
            .iter()
            .zip(&displacements)
            .map(|(&count, &displacement)| {
                let start = displacement as usize;
                bincode::deserialize(&bytes[start..start + count as usize])
                    .expect("Collective desynchronization: ranks called different collectives")
            })
            .collect()
    }

    fn barrier(&self) {
        self.comm.barrier();
    }

    fn all_reduce_or(&self, local: bool) -> bool {
        let mut result = false;
        self.comm
            .all_reduce_into(&local, &mut result, SystemOperation::logical_or());
        result
    }

    fn all_reduce_sum(&self, local: f64) -> f64 {
        let mut result = 0.0;
        self.comm
            .all_reduce_into(&local, &mut result, SystemOperation::sum());
        result
    }

    fn all_reduce_max(&self, local: f64) -> f64 {
        let mut result = f64::NEG_INFINITY;
        self.comm
            .all_reduce_into(&local, &mut result, SystemOperation::max());
        result
    }

    fn all_reduce_sum_in_place(&self, values: &mut [f64]) {
        let local = values.to_vec();
        self.comm
            .all_reduce_into(&local[..], values, SystemOperation::sum());
    }
}
