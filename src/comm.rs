//! Collective communication between cooperating ranks.
//!
//! Every collective in this module must be called by all ranks of a group, the same number of
//! times and in the same order. All ranks obtain identical results from a reduction. The
//! in-process communicators reduce in rank order; with the `mpi` feature, [`MpiCommunicator`]
//! leaves the order to the MPI implementation.
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::{Arc, Barrier};

#[cfg(feature = "mpi")]
mod message_passing;

#[cfg(feature = "mpi")]
pub use self::message_passing::MpiCommunicator;

/// A group of ranks that exchange data through collective operations.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Gathers the local value of every rank, ordered by rank, on every rank.
    ///
    /// Payloads are serializable so that they can cross process boundaries.
    fn all_gather<T>(&self, local: T) -> Vec<T>
    where
        T: Clone + Send + Serialize + DeserializeOwned + 'static;

    /// Blocks until every rank has reached the barrier.
    fn barrier(&self);

    /// Logical OR over all ranks.
    fn all_reduce_or(&self, local: bool) -> bool {
        self.all_gather(local).into_iter().any(|value| value)
    }

    fn all_reduce_sum(&self, local: f64) -> f64 {
        self.all_gather(local).into_iter().sum()
    }

    fn all_reduce_max(&self, local: f64) -> f64 {
        self.all_gather(local)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Replaces every entry of `values` by its sum over all ranks.
    ///
    /// # Panics
    ///
    /// Panics if the ranks pass slices of different lengths.
    fn all_reduce_sum_in_place(&self, values: &mut [f64]) {
        let contributions = self.all_gather(values.to_vec());
        values.fill(0.0);
        for contribution in contributions {
            assert_eq!(contribution.len(), values.len(), "Reduction buffers must have equal length");
            for (value, c) in values.iter_mut().zip(contribution) {
                *value += c;
            }
        }
    }
}

/// The trivial group consisting of a single rank.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather<T>(&self, local: T) -> Vec<T>
    where
        T: Clone + Send + Serialize + DeserializeOwned + 'static,
    {
        vec![local]
    }

    fn barrier(&self) {}
}

struct SharedSlots {
    slots: Mutex<Vec<Option<Box<dyn Any + Send>>>>,
    barrier: Barrier,
}

/// A rank of an in-process group in which every rank is driven by its own thread.
///
/// Collectives synchronize through a shared barrier, so a rank that skips a collective which
/// the others call blocks the whole group. Calling different collectives on different ranks
/// (with different payload types) is a desynchronization and panics.
#[derive(Clone)]
pub struct ThreadCommunicator {
    rank: usize,
    size: usize,
    shared: Arc<SharedSlots>,
}

impl std::fmt::Debug for ThreadCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl ThreadCommunicator {
    /// Creates the communicators of a group with `size` ranks, ordered by rank.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn group(size: usize) -> Vec<Self> {
        assert!(size > 0, "A communicator group needs at least one rank");
        let shared = Arc::new(SharedSlots {
            slots: Mutex::new((0..size).map(|_| None).collect()),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_gather<T>(&self, local: T) -> Vec<T>
    where
        T: Clone + Send + Serialize + DeserializeOwned + 'static,
    {
        self.shared.slots.lock()[self.rank] = Some(Box::new(local));
        self.shared.barrier.wait();
        let gathered = self
            .shared
            .slots
            .lock()
            .iter()
            .map(|slot| {
                slot.as_ref()
                    .and_then(|value| value.downcast_ref::<T>())
                    .cloned()
                    .expect("Collective desynchronization: ranks called different collectives")
            })
            .collect();
        // No rank may overwrite its slot before every rank has read all slots
        self.shared.barrier.wait();
        gathered
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}

/// Runs `f` on every rank of a new [`ThreadCommunicator`] group of the given size and returns
/// the per-rank results, ordered by rank.
///
/// A panic on any rank is propagated once the scope has joined. Since the remaining ranks may
/// then wait forever in a collective, `f` should report failures through its return value and
/// leave assertions to the caller.
pub fn run_ranks<R, F>(size: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadCommunicator) -> R + Sync,
{
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = ThreadCommunicator::group(size)
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}
