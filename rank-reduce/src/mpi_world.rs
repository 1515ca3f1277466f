//! Process group backed by the system MPI library.
use log::debug;
use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::SystemCommunicator;
use mpi::traits::{Communicator as _, Root};
use crate::communicator::undecodable_name;
use crate::{Communicator, Error, GroupSize, Rank, Result, Value};

/// World communicator of an MPI job.
///
/// MPI is finalized when this value is dropped.
pub struct MpiWorld {
    world: SystemCommunicator,
    // Declared last so the communicator is dropped before finalization.
    _universe: Universe,
}

impl MpiWorld {
    /// Initialize MPI and return the world communicator.
    pub fn init() -> Result<MpiWorld> {
        let universe = mpi::initialize().ok_or(Error::InitFailure)?;
        let world = universe.world();
        Ok(MpiWorld {
            world,
            _universe: universe,
        })
    }

    fn mpi_rank(rank: Rank) -> Result<i32> {
        i32::try_from(rank).map_err(|_| Error::InvalidRank(rank))
    }
}

impl Communicator for MpiWorld {
    fn rank(&self) -> Rank {
        self.world.rank() as Rank
    }

    fn size(&self) -> GroupSize {
        self.world.size() as GroupSize
    }

    fn processor_name(&self) -> Result<String> {
        mpi::environment::processor_name().map_err(undecodable_name)
    }

    fn reduce_sum(&self, value: Value, root: Rank) -> Result<Option<Value>> {
        if root >= self.size() {
            return Err(Error::InvalidRank(root));
        }
        let root_rank = MpiWorld::mpi_rank(root)?;
        let root_process = self.world.process_at_rank(root_rank);
        debug!("rank {} contributed {} (root {})", self.world.rank(), value, root);
        if self.world.rank() == root_rank {
            let mut sum: Value = 0;
            root_process.reduce_into_root(&value, &mut sum, SystemOperation::sum());
            Ok(Some(sum))
        } else {
            root_process.reduce_into(&value, SystemOperation::sum());
            Ok(None)
        }
    }
}
