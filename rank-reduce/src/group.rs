//! Process group identity passed explicitly to the reducer.
use crate::{Communicator, Error, Result};

/// Zero-based index of a process within its group.
pub type Rank = u64;

/// Number of processes in a group.
pub type GroupSize = u64;

/// Per-rank and aggregate values.
pub type Value = u64;

/// Rank, size and communicator handle of one group member.
#[derive(Debug)]
pub struct GroupContext<C> {
    rank: Rank,
    size: GroupSize,
    comm: C,
}

impl<C> GroupContext<C> {
    /// Build a context from values handed over by the launcher.
    pub fn new(rank: Rank, size: GroupSize, comm: C) -> Result<GroupContext<C>> {
        if size == 0 {
            return Err(Error::EmptyGroup);
        }
        if rank >= size {
            return Err(Error::InvalidRank(rank));
        }
        Ok(GroupContext {
            rank,
            size,
            comm,
        })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> GroupSize {
        self.size
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }
}

impl<C: Communicator> GroupContext<C> {
    /// Build a context from the rank and size the communicator reports.
    pub fn from_communicator(comm: C) -> Result<GroupContext<C>> {
        let rank = comm.rank();
        let size = comm.size();
        GroupContext::new(rank, size, comm)
    }
}
