//! In-process process group.
//!
//! Each member of a [`LocalGroup`] is an OS thread. Collectives are built on
//! a shared slot table and a reusable barrier, so a member blocks in
//! [`Communicator::reduce_sum`] until the whole group has contributed.
use std::io;
use std::sync::{Arc, Barrier, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use log::{debug, error, info};
use crate::communicator::undecodable_name;
use crate::{Communicator, Error, GroupSize, Rank, Result, Value};

/// Contribution of one member to the current reduction: (value, root).
type Slot = Option<(Value, Rank)>;

/// State shared by all members of a local group.
struct Shared {
    size: GroupSize,
    slots: Mutex<Vec<Slot>>,
    barrier: Barrier,
}

impl Shared {
    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        // A poisoned lock only means a member panicked; the slots are
        // rewritten by every reduction.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A process group whose members run on threads of this process.
pub struct LocalGroup {
    shared: Arc<Shared>,
}

impl LocalGroup {
    /// Create a group with `size` members.
    pub fn new(size: GroupSize) -> Result<LocalGroup> {
        if size == 0 {
            return Err(Error::EmptyGroup);
        }
        let members = usize::try_from(size).map_err(|_| Error::Overflow)?;
        Ok(LocalGroup {
            shared: Arc::new(Shared {
                size,
                slots: Mutex::new(vec![None; members]),
                barrier: Barrier::new(members),
            }),
        })
    }

    pub fn size(&self) -> GroupSize {
        self.shared.size
    }

    /// Return the communicator for member `rank`.
    ///
    /// Handing out the same rank twice makes the group deadlock on its
    /// first collective.
    pub fn communicator(&self, rank: Rank) -> Result<LocalCommunicator> {
        if rank >= self.shared.size {
            return Err(Error::InvalidRank(rank));
        }
        Ok(LocalCommunicator {
            rank,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Communicator of one member of a [`LocalGroup`].
#[derive(Clone)]
pub struct LocalCommunicator {
    rank: Rank,
    shared: Arc<Shared>,
}

impl LocalCommunicator {
    /// Sum the contributions of the current round as seen from `root`.
    fn collect(&self, root: Rank) -> Result<Value> {
        let slots = self.shared.slots();
        let mut sum: Value = 0;
        for &slot in slots.iter() {
            let (value, member_root) = slot.ok_or(Error::MissingAggregate)?;
            if member_root != root {
                return Err(Error::RootMismatch {
                    expected: root,
                    found: member_root,
                });
            }
            sum = sum.checked_add(value).ok_or(Error::Overflow)?;
        }
        Ok(sum)
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> GroupSize {
        self.shared.size
    }

    fn processor_name(&self) -> Result<String> {
        nix::unistd::gethostname()
            .map_err(io::Error::from)?
            .into_string()
            .map_err(undecodable_name)
    }

    fn reduce_sum(&self, value: Value, root: Rank) -> Result<Option<Value>> {
        if root >= self.shared.size {
            return Err(Error::InvalidRank(root));
        }
        self.shared.slots()[self.rank as usize] = Some((value, root));
        debug!("rank {} contributed {} (root {})", self.rank, value, root);
        self.shared.barrier.wait();
        // Slots are stable between the two barriers.
        let result = if self.rank == root {
            Some(self.collect(root))
        } else {
            None
        };
        self.shared.barrier.wait();
        debug!("rank {} left reduction", self.rank);
        result.transpose()
    }
}

/// Holds members back until every one of them has been spawned.
struct StartLatch {
    go: Mutex<Option<bool>>,
    opened: Condvar,
}

impl StartLatch {
    fn new() -> StartLatch {
        StartLatch {
            go: Mutex::new(None),
            opened: Condvar::new(),
        }
    }

    /// Release the waiting members; `go` tells them whether to run.
    fn open(&self, go: bool) {
        *self.go.lock().unwrap_or_else(PoisonError::into_inner) = Some(go);
        self.opened.notify_all();
    }

    fn wait(&self) -> bool {
        let mut go = self.go.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(go) = *go {
                return go;
            }
            go = self.opened.wait(go).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Run `body` once per rank of a new group of `size` members.
///
/// Every member runs on its own named thread. Results are returned in rank
/// order once all members have finished.
pub fn launch<F, R>(size: GroupSize, body: F) -> Result<Vec<R>>
where
    F: Fn(LocalCommunicator) -> R + Sync,
    R: Send,
{
    launch_with(size, |_| thread::Builder::new(), body)
}

/// Like [`launch`], with `builder` configuring the thread of each rank
/// (stack size, for instance).
///
/// No member runs `body` before all of them are spawned. If any spawn
/// fails, the members already started exit without running `body` and
/// `Error::SpawnFailure` is returned.
pub fn launch_with<B, F, R>(size: GroupSize, builder: B, body: F) -> Result<Vec<R>>
where
    B: Fn(Rank) -> thread::Builder,
    F: Fn(LocalCommunicator) -> R + Sync,
    R: Send,
{
    let group = LocalGroup::new(size)?;
    let comms = (0..size)
        .map(|rank| group.communicator(rank))
        .collect::<Result<Vec<_>>>()?;
    let latch = StartLatch::new();
    thread::scope(|s| {
        let mut members = vec![];
        let mut spawned = Ok(());
        for (rank, comm) in (0..size).zip(comms) {
            let body = &body;
            let latch = &latch;
            info!("starting member {}", rank);
            let member = builder(rank)
                .name(format!("rank-{}", rank))
                .spawn_scoped(s, move || latch.wait().then(|| body(comm)));
            match member {
                Ok(member) => members.push(member),
                Err(err) => {
                    error!("failed to start member {}: {}", rank, err);
                    spawned = Err(Error::SpawnFailure);
                    break;
                }
            }
        }
        latch.open(spawned.is_ok());
        // On failure the scope still joins the started members; they
        // return as soon as the latch opens.
        spawned?;

        let mut results = Vec::with_capacity(members.len());
        for (rank, member) in members.into_iter().enumerate() {
            let rank = rank as Rank;
            let result = member
                .join()
                .map_err(|_| Error::MemberPanicked(rank))?
                .ok_or(Error::SpawnFailure)?;
            info!("member {} completed", rank);
            results.push(result);
        }
        Ok(results)
    })
}
