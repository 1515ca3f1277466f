//! Collective primitives consumed from the message-passing runtime.
use std::io;
use crate::{Error, GroupSize, Rank, Result, Value};

/// Handle on a process group provided by an external runtime.
///
/// Implementations own the transport; callers only see the collective.
pub trait Communicator {
    /// Return the rank of this member.
    fn rank(&self) -> Rank;

    /// Return the number of members in the group.
    fn size(&self) -> GroupSize;

    /// Return the name of the processor this member runs on.
    fn processor_name(&self) -> Result<String>;

    /// Sum `value` across every member onto `root` (blocking).
    ///
    /// Every member of the group must call this with the same `root`. No
    /// member returns until all of them have contributed. The sum is
    /// returned on `root` only; all other members get `None`.
    fn reduce_sum(&self, value: Value, root: Rank) -> Result<Option<Value>>;
}

/// Error for a processor name that is not valid UTF-8.
pub(crate) fn undecodable_name<E>(_: E) -> Error {
    Error::Io(io::ErrorKind::InvalidData)
}
