//! Rank reduction over a message-passing process group.
//!
//! Every member of the group computes a value from its own rank. The values
//! are either printed by each member or summed onto a single root member by
//! a collective reduction. The process group itself is provided by an
//! external runtime, reached through the [`Communicator`] trait.
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use serde::de::DeserializeOwned;

mod communicator;
pub use communicator::Communicator;
mod config;
pub use config::{Config, Mode};
mod group;
pub use group::{GroupContext, GroupSize, Rank, Value};
pub mod local;
pub use local::{launch, launch_with, LocalCommunicator, LocalGroup};
#[cfg(feature = "mpi")]
mod mpi_world;
#[cfg(feature = "mpi")]
pub use mpi_world::MpiWorld;
mod reducer;
pub use reducer::{square, sum_of_squares, RankReducer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The message-passing runtime could not be initialized.
    InitFailure,

    /// A group was requested with no members.
    EmptyGroup,

    /// Rank is outside of the group.
    InvalidRank(Rank),

    /// Members entered the same reduction with different roots.
    RootMismatch { expected: Rank, found: Rank },

    /// Integer overflow while computing or summing values.
    Overflow,

    /// The root reached the report step without an aggregate.
    MissingAggregate,

    /// The aggregate did not match the closed form for the group size.
    VerificationFailed { expected: Value, actual: Value },

    /// A group member could not be started.
    SpawnFailure,

    /// A group member panicked before returning.
    MemberPanicked(Rank),

    /// Writing results or reading the config failed.
    Io(io::ErrorKind),

    /// The config file could not be parsed.
    ConfigError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitFailure => write!(f, "failed to initialize the message-passing runtime"),
            Error::EmptyGroup => write!(f, "process group has no members"),
            Error::InvalidRank(rank) => write!(f, "rank {} is outside of the group", rank),
            Error::RootMismatch { expected, found } => {
                write!(f, "reduction root mismatch: expected {}, found {}", expected, found)
            }
            Error::Overflow => write!(f, "integer overflow"),
            Error::MissingAggregate => write!(f, "root has no aggregate to report"),
            Error::VerificationFailed { expected, actual } => {
                write!(f, "aggregate {} does not match expected {}", actual, expected)
            }
            Error::SpawnFailure => write!(f, "failed to spawn group member"),
            Error::MemberPanicked(rank) => write!(f, "group member {} panicked", rank),
            Error::Io(kind) => write!(f, "I/O error: {}", kind),
            Error::ConfigError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err.kind())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Initialize logging from `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Load a YAML config file into `T`.
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let f = File::open(path)?;
    Ok(serde_yaml::from_reader(f)?)
}
