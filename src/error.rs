//! Launch-time configuration errors
//!
//! Everything in here is detected while a launch is being prepared. Once lanes are running
//! there is no recoverable error path: an invariant violation inside the search is a bug and
//! panics.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("board size must be at least 1, got {0}")]
    EmptyBoard(u32),

    #[error("board size {n} does not fit into {bits}-bit occupancy masks")]
    BoardTooWide { n: u32, bits: u32 },

    #[error("packed constellation records describe boards up to 32 rows, got {0}")]
    NotPackable(u32),

    #[error("constellation without border queens cannot be packed into a record")]
    MissingBorder,

    #[error("workgroup size must be positive")]
    EmptyWorkgroup,

    #[error("at least one workgroup is required")]
    NoWorkgroups,

    #[error(
        "workgroup of {lanes} lanes needs {required} bytes of local memory, only {available} available"
    )]
    LocalMemoryExceeded {
        lanes: usize,
        required: usize,
        available: usize,
    },

    #[error("group-leader table sharing requires job-pool distribution")]
    SharingNeedsGroups,

    #[error("constellation {index} is malformed: {reason}")]
    MalformedConstellation { index: usize, reason: String },

    #[error("{given} previous results supplied for {expected} constellations")]
    ResumeLengthMismatch { given: usize, expected: usize },

    #[error("precomputed forbidden table for ({j}, {k}, {l}) is missing")]
    MissingTable { j: u32, k: u32, l: u32 },
}
