//! The error type shared by every fallible operation on a combinatorial map.

use crate::map::DartId;

/// Error in querying, mutating or exporting a combinatorial map.
///
/// Errors are local to the call that produced them:
/// marks reserved during a failed operation are always released
/// and the map is left as it was before the call.
#[derive(thiserror::Error, Debug)]
pub enum CmapError {
    /// Every mark in the pool is currently reserved.
    #[error("No free marks left (at most {} can be reserved at once)", crate::mark::MAX_MARKS)]
    PoolExhausted,
    /// A cell or relation dimension larger than the map's dimension was requested.
    #[error("Invalid dimension {dim}: the map has dimension {max}")]
    InvalidDimension {
        /// The requested dimension.
        dim: usize,
        /// The dimension of the map.
        max: usize,
    },
    /// A dart handle that doesn't (or no longer) belong to the map.
    #[error("Dart {0:?} does not belong to the map")]
    DanglingHandle(DartId),
    /// Tried to sew a dart whose link for the relation is already in use.
    #[error("Dart {dart:?} is already sewn along relation {relation}")]
    AlreadySewn {
        /// The relation index being sewn.
        relation: usize,
        /// The dart whose link wasn't free.
        dart: DartId,
    },
    /// Tried to sew two faces with different numbers of darts.
    #[error("Cannot sew faces of {left} and {right} darts together")]
    IncompatibleSew {
        /// Number of darts in the face of the first dart.
        left: usize,
        /// Number of darts in the face of the second dart.
        right: usize,
    },
    /// A vertex has no point attached, so its coordinates can't be exported.
    #[error("Vertex 0_{vertex} has no point attached")]
    MissingPoint {
        /// Index of the vertex in 0-cell enumeration order.
        vertex: usize,
    },
    /// Malformed incidence graph or vertex data.
    #[error("Parsing failed on line {line}: {message}")]
    Parse {
        /// One-based line number of the offending line.
        line: usize,
        /// What was wrong with it.
        message: String,
    },
    /// Reading or writing an export file failed.
    #[error("I/O error during export")]
    Io(#[from] std::io::Error),
}
