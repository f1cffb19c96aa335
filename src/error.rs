//! Provides [`Error`], [`FormatError`] etc.
use thiserror::Error as ThisError;

use crate::epoch::Epoch;

/// Alias for a `Result<T, datumtrans::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents all possible errors that can occur by this crate.
///
/// Every error is local to the call that returned it,
/// retrying with the same input gives the same error.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed, truncated or unresolvable grid file.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// The query point is outside every subgrid.
    #[error("position ({latitude:?}, {longitude:?}) is out-of-bounds of the grid")]
    OutOfBounds {
        /// Latitude of the query \[deg\]
        latitude: f64,
        /// Longitude of the query \[deg\]
        longitude: f64,
    },
    /// No transformation path of length ≤ 2 between the frames.
    #[error("no transformation path from {from} to {to}")]
    NoPath {
        /// Source frame
        from: String,
        /// Target frame
        to: String,
    },
    /// Summation of transformations with differing reference epochs.
    #[error("reference epochs differ: {left:?} and {right:?}")]
    EpochMismatch {
        /// Reference epoch of the left operand
        left: Option<Epoch>,
        /// Reference epoch of the right operand
        right: Option<Epoch>,
    },
    /// Summation of transformations that do not chain.
    #[error("transformations do not chain: {left_to} is not {right_from}")]
    FrameMismatch {
        /// Target frame of the left operand
        left_to: String,
        /// Source frame of the right operand
        right_from: String,
    },
    /// A time-dependent step has no epoch to be evaluated at.
    #[error("time-dependent step from {from} to {to} requires an epoch")]
    MissingEpoch {
        /// Source frame of the step
        from: String,
        /// Target frame of the step
        to: String,
    },
    /// Iterative reverse grid transformation did not converge.
    #[error("error is still high after {iterations:?} iterations at ({latitude:?}, {longitude:?})")]
    NotConvergent {
        /// Latitude of the last iterate \[deg\]
        latitude: f64,
        /// Longitude of the last iterate \[deg\]
        longitude: f64,
        /// Max iteration
        iterations: usize,
    },
    /// Failed to read a grid file from storage.
    #[error("failed to read grid file")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the caller may recover by choosing
    /// another correction method or frame path.
    ///
    /// # Example
    ///
    /// ```
    /// # use datumtrans::Error;
    /// let err = Error::OutOfBounds { latitude: 0.0, longitude: 0.0 };
    /// assert!(err.is_recoverable());
    ///
    /// let err = Error::NoPath { from: "A".to_string(), to: "B".to_string() };
    /// assert!(!err.is_recoverable());
    /// ```
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    #[cold]
    pub(crate) fn no_path(from: &str, to: &str) -> Self {
        Self::NoPath {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[cold]
    pub(crate) fn missing_epoch(from: &str, to: &str) -> Self {
        Self::MissingEpoch {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[cold]
    pub(crate) const fn out_of_bounds(latitude: f64, longitude: f64) -> Self {
        Self::OutOfBounds {
            latitude,
            longitude,
        }
    }
}

/// An error which can be returned on parsing a NTv2 grid file.
///
/// This error is used as the error type for the [`read_grid`](crate::ntv2::read_grid).
#[derive(Debug, PartialEq, ThisError)]
#[error("invalid grid file: {kind} at byte {offset}")]
pub struct FormatError {
    kind: FormatErrorKind,
    /// Byte offset of the offending record
    pub offset: usize,
}

/// An error kind of [`FormatError`].
#[derive(Debug, PartialEq, Clone, ThisError)]
pub enum FormatErrorKind {
    /// The file ends in the middle of a record.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// `NUM_OREC` is not sane in either byte order.
    #[error("byte order cannot be resolved")]
    UnresolvedByteOrder,
    /// `NUM_OREC` is sane in both byte orders.
    #[error("byte order is ambiguous")]
    AmbiguousByteOrder,
    /// A record key differs from the expected one.
    #[error("expected record {expected}, found {found:?}")]
    UnexpectedKey {
        /// The expected key
        expected: &'static str,
        /// The key found
        found: String,
    },
    /// A required header record is absent.
    #[error("missing record {0}")]
    MissingRecord(&'static str),
    /// A text field is not ASCII.
    #[error("invalid text field")]
    InvalidText,
    /// A count field is negative or absurd.
    #[error("invalid count")]
    InvalidCount,
    /// Shift values are not in arc-seconds.
    #[error("unsupported shift unit {0:?}")]
    UnsupportedUnit(String),
    /// The node count disagrees with the sub-header extent.
    #[error("subgrid {subgrid:?} declares {count} nodes but its extent gives {rows}x{cols}")]
    InconsistentShape {
        /// Name of the subgrid
        subgrid: String,
        /// Rows derived from the extent
        rows: usize,
        /// Columns derived from the extent
        cols: usize,
        /// `GS_COUNT`
        count: usize,
    },
    /// The extent is not a whole number of increments.
    #[error("subgrid {subgrid:?} has an invalid extent")]
    InvalidExtent {
        /// Name of the subgrid
        subgrid: String,
    },
}

impl FormatError {
    #[cold]
    pub(crate) const fn new(kind: FormatErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    /// Returns the detailed cause.
    pub const fn kind(&self) -> &FormatErrorKind {
        &self.kind
    }
}
