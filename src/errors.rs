use thiserror::Error;

use crate::model::Move;

/// Errors from constructing or manipulating puzzle states.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("tube capacity must be positive")]
    NonPositiveCapacity,

    /// Detected liquid cannot exceed the tube's physical height. The total is
    /// wide enough to report sums past `u32::MAX` faithfully.
    #[error("segments sum to {total} but the tube capacity is only {capacity}")]
    CapacityOverflow { total: u64, capacity: u32 },

    #[error("segment heights must be positive")]
    ZeroHeightSegment,

    #[error("move {0} is not legal in this state")]
    IllegalMove(Move),
}

/// Errors from parsing the text representation of a puzzle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("puzzle description is empty")]
    EmptyRepr,

    #[error("unrecognized token {token:?} in tube description {repr:?}")]
    InvalidToken { token: String, repr: String },

    /// Empty space below liquid is physically impossible; the `.` token may
    /// only describe the pourable end of a tube.
    #[error("empty space must sit at the pourable end in {repr:?}")]
    MisplacedEmpty { repr: String },

    #[error(transparent)]
    State(#[from] StateError),
}
