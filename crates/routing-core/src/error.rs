use thiserror::Error;

/// Open-phase / registration errors. Solve-time infeasibility and limit
/// trips never produce a `RoutingError` — they flow through
/// `RoutingStatus` as data instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("model is already closed")]
    AlreadyClosed,

    #[error("model must be closed before this operation")]
    NotClosed,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dimension `{0}` is already registered")]
    DuplicateDimension(String),

    #[error("dimension `{0}` not found")]
    UnknownDimension(String),

    #[error(
        "disjunction is ill-posed: max_cardinality {max_cardinality} exceeds \
         {indices} indices"
    )]
    IllPosedDisjunction {
        max_cardinality: usize,
        indices: usize,
    },

    #[error("index {0} is out of range")]
    InvalidIndex(i64),

    #[error("callback id {0} is not registered")]
    UnknownCallback(usize),

    #[error("serialization failed: {0}")]
    Serde(String),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
