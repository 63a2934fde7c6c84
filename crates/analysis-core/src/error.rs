use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Caller passed parameters an operation cannot work with (e.g. a zero window).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Data violates a structural invariant (ordering, OHLC bounds).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Market data could not be obtained: bad symbol, empty range or network failure.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// An upstream service answered with an error status.
    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
