use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Domain level error type for feed translation.
///
/// Per-trip failures are recoverable: the processor records them and drops
/// the update. Schedule-side failures surface at index build time and are
/// fatal to startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A realtime trip identifier did not match the agency grammar.
    #[error("bad trip id: {0}")]
    BadTripId(String),

    /// A schedule-side identifier did not match the agency grammar.
    #[error("bad path id: {0}")]
    BadPathId(String),

    /// A static schedule field could not be interpreted.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}
