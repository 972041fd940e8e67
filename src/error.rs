//! Error types for bigarr

use thiserror::Error;

/// Result type alias for bigarr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bigarr operations.
///
/// Point operations (`get`, `set`) accept every `u64` key and cannot fail;
/// only bulk operations over a key range can.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("range of {len} keys starting at {start} runs past u64::MAX")]
    RangeOverflow { start: u64, len: usize },
}
