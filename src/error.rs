use thiserror::Error;

/// Errors reported by tree constructors and JSON decoding.
///
/// Missing keys are never errors; lookups report them as `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// A B-tree needs room for at least three children per node.
    #[error("invalid B-tree order {0}: order must be at least 3")]
    InvalidOrder(usize),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
