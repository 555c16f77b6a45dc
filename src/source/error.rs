use thiserror::Error;

use crate::source::BlockId;

/// Failure to resolve a record in a [`ModelSource`](crate::source::ModelSource).
///
/// Controllers never surface these: a failed lookup leaves the controller
/// inert until the next successful refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The link points past the end of the block list.
    #[error("Block {0:?} does not exist")]
    MissingBlock(BlockId),

    /// The block exists but holds a different record kind.
    #[error("Block {id:?} is a {found}, expected {expected}")]
    KindMismatch {
        id: BlockId,
        expected: &'static str,
        found: &'static str,
    },

    /// A required link field is empty.
    #[error("Link '{0}' is not set")]
    NullLink(&'static str),
}

/// Alias for `Result<T, SourceError>`.
pub type Result<T> = std::result::Result<T, SourceError>;
