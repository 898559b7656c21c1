use crate::io::storage::StorageError;

/// Errors raised by the project core.
///
/// Every variant is recoverable at the CLI boundary, where it is reported as
/// `error: <message>` and mapped to a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: unknown kind or status, bad date, empty update.
    #[error("{0}")]
    Validation(String),
    /// A path or id that does not resolve to an item.
    #[error("not found: {0}")]
    NotFound(String),
    /// The operation is not allowed in the item's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Attempted mutation of an item that lives in the archive.
    #[error("archived item is read-only: {0}")]
    ArchivedItem(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn invalid_op(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }
}
