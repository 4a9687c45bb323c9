//! Database error types; `InitError` & `RuntimeError`.

//---------------------------------------------------------------------------------------------------- Import
use crate::serial::DecodeError;

//---------------------------------------------------------------------------------------------------- Aliases
/// Alias for a result with [`RuntimeError`] as the error type.
pub type DbResult<T> = Result<T, RuntimeError>;

//---------------------------------------------------------------------------------------------------- InitError
/// Errors that occur during environment/file opening.
///
/// Everything after a successful open is a [`RuntimeError`].
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    /// The engine refused to open the environment.
    #[error("database environment failed to open: {0}")]
    EnvOpen(#[source] heed::Error),

    /// The engine refused to open a named database file.
    #[error("database file `{file}` failed to open: {source}")]
    DbOpen {
        /// The named database file that failed to open.
        file: &'static str,
        /// The underlying engine error.
        #[source]
        source: heed::Error,
    },

    /// A named database file does not exist and
    /// the open mode did not allow creating it.
    #[error("database file `{file}` does not exist")]
    MissingFile {
        /// The named database file that was not found.
        file: &'static str,
    },

    /// A filesystem error while preparing the environment directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The initial `"version"` record could not be written.
    #[error("failed to stamp the version record: {0}")]
    Version(#[source] RuntimeError),
}

//---------------------------------------------------------------------------------------------------- RuntimeError
/// Errors that occur _after_ successful opening.
///
/// [`RuntimeError::KeyNotFound`] is soft: point reads map it to
/// [`None`] and cursor scans use it as their terminator. Everything
/// else is a hard error to the caller.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    /// The key already existed and the write refused to overwrite it.
    #[error("key already existed in the database")]
    KeyExists,

    /// The key did not exist in the database.
    #[error("key/value pair was not found in the database")]
    KeyNotFound,

    /// A record's bytes did not decode per schema.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The handle is bound read-only and a write was attempted.
    #[error("database handle is read-only")]
    ReadOnly,

    /// A commit/abort was issued with no transaction on the stack.
    #[error("no transaction is active on this handle")]
    NoTransaction,

    /// An I/O or engine-level error.
    #[error("database I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for RuntimeError {
    fn from(error: heed::Error) -> Self {
        use heed::{Error, MdbError};

        match error {
            Error::Io(io_error) => Self::Io(io_error),
            Error::Mdb(MdbError::KeyExist) => Self::KeyExists,
            Error::Mdb(MdbError::NotFound) => Self::KeyNotFound,
            Error::Mdb(mdb_error) => Self::Io(std::io::Error::other(mdb_error)),
            // Encoding/decoding never fails on our raw-byte tables,
            // and the remaining variants are open-options misuse.
            error => Self::Io(std::io::Error::other(error)),
        }
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use super::*;

    /// `KeyNotFound` must stay distinguishable — loaders
    /// pattern-match it as the scan terminator.
    #[test]
    fn not_found_maps_to_soft_error() {
        let err = RuntimeError::from(heed::Error::Mdb(heed::MdbError::NotFound));
        assert!(matches!(err, RuntimeError::KeyNotFound));

        let err = RuntimeError::from(heed::Error::Mdb(heed::MdbError::KeyExist));
        assert!(matches!(err, RuntimeError::KeyExists));
    }
}
