//! Store error types; `StoreError`.

//---------------------------------------------------------------------------------------------------- Import
use ferrate_database::{serial::DecodeError, InitError, RuntimeError};

//---------------------------------------------------------------------------------------------------- Aliases
/// Alias for a result with [`StoreError`] as the error type.
pub type StoreResult<T> = Result<T, StoreError>;

//---------------------------------------------------------------------------------------------------- StoreError
/// Errors surfaced by the record stores and their loaders.
///
/// Loaders short-circuit on these; the startup orchestrator treats a
/// failed block-index or wallet load as fatal to the process.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A record's bytes did not decode per its family's schema.
    #[error("record in `{file}` under tag {tag:?} failed to decode: {source}")]
    Decode {
        /// The database file holding the bad record.
        file: &'static str,
        /// The record family's discriminator tag.
        tag: &'static str,
        /// What exactly did not decode.
        #[source]
        source: DecodeError,
    },

    /// The best-chain record is present but names no
    /// known block-index record.
    #[error("best-chain hash names no known block-index record")]
    MissingBestChain,

    /// A transaction body could not be read from the block files.
    #[error("transaction body could not be read from the block files: {0}")]
    BlockFile(#[source] std::io::Error),

    /// An environment or file failed to open.
    #[error(transparent)]
    Init(#[from] InitError),

    /// A database operation failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl StoreError {
    /// Wrap a decode failure with its file/tag context.
    pub(crate) const fn decode(
        file: &'static str,
        tag: &'static str,
        source: DecodeError,
    ) -> Self {
        Self::Decode { file, tag, source }
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {}
