//! Contracts consumed from external collaborators.
//!
//! The storage layer does not read block files and does not generate
//! elliptic-curve keys; it only states what it needs from the
//! components that do.

//---------------------------------------------------------------------------------------------------- Import
use crate::types::{DiskTxPos, KeyPair, Transaction};

//---------------------------------------------------------------------------------------------------- BlockFileReader
/// Reads transaction bodies out of the flat block files.
///
/// The stores only persist [`DiskTxPos`] positions; resolving one back
/// into a body goes through this contract.
pub trait BlockFileReader {
    /// Read the transaction body at `pos`.
    ///
    /// # Errors
    /// An I/O error when the position cannot be resolved, including
    /// positions that point outside any known block file.
    fn read_transaction(&self, pos: DiskTxPos) -> std::io::Result<Transaction>;
}

//---------------------------------------------------------------------------------------------------- KeyGenerator
/// Generates fresh wallet key pairs.
pub trait KeyGenerator {
    /// Mix additional entropy into the generator's pool.
    ///
    /// Called before key generation; `from_perfmon` asks for the
    /// slower, deeper system-state sweep.
    fn add_entropy(&self, from_perfmon: bool) {
        let _ = from_perfmon;
    }

    /// Generate a fresh key pair.
    fn make_new_key(&self) -> KeyPair;
}
