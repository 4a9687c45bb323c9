//! Utilities for `ferrate-database` testing.
//!
//! These types/fn's are only:
//! - enabled on `#[cfg(test)]`
//! - only used internally

//---------------------------------------------------------------------------------------------------- Import
use crate::{config::ConfigBuilder, env::Env};

//---------------------------------------------------------------------------------------------------- Helpers
/// Create an unopened [`Env`] rooted in a temporary directory.
///
/// The directory is automatically removed after the `TempDir` is dropped.
pub(crate) fn tmp_env() -> (Env, tempfile::TempDir) {
    let tempdir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new(tempdir.path().to_owned())
        // Plenty for tests, tiny for address space.
        .map_size(64 * 1024 * 1024)
        .build();
    (Env::new(config), tempdir)
}
