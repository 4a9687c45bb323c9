//! The main [`Config`] and [`ConfigBuilder`].

//---------------------------------------------------------------------------------------------------- Import
use std::path::{Path, PathBuf};

use crate::{
    config::SyncMode,
    constants::{DATABASE_DATA_FILENAME, DEFAULT_MAX_READERS},
};

//---------------------------------------------------------------------------------------------------- Constants
/// Default size of the environment's memory map, in bytes.
///
/// LMDB reserves address space, not disk; the data file
/// only grows to what is actually written.
const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024; // 1 GiB

//---------------------------------------------------------------------------------------------------- ConfigBuilder
/// Builder for [`Config`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigBuilder {
    /// The application directory holding all database files.
    app_directory: PathBuf,

    /// See [`Config::sync_mode`].
    sync_mode: Option<SyncMode>,

    /// See [`Config::map_size`].
    map_size: Option<usize>,

    /// See [`Config::max_readers`].
    max_readers: Option<u32>,
}

impl ConfigBuilder {
    /// Create a new [`ConfigBuilder`] rooted at the given application directory.
    ///
    /// The directory is created on first use if it does not exist.
    pub const fn new(app_directory: PathBuf) -> Self {
        Self {
            app_directory,
            sync_mode: None,
            map_size: None,
            max_readers: None,
        }
    }

    /// Build into a [`Config`], using defaults for unset options.
    pub fn build(self) -> Config {
        Config {
            app_directory: self.app_directory,
            sync_mode: self.sync_mode.unwrap_or_default(),
            map_size: self.map_size.unwrap_or(DEFAULT_MAP_SIZE),
            max_readers: self.max_readers.unwrap_or(DEFAULT_MAX_READERS),
        }
    }

    /// Set a custom [`SyncMode`].
    #[must_use]
    pub const fn sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = Some(sync_mode);
        self
    }

    /// Set a custom memory-map size, in bytes.
    #[must_use]
    pub const fn map_size(mut self, map_size: usize) -> Self {
        self.map_size = Some(map_size);
        self
    }

    /// Set a custom reader-slot count.
    #[must_use]
    pub const fn max_readers(mut self, max_readers: u32) -> Self {
        self.max_readers = Some(max_readers);
        self
    }
}

//---------------------------------------------------------------------------------------------------- Config
/// Database [`Env`](crate::Env) configuration.
///
/// This is the struct passed to [`Env::new`](crate::Env::new) that
/// allows the database to be configured in various ways.
///
/// The main constructor is the [`ConfigBuilder`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// The application directory.
    ///
    /// Holds the environment's data/lock files plus the
    /// optional seed files the stores read at startup.
    pub app_directory: PathBuf,

    /// The durability mode.
    pub sync_mode: SyncMode,

    /// The size of the environment's memory map, in bytes.
    pub map_size: usize,

    /// The maximum number of simultaneous reading threads.
    pub max_readers: u32,
}

impl Config {
    /// Create a [`Config`] with sane defaults for the given application directory.
    pub const fn new(app_directory: PathBuf) -> Self {
        Self {
            app_directory,
            sync_mode: SyncMode::Safe,
            map_size: DEFAULT_MAP_SIZE,
            max_readers: DEFAULT_MAX_READERS,
        }
    }

    /// The path of the environment's data file.
    pub fn data_file(&self) -> PathBuf {
        self.app_directory.join(DATABASE_DATA_FILENAME)
    }

    /// The path of a seed/auxiliary file inside the application directory.
    pub fn app_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.app_directory.join(name)
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_defaults_match_config_new() {
        let dir = PathBuf::from("/tmp/ferrate-test");
        let built = ConfigBuilder::new(dir.clone()).build();
        assert_eq!(built, Config::new(dir));
    }
}
