//! Utilities for `ferrate-store` testing.
//!
//! These types/fn's are only:
//! - enabled on `#[cfg(test)]`
//! - only used internally

//---------------------------------------------------------------------------------------------------- Import
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::Path,
    sync::Arc,
};

use ferrate_database::{
    config::{Config, ConfigBuilder},
    Env,
};

use crate::{
    external::{BlockFileReader, KeyGenerator},
    state::NodeState,
    types::{DiskTxPos, KeyPair, Transaction},
};

//---------------------------------------------------------------------------------------------------- Config
/// A small-map [`Config`] rooted at `directory`.
pub(crate) fn test_config(directory: &Path) -> Config {
    ConfigBuilder::new(directory.to_owned())
        .map_size(64 * 1024 * 1024)
        .build()
}

/// An environment + empty node state in a temporary directory.
pub(crate) fn tmp_node() -> (Arc<Env>, NodeState, tempfile::TempDir) {
    let tempdir = tempfile::tempdir().unwrap();
    let env = Arc::new(Env::new(test_config(tempdir.path())));
    (env, NodeState::new(false), tempdir)
}

//---------------------------------------------------------------------------------------------------- StubBlockFiles
/// A [`BlockFileReader`] over an in-memory position → body map.
#[derive(Default)]
pub(crate) struct StubBlockFiles {
    /// The "block files".
    map: HashMap<DiskTxPos, Transaction>,
}

impl StubBlockFiles {
    /// A stub preloaded with the given bodies.
    pub(crate) fn with(entries: &[(DiskTxPos, Transaction)]) -> Self {
        Self {
            map: entries.iter().cloned().collect(),
        }
    }

    /// Add one body at `pos`.
    pub(crate) fn insert(&mut self, pos: DiskTxPos, tx: Transaction) {
        self.map.insert(pos, tx);
    }
}

impl BlockFileReader for StubBlockFiles {
    fn read_transaction(&self, pos: DiskTxPos) -> std::io::Result<Transaction> {
        self.map.get(&pos).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no transaction at {pos:?}"),
            )
        })
    }
}

//---------------------------------------------------------------------------------------------------- StubKeyGen
/// A deterministic [`KeyGenerator`] that remembers what it minted.
#[derive(Default)]
pub(crate) struct StubKeyGen {
    /// How many keys have been handed out.
    counter: Cell<u8>,
    /// The most recently minted pair.
    last: RefCell<Option<KeyPair>>,
}

impl StubKeyGen {
    /// How many keys this stub has minted.
    pub(crate) fn minted(&self) -> u8 {
        self.counter.get()
    }

    /// The most recently minted pair, if any.
    pub(crate) fn last_key(&self) -> Option<KeyPair> {
        self.last.borrow().clone()
    }
}

impl KeyGenerator for StubKeyGen {
    fn make_new_key(&self) -> KeyPair {
        let n = self.counter.get() + 1;
        self.counter.set(n);

        let pair = KeyPair {
            pub_key: vec![n; 65],
            priv_key: vec![n ^ 0xFF; 32],
        };
        *self.last.borrow_mut() = Some(pair.clone());
        pair
    }
}
