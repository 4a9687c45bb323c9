//! The peer address store; `AddressStore`.

//---------------------------------------------------------------------------------------------------- Import
use std::{
    fs::File,
    io::{BufRead, BufReader},
    sync::Arc,
};

use ferrate_database::{
    serial::{self, Decodable, Reader},
    Database, DbResult, Env, InitError, RuntimeError, SeekFlag,
};

use crate::{
    constants::{ADDRESS_FILE, ADDRESS_SEED_FILE},
    error::{StoreError, StoreResult},
    state::NodeState,
    types::Address,
};

//---------------------------------------------------------------------------------------------------- AddressStore
/// Typed access to `addr.dat`: the `"addr"` record family,
/// keyed by the canonical 18-byte endpoint key.
pub struct AddressStore {
    /// The bound handle.
    db: Database,
}

impl AddressStore {
    /// Open a handle to the address book.
    ///
    /// # Errors
    /// Any [`InitError`] from the underlying open.
    pub fn open(env: &Arc<Env>, mode: &str, transactional: bool) -> Result<Self, InitError> {
        Ok(Self {
            db: Database::open(env, ADDRESS_FILE, mode, transactional)?,
        })
    }

    /// Persist one peer address.
    pub fn write_address(&mut self, addr: &Address) -> DbResult<()> {
        self.db.write(&("addr", addr.key()), addr, true)
    }

    //------------------------------------------------ Loader
    /// Rebuild the in-memory address tables from disk.
    ///
    /// Runs under both address locks, IRC table first — the same
    /// order peer discovery uses. Two sources feed the tables:
    ///
    /// 1. The optional plain-text seed file, parsed permissively;
    ///    every valid line lands in the IRC table, the general table
    ///    and (via [`AddressStore::write_address`]) the database.
    /// 2. The `"addr"` records already on disk, scanned into the
    ///    general table.
    ///
    /// # Errors
    /// Database errors, or [`StoreError::Decode`] on a bad record.
    pub fn load_addresses(&mut self, state: &NodeState) -> StoreResult<()> {
        let decode = |e| StoreError::decode(ADDRESS_FILE, "addr", e);

        let mut irc = state.lock(&state.irc_addresses);
        let mut general = state.lock(&state.addresses);

        // Seed file: user-provided bootstrap peers, one per line.
        let seed_path = self.db.env().config().app_file(ADDRESS_SEED_FILE);
        if let Ok(file) = File::open(&seed_path) {
            for line in BufReader::new(file).lines() {
                let Ok(line) = line else { break };
                let Some(addr) = Address::parse_line(&line) else {
                    continue;
                };
                if addr.is_null() {
                    continue;
                }
                general.insert(addr.key(), addr.clone());
                self.write_address(&addr)?;
                irc.insert(addr.key(), addr);
            }
        }

        // Everything already on disk.
        let mut cursor = self.db.cursor()?;
        let mut key = Vec::new();
        let mut value = Vec::new();

        loop {
            match cursor.read(&mut key, &mut value, SeekFlag::Next) {
                Ok(()) => {}
                Err(RuntimeError::KeyNotFound) => break,
                Err(e) => return Err(e.into()),
            }

            let mut key_reader = Reader::new(&key);
            let tag = String::decode_from(&mut key_reader).map_err(decode)?;
            if tag != "addr" {
                continue;
            }

            let addr: Address = serial::deserialize(&value).map_err(decode)?;
            general.insert(addr.key(), addr);
        }
        drop(cursor);

        tracing::debug!(count = general.len(), "loaded peer addresses");

        Ok(())
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::tests::tmp_node;

    use super::*;

    #[test]
    fn addresses_roundtrip_through_the_loader() {
        let (env, state, _tempdir) = tmp_node();
        let mut addrdb = AddressStore::open(&env, "cr+", false).unwrap();

        let one = Address::new([10, 0, 0, 1], 8333);
        let two = Address::new([10, 0, 0, 2], 8334);
        addrdb.write_address(&one).unwrap();
        addrdb.write_address(&two).unwrap();

        addrdb.load_addresses(&state).unwrap();

        let general = state.addresses.lock().unwrap();
        assert_eq!(general.len(), 2);
        assert_eq!(general.get(&one.key()), Some(&one));
        assert_eq!(general.get(&two.key()), Some(&two));
        // Nothing came from the (absent) seed file.
        assert!(state.irc_addresses.lock().unwrap().is_empty());
    }

    #[test]
    fn seed_file_feeds_both_tables_and_skips_bad_lines() {
        let (env, state, _tempdir) = tmp_node();
        let mut addrdb = AddressStore::open(&env, "cr+", false).unwrap();

        let seed_path = env.config().app_file(ADDRESS_SEED_FILE);
        std::fs::write(&seed_path, "1.2.3.4\nnot an address\n5.6.7.8:1234\n").unwrap();

        addrdb.load_addresses(&state).unwrap();

        let expect_one = Address::new([1, 2, 3, 4], 8333);
        let expect_two = Address::new([5, 6, 7, 8], 1234);

        {
            let irc = state.irc_addresses.lock().unwrap();
            let general = state.addresses.lock().unwrap();
            assert_eq!(irc.len(), 2);
            assert_eq!(general.len(), 2);
            assert!(irc.contains_key(&expect_one.key()));
            assert!(irc.contains_key(&expect_two.key()));
        }

        // The seed entries were persisted: a later write plus
        // reload sees all three.
        let third = Address::new([9, 9, 9, 9], 8333);
        addrdb.write_address(&third).unwrap();
        addrdb.load_addresses(&state).unwrap();

        // Re-seeded plus scanned; the table is keyed, so no duplicates.
        assert_eq!(state.addresses.lock().unwrap().len(), 3);
        assert!(state
            .addresses
            .lock()
            .unwrap()
            .contains_key(&third.key()));
    }
}
