//! The wallet store; `WalletStore`.

//---------------------------------------------------------------------------------------------------- Import
use std::sync::Arc;

use ferrate_database::{
    serial::{Decodable, Encodable, Reader},
    Database, DbResult, Env, InitError, RuntimeError, SeekFlag,
};
use zeroize::Zeroizing;

use crate::{
    constants::WALLET_FILE,
    crypto::hash160,
    error::StoreResult,
    state::NodeState,
    types::{TxHash, WalletTx},
};

//---------------------------------------------------------------------------------------------------- WalletStore
/// Typed access to `wallet.dat`.
///
/// Families multiplexed into the file:
///
/// | Tag | Key suffix | Value |
/// |-----|------------|-------|
/// | `"name"` | address string | human-readable name |
/// | `"tx"` | transaction hash | [`WalletTx`] |
/// | `"key"` | public key bytes | private key bytes |
/// | `"defaultkey"` | — | public key bytes |
/// | `"setting"` | setting name | typed value |
///
/// Private keys flow through here; every transient buffer on the
/// handle's read/write path is wiped, and `"key"` records are
/// append-only (writes refuse to overwrite).
pub struct WalletStore {
    /// The bound handle.
    db: Database,
}

impl WalletStore {
    /// Open a handle to the wallet.
    ///
    /// # Errors
    /// Any [`InitError`] from the underlying open.
    pub fn open(env: &Arc<Env>, mode: &str, transactional: bool) -> Result<Self, InitError> {
        Ok(Self {
            db: Database::open(env, WALLET_FILE, mode, transactional)?,
        })
    }

    //------------------------------------------------ Address book
    /// Read the name recorded for `address`.
    pub fn read_name(&self, address: &str) -> DbResult<Option<String>> {
        self.db.read(&("name", address))
    }

    /// Name (or rename) `address`.
    pub fn write_name(&mut self, address: &str, name: &str) -> DbResult<()> {
        self.db.write(&("name", address), name, true)
    }

    /// Drop the name record for `address`.
    pub fn erase_name(&mut self, address: &str) -> DbResult<()> {
        self.db.erase(&("name", address))
    }

    //------------------------------------------------ Wallet transactions
    /// Read the wallet transaction stored under `hash`.
    pub fn read_tx(&self, hash: TxHash) -> DbResult<Option<WalletTx>> {
        self.db.read(&("tx", hash))
    }

    /// Store a wallet transaction under `hash`.
    pub fn write_tx(&mut self, hash: TxHash, wtx: &WalletTx) -> DbResult<()> {
        self.db.write(&("tx", hash), wtx, true)
    }

    /// Drop the wallet transaction stored under `hash`.
    pub fn erase_tx(&mut self, hash: TxHash) -> DbResult<()> {
        self.db.erase(&("tx", hash))
    }

    //------------------------------------------------ Keys
    /// Read the private key paired with `pub_key`.
    pub fn read_key(&self, pub_key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.db.read(&("key", pub_key))
    }

    /// Store a key pair. Keys are append-only: an existing record
    /// fails with [`RuntimeError::KeyExists`] rather than being
    /// overwritten.
    pub fn write_key(&mut self, pub_key: &[u8], priv_key: &[u8]) -> DbResult<()> {
        self.db.write(&("key", pub_key), priv_key, false)
    }

    /// Read the default public key, if one was recorded.
    pub fn read_default_key(&self) -> DbResult<Option<Vec<u8>>> {
        self.db.read("defaultkey")
    }

    /// Record `pub_key` as the default key.
    pub fn write_default_key(&mut self, pub_key: &[u8]) -> DbResult<()> {
        self.db.write("defaultkey", pub_key, true)
    }

    //------------------------------------------------ Settings
    /// Read the typed setting stored under `name`.
    pub fn read_setting<V: Decodable>(&self, name: &str) -> DbResult<Option<V>> {
        self.db.read(&("setting", name))
    }

    /// Store a typed setting under `name`.
    pub fn write_setting<V: Encodable + ?Sized>(&mut self, name: &str, value: &V) -> DbResult<()> {
        self.db.write(&("setting", name), value, true)
    }

    //------------------------------------------------ Loader
    /// Rebuild the in-memory wallet from disk.
    ///
    /// Runs under the key-table and wallet locks, in that order. One
    /// cursor pass dispatches every record by its discriminator;
    /// unknown tags and unknown settings are ignored silently.
    ///
    /// The wallet must load whenever at all possible, so a record
    /// that fails to decode is logged and skipped rather than
    /// aborting the load. The same goes for a `"tx"` record whose
    /// recomputed hash does not match its key: reported, then loaded.
    ///
    /// Returns the recorded default public key — empty when the
    /// record does not exist (a fresh wallet).
    ///
    /// # Errors
    /// Hard database errors only.
    pub fn load_wallet(&self, state: &NodeState) -> StoreResult<Vec<u8>> {
        let mut keys = state.lock(&state.keys);
        let mut wallet = state.lock(&state.wallet);
        let mut default_key = Vec::new();

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
            let Ok(tag) = String::decode_from(&mut key_reader) else {
                tracing::warn!("skipping wallet record with undecodable key");
                continue;
            };

            let parsed: Result<(), ferrate_database::serial::DecodeError> = (|| {
                match tag.as_str() {
                    // A named address-book entry.
                    "name" => {
                        let address = String::decode_from(&mut key_reader)?;
                        let name = String::decode_from(&mut Reader::new(&value))?;
                        wallet.address_book.insert(address, name);
                    }

                    // A transaction paying (or paid by) this wallet.
                    "tx" => {
                        let hash = TxHash::decode_from(&mut key_reader)?;
                        let wtx = WalletTx::decode_from(&mut Reader::new(&value))?;
                        if wtx.hash() != hash {
                            tracing::warn!(
                                hash = %hex::encode(&hash[..7]),
                                "wallet transaction record does not hash to its key",
                            );
                        }
                        wallet.transactions.insert(hash, wtx);
                    }

                    // A key pair this wallet owns.
                    "key" => {
                        let pub_key = Vec::<u8>::decode_from(&mut key_reader)?;
                        let priv_key =
                            Zeroizing::new(Vec::<u8>::decode_from(&mut Reader::new(&value))?);
                        keys.pub_keys.insert(hash160(&pub_key), pub_key.clone());
                        keys.keys.insert(pub_key, priv_key.to_vec());
                    }

                    // The key change gets sent back to.
                    "defaultkey" => {
                        default_key = Vec::<u8>::decode_from(&mut Reader::new(&value))?;
                    }

                    // Persisted settings, dispatched by name.
                    "setting" => {
                        let name = String::decode_from(&mut key_reader)?;
                        let mut value_reader = Reader::new(&value);
                        match name.as_str() {
                            "fGenerateBitcoins" => {
                                wallet.settings.generate_coins =
                                    Decodable::decode_from(&mut value_reader)?;
                            }
                            "nTransactionFee" => {
                                wallet.settings.transaction_fee =
                                    Decodable::decode_from(&mut value_reader)?;
                            }
                            "addrIncoming" => {
                                wallet.settings.incoming_address =
                                    Decodable::decode_from(&mut value_reader)?;
                            }
                            _ => {}
                        }
                    }

                    _ => {}
                }
                Ok(())
            })();

            if let Err(e) = parsed {
                tracing::warn!(%tag, "skipping undecodable wallet record: {e}");
            }
        }
        drop(cursor);

        tracing::debug!(
            generate_coins = wallet.settings.generate_coins,
            transaction_fee = wallet.settings.transaction_fee,
            incoming_address = %wallet.settings.incoming_address,
            transactions = wallet.transactions.len(),
            keys = keys.keys.len(),
            "loaded wallet",
        );

        Ok(default_key)
    }
}

//---------------------------------------------------------------------------------------------------- Free functions
/// Record a human-readable name for `address`, in memory and on disk.
///
/// # Errors
/// Any database error from the underlying write.
pub fn set_address_book_name(
    wallet_db: &mut WalletStore,
    state: &NodeState,
    address: &str,
    name: &str,
) -> DbResult<()> {
    state
        .lock(&state.wallet)
        .address_book
        .insert(address.to_owned(), name.to_owned());
    wallet_db.write_name(address, name)
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use ferrate_database::serial;

    use crate::{
        tests::tmp_node,
        types::{Address, Transaction, TxOut},
    };

    use super::*;

    #[test]
    fn typed_records_roundtrip() {
        let (env, _state, _tempdir) = tmp_node();
        let mut wallet_db = WalletStore::open(&env, "cr+", false).unwrap();

        // Names.
        wallet_db.write_name("1Addr", "alice").unwrap();
        assert_eq!(wallet_db.read_name("1Addr").unwrap().as_deref(), Some("alice"));
        wallet_db.erase_name("1Addr").unwrap();
        assert_eq!(wallet_db.read_name("1Addr").unwrap(), None);

        // Transactions.
        let wtx = WalletTx {
            tx: Transaction {
                outputs: vec![TxOut {
                    value: 50,
                    script_pub_key: vec![0xAC],
                }],
                ..Default::default()
            },
            time_received: 7,
            from_me: false,
            spent: false,
        };
        wallet_db.write_tx(wtx.hash(), &wtx).unwrap();
        assert_eq!(wallet_db.read_tx(wtx.hash()).unwrap(), Some(wtx.clone()));
        wallet_db.erase_tx(wtx.hash()).unwrap();
        assert_eq!(wallet_db.read_tx(wtx.hash()).unwrap(), None);

        // Default key + settings.
        wallet_db.write_default_key(&[4u8; 65]).unwrap();
        assert_eq!(wallet_db.read_default_key().unwrap(), Some(vec![4u8; 65]));

        wallet_db.write_setting("nTransactionFee", &100i64).unwrap();
        assert_eq!(
            wallet_db.read_setting::<i64>("nTransactionFee").unwrap(),
            Some(100)
        );
    }

    #[test]
    fn keys_are_append_only() {
        let (env, _state, _tempdir) = tmp_node();
        let mut wallet_db = WalletStore::open(&env, "cr+", false).unwrap();

        let pub_key = [2u8; 33];
        wallet_db.write_key(&pub_key, &[11u8; 32]).unwrap();

        assert!(matches!(
            wallet_db.write_key(&pub_key, &[99u8; 32]),
            Err(RuntimeError::KeyExists)
        ));
        assert_eq!(
            wallet_db.read_key(&pub_key).unwrap(),
            Some(vec![11u8; 32])
        );
    }

    #[test]
    fn load_wallet_rebuilds_every_table() {
        let (env, state, _tempdir) = tmp_node();
        let mut wallet_db = WalletStore::open(&env, "cr+", false).unwrap();

        let wtx = WalletTx {
            tx: Transaction::default(),
            time_received: 1,
            from_me: true,
            spent: false,
        };
        let pub_key = vec![3u8; 33];

        wallet_db.write_name("1Someone", "bob").unwrap();
        wallet_db.write_tx(wtx.hash(), &wtx).unwrap();
        wallet_db.write_key(&pub_key, &[7u8; 32]).unwrap();
        wallet_db.write_default_key(&pub_key).unwrap();
        wallet_db.write_setting("fGenerateBitcoins", &true).unwrap();
        wallet_db.write_setting("nTransactionFee", &250i64).unwrap();
        wallet_db
            .write_setting("addrIncoming", &Address::new([9, 8, 7, 6], 8333))
            .unwrap();
        // Unknown settings must be ignored, not fatal.
        wallet_db.write_setting("fUnknownKnob", &true).unwrap();

        let default_key = wallet_db.load_wallet(&state).unwrap();
        assert_eq!(default_key, pub_key);

        let keys = state.keys.lock().unwrap();
        let wallet = state.wallet.lock().unwrap();
        assert_eq!(wallet.address_book.get("1Someone").map(String::as_str), Some("bob"));
        assert_eq!(wallet.transactions.get(&wtx.hash()), Some(&wtx));
        assert_eq!(keys.keys.get(&pub_key), Some(&vec![7u8; 32]));
        assert_eq!(keys.pub_keys.get(&hash160(&pub_key)), Some(&pub_key));
        assert!(wallet.settings.generate_coins);
        assert_eq!(wallet.settings.transaction_fee, 250);
        assert_eq!(wallet.settings.incoming_address.ip, [9, 8, 7, 6]);
    }

    #[test]
    fn load_wallet_reports_hash_mismatch_but_loads_the_record() {
        let (env, state, _tempdir) = tmp_node();
        let mut wallet_db = WalletStore::open(&env, "cr+", false).unwrap();

        let wtx = WalletTx {
            tx: Transaction::default(),
            time_received: 3,
            from_me: false,
            spent: true,
        };
        // Filed under a key that is not the transaction's hash.
        let wrong_hash = [0xBA; 32];
        wallet_db.write_tx(wrong_hash, &wtx).unwrap();

        wallet_db.load_wallet(&state).unwrap();
        assert_eq!(
            state.wallet.lock().unwrap().transactions.get(&wrong_hash),
            Some(&wtx)
        );
    }

    #[test]
    fn load_wallet_skips_undecodable_records() {
        let (env, state, _tempdir) = tmp_node();
        let mut wallet_db = WalletStore::open(&env, "cr+", false).unwrap();

        // A "tx" record whose value is garbage.
        wallet_db
            .db
            .write(&("tx", [0x11u8; 32]), &vec![0xFFu8; 3], true)
            .unwrap();
        wallet_db.write_name("1Fine", "still loads").unwrap();

        wallet_db.load_wallet(&state).unwrap();

        let wallet = state.wallet.lock().unwrap();
        assert!(wallet.transactions.is_empty());
        assert_eq!(wallet.address_book.get("1Fine").map(String::as_str), Some("still loads"));
    }

    #[test]
    fn fresh_wallet_returns_an_empty_default_key() {
        let (env, state, _tempdir) = tmp_node();
        let wallet_db = WalletStore::open(&env, "cr", false).unwrap();
        assert_eq!(wallet_db.load_wallet(&state).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn wallet_tags_stay_prefix_free_when_encoded() {
        // Every recorded tag, across all files.
        let tags = [
            "tx", "blockindex", "hashBestChain", "owner", "version", "addr", "name", "key",
            "defaultkey", "setting", "user", "reviews",
        ];
        for a in tags {
            for b in tags {
                if a == b {
                    continue;
                }
                let ea = serial::serialize(a);
                let eb = serial::serialize(b);
                assert!(
                    !eb.starts_with(&ea),
                    "{a:?} prefixes {b:?} once encoded",
                );
            }
        }
    }
}
