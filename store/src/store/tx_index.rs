//! The transaction/block index store; `TxIndexStore`.

//---------------------------------------------------------------------------------------------------- Import
use std::sync::Arc;

use ferrate_database::{
    serial::{self, Decodable, Reader},
    Database, DbResult, Env, InitError, RuntimeError, SeekFlag,
};

use crate::{
    constants::{GENESIS_BLOCK_HASH, TX_INDEX_FILE},
    error::{StoreError, StoreResult},
    external::BlockFileReader,
    state::NodeState,
    types::{BlockHash, DiskBlockIndex, DiskTxPos, OutPoint, PubKeyHash, Transaction, TxHash, TxIndexEntry},
};

//---------------------------------------------------------------------------------------------------- TxIndexStore
/// Typed access to `blkindex.dat`.
///
/// Families multiplexed into the file:
///
/// | Tag | Key suffix | Value |
/// |-----|------------|-------|
/// | `"tx"` | transaction hash | [`TxIndexEntry`] |
/// | `"blockindex"` | block hash | [`DiskBlockIndex`] |
/// | `"hashBestChain"` | — | block hash |
/// | `"owner"` | pub-key hash + [`DiskTxPos`] | height (`i32`) |
///
/// The index only exists on full nodes; [`TxIndexStore::open`]
/// asserts the node is not running in client mode.
pub struct TxIndexStore {
    /// The bound handle.
    db: Database,
}

impl TxIndexStore {
    /// Open a handle to the transaction index.
    ///
    /// # Panics
    /// If `state` says this node runs in client mode — there is
    /// no transaction index to open there.
    ///
    /// # Errors
    /// Any [`InitError`] from the underlying open.
    pub fn open(
        env: &Arc<Env>,
        state: &NodeState,
        mode: &str,
        transactional: bool,
    ) -> Result<Self, InitError> {
        assert!(
            !state.client_only,
            "the transaction index does not exist in client mode",
        );
        Ok(Self {
            db: Database::open(env, TX_INDEX_FILE, mode, transactional)?,
        })
    }

    //------------------------------------------------ Transaction index
    /// Read the index entry for `hash`.
    pub fn read_tx_index(&self, hash: TxHash) -> DbResult<Option<TxIndexEntry>> {
        self.db.read(&("tx", hash))
    }

    /// Overwrite the index entry for `hash`.
    pub fn update_tx_index(&mut self, hash: TxHash, entry: &TxIndexEntry) -> DbResult<()> {
        self.db.write(&("tx", hash), entry, true)
    }

    /// Index a freshly connected transaction at `pos`.
    pub fn add_tx_index(&mut self, tx: &Transaction, pos: DiskTxPos, _height: i32) -> DbResult<()> {
        #[allow(clippy::cast_possible_truncation)]
        let entry = TxIndexEntry {
            pos,
            n_outputs: tx.outputs.len() as u32,
        };
        self.db.write(&("tx", tx.hash()), &entry, true)
    }

    /// Drop the index entry of a disconnected transaction.
    pub fn erase_tx_index(&mut self, tx: &Transaction) -> DbResult<()> {
        self.db.erase(&("tx", tx.hash()))
    }

    /// Probe whether `hash` is indexed.
    pub fn contains_tx(&self, hash: TxHash) -> DbResult<bool> {
        self.db.exists(&("tx", hash))
    }

    /// Resolve `hash` through the index and read its body
    /// from the block files.
    ///
    /// Returns [`None`] when the transaction is not indexed.
    ///
    /// # Errors
    /// Database errors, or [`StoreError::BlockFile`] when the body
    /// cannot be read back.
    pub fn read_disk_tx(
        &self,
        block_reader: &impl BlockFileReader,
        hash: TxHash,
    ) -> StoreResult<Option<(Transaction, TxIndexEntry)>> {
        let Some(entry) = self.read_tx_index(hash)? else {
            return Ok(None);
        };
        let tx = block_reader
            .read_transaction(entry.pos)
            .map_err(StoreError::BlockFile)?;
        Ok(Some((tx, entry)))
    }

    /// [`TxIndexStore::read_disk_tx`], addressed by an outpoint.
    ///
    /// # Errors
    /// Same as [`TxIndexStore::read_disk_tx`].
    pub fn read_disk_tx_at(
        &self,
        block_reader: &impl BlockFileReader,
        outpoint: &OutPoint,
    ) -> StoreResult<Option<(Transaction, TxIndexEntry)>> {
        self.read_disk_tx(block_reader, outpoint.hash)
    }

    //------------------------------------------------ Owner index
    /// Record that the output at `pos`, connected at `height`,
    /// pays the key hashing to `owner`.
    pub fn add_owner_tx(
        &mut self,
        owner: PubKeyHash,
        pos: DiskTxPos,
        height: i32,
    ) -> DbResult<()> {
        self.db.write(&("owner", owner, pos), &height, true)
    }

    /// Collect the transactions paying `owner`, connected at or
    /// above `min_height`, in ascending position order.
    ///
    /// # Errors
    /// Database errors, decode errors, or [`StoreError::BlockFile`]
    /// when a body cannot be read back.
    pub fn read_owner_txes(
        &self,
        block_reader: &impl BlockFileReader,
        owner: PubKeyHash,
        min_height: i32,
    ) -> StoreResult<Vec<Transaction>> {
        let decode = |e| StoreError::decode(TX_INDEX_FILE, "owner", e);

        let mut txes = Vec::new();
        let mut cursor = self.db.cursor()?;
        let mut key = serial::serialize(&("owner", owner, DiskTxPos::ZERO));
        let mut value = Vec::new();
        let mut flag = SeekFlag::SetRange;

        loop {
            match cursor.read(&mut key, &mut value, flag) {
                Ok(()) => {}
                Err(RuntimeError::KeyNotFound) => break,
                Err(e) => return Err(e.into()),
            }
            flag = SeekFlag::Next;

            let mut key_reader = Reader::new(&key);
            let tag = String::decode_from(&mut key_reader).map_err(decode)?;
            if tag != "owner" {
                break;
            }
            let hash_item = PubKeyHash::decode_from(&mut key_reader).map_err(decode)?;
            if hash_item != owner {
                break;
            }
            let pos = DiskTxPos::decode_from(&mut key_reader).map_err(decode)?;

            let height: i32 = serial::deserialize(&value).map_err(decode)?;
            if height >= min_height {
                txes.push(
                    block_reader
                        .read_transaction(pos)
                        .map_err(StoreError::BlockFile)?,
                );
            }
        }

        Ok(txes)
    }

    //------------------------------------------------ Block index
    /// Write (or overwrite) a block-index record, keyed by its hash.
    pub fn write_block_index(&mut self, index: &DiskBlockIndex) -> DbResult<()> {
        self.db.write(&("blockindex", index.block_hash()), index, true)
    }

    /// Drop the block-index record for `hash`.
    pub fn erase_block_index(&mut self, hash: BlockHash) -> DbResult<()> {
        self.db.erase(&("blockindex", hash))
    }

    /// Read the hash naming the best-chain tip.
    pub fn read_hash_best_chain(&self) -> DbResult<Option<BlockHash>> {
        self.db.read("hashBestChain")
    }

    /// Point the best-chain record at `hash`.
    pub fn write_hash_best_chain(&mut self, hash: BlockHash) -> DbResult<()> {
        self.db.write("hashBestChain", &hash, true)
    }

    //------------------------------------------------ Loader
    /// Rebuild the in-memory block-index graph from disk.
    ///
    /// Records arrive in unspecified order, so neighbors are
    /// obtain-or-inserted as placeholders and filled in when their
    /// own record shows up. After the scan the best-chain record is
    /// resolved; a fresh database (no record, no genesis) is fine,
    /// anything else without a resolvable tip is corruption.
    ///
    /// # Errors
    /// Database errors, [`StoreError::Decode`] on a bad record, or
    /// [`StoreError::MissingBestChain`].
    pub fn load_block_index(&self, state: &NodeState) -> StoreResult<()> {
        let decode = |e| StoreError::decode(TX_INDEX_FILE, "blockindex", e);

        let mut index = state.lock(&state.block_index);

        {
            let mut cursor = self.db.cursor()?;
            let mut key = serial::serialize(&("blockindex", [0u8; 32]));
            let mut value = Vec::new();
            let mut flag = SeekFlag::SetRange;

            loop {
                match cursor.read(&mut key, &mut value, flag) {
                    Ok(()) => {}
                    Err(RuntimeError::KeyNotFound) => break,
                    Err(e) => return Err(e.into()),
                }
                flag = SeekFlag::Next;

                let mut key_reader = Reader::new(&key);
                let tag = String::decode_from(&mut key_reader).map_err(decode)?;
                if tag != "blockindex" {
                    break;
                }

                let disk: DiskBlockIndex = serial::deserialize(&value).map_err(decode)?;
                let hash = disk.block_hash();
                let Some(id) = index.obtain(hash) else {
                    continue;
                };
                let prev = index.obtain(disk.hash_prev);
                let next = index.obtain(disk.hash_next);

                let node = index.node_mut(id);
                node.file = disk.file;
                node.block_pos = disk.block_pos;
                node.height = disk.height;
                node.version = disk.version;
                node.merkle_root = disk.merkle_root;
                node.time = disk.time;
                node.bits = disk.bits;
                node.nonce = disk.nonce;
                node.prev = prev;
                node.next = next;

                if index.genesis.is_none() && hash == GENESIS_BLOCK_HASH {
                    index.genesis = Some(id);
                }
            }
        }

        let Some(best_hash) = self.read_hash_best_chain()? else {
            if index.genesis.is_none() {
                // Fresh database; nothing to point at yet.
                return Ok(());
            }
            return Err(StoreError::MissingBestChain);
        };

        let Some(best) = index.get(&best_hash) else {
            return Err(StoreError::MissingBestChain);
        };

        let best_height = index.node(best).height;
        index.best = Some(best);
        index.best_hash = Some(best_hash);
        index.best_height = best_height;

        tracing::info!(
            best = %hex::encode(&best_hash[..7]),
            height = best_height,
            "loaded block index",
        );
        Ok(())
    }
}
