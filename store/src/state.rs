//! The node's in-memory indices; `NodeState`.
//!
//! Everything here is rebuilt from disk by the loaders at startup and
//! mutated through the stores afterwards. The state is one explicit
//! value threaded by reference — no ambient globals.
//!
//! # Lock order
//! Each table carries its own mutex. Whenever two are taken together,
//! the order is fixed:
//!
//! 1. [`NodeState::irc_addresses`] before [`NodeState::addresses`]
//! 2. [`NodeState::keys`] before [`NodeState::wallet`]
//!
//! The loaders follow this order; so must every caller.

//---------------------------------------------------------------------------------------------------- Import
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use crate::types::{Address, BlockHash, KeyPair, PubKeyHash, TxHash, WalletTx};

//---------------------------------------------------------------------------------------------------- NodeId
/// A stable handle to one node of the [`BlockIndex`] graph.
///
/// Nodes live in an arena and reference their neighbors by these
/// handles; nothing ever owns a node through its prev/next links.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

//---------------------------------------------------------------------------------------------------- BlockNode
/// One in-memory node of the block-index graph.
#[derive(Clone, Debug, Default)]
pub struct BlockNode {
    /// Hash identifying the block.
    pub hash: BlockHash,
    /// Block file its body lives in.
    pub file: u32,
    /// Offset of the body inside that file.
    pub block_pos: u32,
    /// Height of the block.
    pub height: i32,
    /// Block format version.
    pub version: i32,
    /// Merkle root over the block's transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp.
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
    /// The previous block, if known.
    pub prev: Option<NodeId>,
    /// The next block on the best chain, if known.
    pub next: Option<NodeId>,
}

//---------------------------------------------------------------------------------------------------- BlockIndex
/// The block-index graph: hash → node, doubly linked by prev/next.
///
/// Loading happens in unspecified disk order, so looking up a
/// neighbor may require synthesizing a placeholder node first;
/// [`BlockIndex::obtain`] is that obtain-or-insert primitive. The
/// placeholder's scalar fields are filled in when (if) its own record
/// arrives.
#[derive(Debug, Default)]
pub struct BlockIndex {
    /// The owning arena of nodes; [`NodeId`]s index into this.
    nodes: Vec<BlockNode>,
    /// Hash → node lookup over the arena.
    by_hash: HashMap<BlockHash, NodeId>,
    /// The genesis block, once its record has been seen.
    pub genesis: Option<NodeId>,
    /// Tip of the best chain.
    pub best: Option<NodeId>,
    /// Hash naming the best-chain tip.
    pub best_hash: Option<BlockHash>,
    /// Height of the best-chain tip, `-1` before any chain exists.
    pub best_height: i32,
}

impl BlockIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            best_height: -1,
            ..Self::default()
        }
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up the node for `hash`, if one exists.
    pub fn get(&self, hash: &BlockHash) -> Option<NodeId> {
        self.by_hash.get(hash).copied()
    }

    /// Borrow the node behind `id`.
    pub fn node(&self, id: NodeId) -> &BlockNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow the node behind `id`.
    pub fn node_mut(&mut self, id: NodeId) -> &mut BlockNode {
        &mut self.nodes[id.0]
    }

    /// Obtain-or-insert the node for `hash`.
    ///
    /// The zero hash is the "no neighbor" sentinel and maps to
    /// [`None`]; any other hash gets a (possibly placeholder) node.
    pub fn obtain(&mut self, hash: BlockHash) -> Option<NodeId> {
        if hash == [0; 32] {
            return None;
        }
        if let Some(id) = self.by_hash.get(&hash) {
            return Some(*id);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(BlockNode {
            hash,
            ..BlockNode::default()
        });
        self.by_hash.insert(hash, id);
        Some(id)
    }
}

//---------------------------------------------------------------------------------------------------- KeyTable
/// The wallet's owned keys.
#[derive(Debug, Default)]
pub struct KeyTable {
    /// Private key bytes, by public key.
    pub keys: HashMap<Vec<u8>, Vec<u8>>,
    /// Public key, by its 160-bit hash.
    pub pub_keys: HashMap<PubKeyHash, Vec<u8>>,
    /// The active user key, once resolved or generated.
    pub user_key: Option<KeyPair>,
}

//---------------------------------------------------------------------------------------------------- WalletState
/// Wallet settings persisted under the `"setting"` records.
#[derive(Clone, Debug, Default)]
pub struct WalletSettings {
    /// Whether block generation is switched on.
    pub generate_coins: bool,
    /// Fee attached to outgoing transactions, in base units.
    pub transaction_fee: i64,
    /// The address this node advertises for incoming connections.
    pub incoming_address: Address,
}

/// The wallet's transaction and naming state.
#[derive(Debug, Default)]
pub struct WalletState {
    /// Human-readable names, by address string.
    pub address_book: BTreeMap<String, String>,
    /// Wallet transactions, by hash.
    pub transactions: HashMap<TxHash, WalletTx>,
    /// Persisted settings.
    pub settings: WalletSettings,
}

//---------------------------------------------------------------------------------------------------- NodeState
/// All collaborator state the storage layer populates and maintains.
pub struct NodeState {
    /// Whether this node runs without a transaction index
    /// (thin client). The index store refuses to open in that mode.
    pub client_only: bool,

    /// The block-index graph and best-chain cursor.
    pub block_index: Mutex<BlockIndex>,

    /// Peer addresses learned through IRC discovery.
    ///
    /// Lock order: before [`NodeState::addresses`].
    pub irc_addresses: Mutex<BTreeMap<Vec<u8>, Address>>,

    /// The general peer address table, keyed canonically.
    pub addresses: Mutex<BTreeMap<Vec<u8>, Address>>,

    /// The owned-key table.
    ///
    /// Lock order: before [`NodeState::wallet`].
    pub keys: Mutex<KeyTable>,

    /// The wallet tables and settings.
    pub wallet: Mutex<WalletState>,
}

impl NodeState {
    /// Create an empty state.
    pub fn new(client_only: bool) -> Self {
        Self {
            client_only,
            block_index: Mutex::new(BlockIndex::new()),
            irc_addresses: Mutex::new(BTreeMap::new()),
            addresses: Mutex::new(BTreeMap::new()),
            keys: Mutex::new(KeyTable::default()),
            wallet: Mutex::new(WalletState::default()),
        }
    }

    /// Lock a table, propagating panics from poisoned locks.
    pub(crate) fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().expect("node state lock poisoned")
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn obtain_tolerates_forward_references() {
        let mut index = BlockIndex::new();

        // Reference a node before its record arrives...
        let forward = index.obtain([2; 32]).unwrap();
        assert_eq!(index.node(forward).height, 0);
        assert_eq!(index.len(), 1);

        // ...then "arrive": same node, now filled in.
        let again = index.obtain([2; 32]).unwrap();
        assert_eq!(forward, again);
        index.node_mut(again).height = 42;
        assert_eq!(index.node(forward).height, 42);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn zero_hash_is_the_no_neighbor_sentinel() {
        let mut index = BlockIndex::new();
        assert_eq!(index.obtain([0; 32]), None);
        assert!(index.is_empty());
    }

    #[test]
    fn fresh_index_has_no_best_chain() {
        let index = BlockIndex::new();
        assert_eq!(index.best, None);
        assert_eq!(index.best_hash, None);
        assert_eq!(index.best_height, -1);
    }
}
