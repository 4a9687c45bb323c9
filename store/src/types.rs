//! Record types stored by the [stores](crate::store) and their disk encodings.
//!
//! Every type here implements the [`Encodable`]/[`Decodable`] pair from
//! `ferrate-database`, so the encoding below *is* the on-disk format:
//! field order matters and is stable across versions.

//---------------------------------------------------------------------------------------------------- Import
use std::net::Ipv4Addr;

use zeroize::{Zeroize, ZeroizeOnDrop};

use ferrate_database::serial::{DecodeError, Decodable, Encodable, Reader};

use crate::{
    constants::{DEFAULT_PEER_PORT, NODE_NETWORK},
    crypto::hash256,
};

//---------------------------------------------------------------------------------------------------- Aliases
/// A block's hash.
pub type BlockHash = [u8; 32];

/// A transaction's hash.
pub type TxHash = [u8; 32];

/// The 160-bit hash of a public key.
pub type PubKeyHash = [u8; 20];

//---------------------------------------------------------------------------------------------------- DiskTxPos
/// Location of a transaction body inside the external block files.
///
/// The triple is `(file index, block offset, offset within block)`.
/// A file index of `u32::MAX` is the null sentinel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskTxPos {
    /// Index of the block file.
    pub file: u32,
    /// Byte offset of the containing block inside that file.
    pub block_pos: u32,
    /// Byte offset of the transaction inside the block.
    pub tx_pos: u32,
}

impl DiskTxPos {
    /// The all-zero position; used to seed owner scans.
    pub const ZERO: Self = Self {
        file: 0,
        block_pos: 0,
        tx_pos: 0,
    };

    /// Create a new position.
    pub const fn new(file: u32, block_pos: u32, tx_pos: u32) -> Self {
        Self {
            file,
            block_pos,
            tx_pos,
        }
    }

    /// Returns `true` for the null sentinel.
    pub const fn is_null(&self) -> bool {
        self.file == u32::MAX
    }
}

impl Encodable for DiskTxPos {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.file.encode_into(out);
        self.block_pos.encode_into(out);
        self.tx_pos.encode_into(out);
    }
}

impl Decodable for DiskTxPos {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            file: u32::decode_from(reader)?,
            block_pos: u32::decode_from(reader)?,
            tx_pos: u32::decode_from(reader)?,
        })
    }
}

//---------------------------------------------------------------------------------------------------- TxIndexEntry
/// A `"tx"` record in the transaction index: where a transaction's
/// body lives on disk, and how many outputs it has.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxIndexEntry {
    /// Position of the transaction body.
    pub pos: DiskTxPos,
    /// Number of outputs the transaction carries.
    pub n_outputs: u32,
}

impl Encodable for TxIndexEntry {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.pos.encode_into(out);
        self.n_outputs.encode_into(out);
    }
}

impl Decodable for TxIndexEntry {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            pos: DiskTxPos::decode_from(reader)?,
            n_outputs: u32::decode_from(reader)?,
        })
    }
}

//---------------------------------------------------------------------------------------------------- DiskBlockIndex
/// A `"blockindex"` record: one node of the block-index graph as it
/// lies on disk, with its neighbors referenced **by hash**.
///
/// The in-memory counterpart ([`BlockNode`](crate::BlockNode)) carries
/// resolved references instead; the loader bridges the two.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskBlockIndex {
    /// Hash of the previous block, zero for none.
    pub hash_prev: BlockHash,
    /// Hash of the next block on the best chain, zero for none.
    pub hash_next: BlockHash,
    /// Block file this block's body lives in.
    pub file: u32,
    /// Offset of the body inside that file.
    pub block_pos: u32,
    /// Height of this block.
    pub height: i32,

    // Header fields; these feed [`DiskBlockIndex::block_hash`].
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
}

impl DiskBlockIndex {
    /// The hash identifying this block.
    ///
    /// Computed over the 80-byte header; the prev/next links and the
    /// disk position deliberately do not participate.
    pub fn block_hash(&self) -> BlockHash {
        let mut header = Vec::with_capacity(80);
        self.version.encode_into(&mut header);
        self.hash_prev.encode_into(&mut header);
        self.merkle_root.encode_into(&mut header);
        self.time.encode_into(&mut header);
        self.bits.encode_into(&mut header);
        self.nonce.encode_into(&mut header);
        hash256(&header)
    }
}

impl Encodable for DiskBlockIndex {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.hash_prev.encode_into(out);
        self.hash_next.encode_into(out);
        self.file.encode_into(out);
        self.block_pos.encode_into(out);
        self.height.encode_into(out);
        self.version.encode_into(out);
        self.merkle_root.encode_into(out);
        self.time.encode_into(out);
        self.bits.encode_into(out);
        self.nonce.encode_into(out);
    }
}

impl Decodable for DiskBlockIndex {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            hash_prev: Decodable::decode_from(reader)?,
            hash_next: Decodable::decode_from(reader)?,
            file: u32::decode_from(reader)?,
            block_pos: u32::decode_from(reader)?,
            height: i32::decode_from(reader)?,
            version: i32::decode_from(reader)?,
            merkle_root: Decodable::decode_from(reader)?,
            time: u32::decode_from(reader)?,
            bits: u32::decode_from(reader)?,
            nonce: u32::decode_from(reader)?,
        })
    }
}

//---------------------------------------------------------------------------------------------------- Address
/// A peer endpoint plus bookkeeping, as stored under `"addr"`.
///
/// The canonical key is the 18-byte concatenation of the reserved
/// prefix, the IP and the (big-endian) port — the service bits do not
/// identify a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Service bits advertised by the peer.
    pub services: u64,
    /// Reserved address-family prefix (IPv4-mapped).
    pub reserved: [u8; 12],
    /// IPv4 address, network byte order.
    pub ip: [u8; 4],
    /// TCP port, host byte order (encoded big-endian).
    pub port: u16,
}

impl Default for Address {
    fn default() -> Self {
        Self {
            services: NODE_NETWORK,
            reserved: Self::RESERVED_V4,
            ip: [0; 4],
            port: DEFAULT_PEER_PORT,
        }
    }
}

impl Address {
    /// The IPv4-mapped prefix every stored address carries today.
    const RESERVED_V4: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF];

    /// Create an address from IP octets and a port.
    pub fn new(ip: [u8; 4], port: u16) -> Self {
        Self {
            ip,
            port,
            ..Self::default()
        }
    }

    /// The canonical 18-byte database/map key for this endpoint.
    pub fn key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(18);
        key.extend_from_slice(&self.reserved);
        key.extend_from_slice(&self.ip);
        key.extend_from_slice(&self.port.to_be_bytes());
        key
    }

    /// Returns `true` when no IP is set.
    pub const fn is_null(&self) -> bool {
        matches!(self.ip, [0, 0, 0, 0])
    }

    /// Parse one line of the peer seed file: `ip` or `ip:port`.
    ///
    /// Returns [`None`] for anything that does not parse; seed files
    /// are read permissively and bad lines are simply skipped.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (ip_str, port) = match line.split_once(':') {
            Some((ip_str, port_str)) => (ip_str, port_str.parse::<u16>().ok()?),
            None => (line, DEFAULT_PEER_PORT),
        };

        let ip: Ipv4Addr = ip_str.parse().ok()?;
        Some(Self::new(ip.octets(), port))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.ip;
        write!(f, "{a}.{b}.{c}.{d}:{}", self.port)
    }
}

impl Encodable for Address {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.services.encode_into(out);
        self.reserved.encode_into(out);
        self.ip.encode_into(out);
        out.extend_from_slice(&self.port.to_be_bytes());
    }
}

impl Decodable for Address {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            services: u64::decode_from(reader)?,
            reserved: Decodable::decode_from(reader)?,
            ip: Decodable::decode_from(reader)?,
            port: u16::from_be_bytes(reader.take_array()?),
        })
    }
}

//---------------------------------------------------------------------------------------------------- Transaction
/// Reference to an output of a previous transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutPoint {
    /// Hash of the transaction being spent.
    pub hash: TxHash,
    /// Index of the output inside it.
    pub index: u32,
}

/// One transaction input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxIn {
    /// The output being spent.
    pub prev_out: OutPoint,
    /// Unlocking script.
    pub script_sig: Vec<u8>,
    /// Input sequence number.
    pub sequence: u32,
}

/// One transaction output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxOut {
    /// Amount, in base units.
    pub value: i64,
    /// Locking script.
    pub script_pub_key: Vec<u8>,
}

/// A transaction, in the shape its body is serialized.
///
/// Bodies normally live in the external block files; this type shows
/// up here because the wallet stores its own transactions whole, and
/// because the identifying hash is recomputed from it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    /// Transaction format version.
    pub version: i32,
    /// Inputs.
    pub inputs: Vec<TxIn>,
    /// Outputs.
    pub outputs: Vec<TxOut>,
    /// Earliest time/block the transaction may be included.
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }
}

impl Transaction {
    /// The double-SHA256 hash identifying this transaction.
    pub fn hash(&self) -> TxHash {
        hash256(&ferrate_database::serial::serialize(self))
    }
}

impl Encodable for OutPoint {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.hash.encode_into(out);
        self.index.encode_into(out);
    }
}

impl Decodable for OutPoint {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            hash: Decodable::decode_from(reader)?,
            index: u32::decode_from(reader)?,
        })
    }
}

impl Encodable for TxIn {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.prev_out.encode_into(out);
        self.script_sig.encode_into(out);
        self.sequence.encode_into(out);
    }
}

impl Decodable for TxIn {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            prev_out: OutPoint::decode_from(reader)?,
            script_sig: Decodable::decode_from(reader)?,
            sequence: u32::decode_from(reader)?,
        })
    }
}

impl Encodable for TxOut {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.value.encode_into(out);
        self.script_pub_key.encode_into(out);
    }
}

impl Decodable for TxOut {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            value: i64::decode_from(reader)?,
            script_pub_key: Decodable::decode_from(reader)?,
        })
    }
}

impl Encodable for Transaction {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.version.encode_into(out);
        self.inputs.encode_into(out);
        self.outputs.encode_into(out);
        self.lock_time.encode_into(out);
    }
}

impl Decodable for Transaction {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            version: i32::decode_from(reader)?,
            inputs: Decodable::decode_from(reader)?,
            outputs: Decodable::decode_from(reader)?,
            lock_time: u32::decode_from(reader)?,
        })
    }
}

//---------------------------------------------------------------------------------------------------- WalletTx
/// A transaction the wallet knows about, with local metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalletTx {
    /// The transaction itself.
    pub tx: Transaction,
    /// When this node first saw it.
    pub time_received: u32,
    /// Whether this node originated it.
    pub from_me: bool,
    /// Whether its outputs have been spent.
    pub spent: bool,
}

impl WalletTx {
    /// The hash of the wrapped transaction.
    ///
    /// The wallet keys its records by this; the loader recomputes it
    /// to spot corrupt records.
    pub fn hash(&self) -> TxHash {
        self.tx.hash()
    }
}

impl Encodable for WalletTx {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.tx.encode_into(out);
        self.time_received.encode_into(out);
        self.from_me.encode_into(out);
        self.spent.encode_into(out);
    }
}

impl Decodable for WalletTx {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            tx: Transaction::decode_from(reader)?,
            time_received: u32::decode_from(reader)?,
            from_me: bool::decode_from(reader)?,
            spent: bool::decode_from(reader)?,
        })
    }
}

//---------------------------------------------------------------------------------------------------- KeyPair
/// A public/private key pair owned by the wallet.
///
/// The private half is wiped when the pair is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// The public key bytes.
    #[zeroize(skip)]
    pub pub_key: Vec<u8>,
    /// The private key bytes.
    pub priv_key: Vec<u8>,
}

impl std::fmt::Debug for KeyPair {
    // The private half stays out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("pub_key", &hex::encode(&self.pub_key))
            .field("priv_key", &"<wiped>")
            .finish()
    }
}

//---------------------------------------------------------------------------------------------------- User / Review
/// A `"user"` record in the legacy review store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    /// Record format version.
    pub version: i32,
    /// The user's public key.
    pub pub_key: Vec<u8>,
}

impl Encodable for User {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.version.encode_into(out);
        self.pub_key.encode_into(out);
    }
}

impl Decodable for User {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            version: i32::decode_from(reader)?,
            pub_key: Decodable::decode_from(reader)?,
        })
    }
}

/// One entry of a `"reviews"` record in the legacy review store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Review {
    /// Record format version.
    pub version: i32,
    /// When the review was written.
    pub time: u32,
    /// Star rating.
    pub stars: i32,
    /// Free-form review text.
    pub text: String,
    /// Public key of the reviewer.
    pub from_pub_key: Vec<u8>,
    /// Signature over the review by that key.
    pub signature: Vec<u8>,
}

impl Encodable for Review {
    fn encode_into(&self, out: &mut Vec<u8>) {
        self.version.encode_into(out);
        self.time.encode_into(out);
        self.stars.encode_into(out);
        self.text.encode_into(out);
        self.from_pub_key.encode_into(out);
        self.signature.encode_into(out);
    }
}

impl Decodable for Review {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            version: i32::decode_from(reader)?,
            time: u32::decode_from(reader)?,
            stars: i32::decode_from(reader)?,
            text: String::decode_from(reader)?,
            from_pub_key: Decodable::decode_from(reader)?,
            signature: Decodable::decode_from(reader)?,
        })
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use ferrate_database::serial::{deserialize, serialize};

    use super::*;

    #[test]
    fn disk_tx_pos_orders_like_its_encoding() {
        // Scan bounds rely on the encoded bytes ordering the same way
        // as the struct, for the small values positions actually take.
        let positions = [
            DiskTxPos::new(0, 0, 0),
            DiskTxPos::new(0, 0, 9),
            DiskTxPos::new(0, 5, 0),
            DiskTxPos::new(2, 0, 0),
        ];
        for pair in positions.windows(2) {
            assert!(serialize(&pair[0]) < serialize(&pair[1]));
        }
    }

    #[test]
    fn records_roundtrip() {
        let entry = TxIndexEntry {
            pos: DiskTxPos::new(3, 1000, 42),
            n_outputs: 2,
        };
        assert_eq!(deserialize::<TxIndexEntry>(&serialize(&entry)).unwrap(), entry);

        let addr = Address::new([10, 0, 0, 1], 8333);
        assert_eq!(deserialize::<Address>(&serialize(&addr)).unwrap(), addr);

        let wtx = WalletTx {
            tx: Transaction {
                version: 1,
                inputs: vec![TxIn {
                    prev_out: OutPoint {
                        hash: [1; 32],
                        index: 0,
                    },
                    script_sig: vec![0x51],
                    sequence: u32::MAX,
                }],
                outputs: vec![TxOut {
                    value: 5_000_000_000,
                    script_pub_key: vec![0xAC],
                }],
                lock_time: 0,
            },
            time_received: 1_231_006_505,
            from_me: true,
            spent: false,
        };
        assert_eq!(deserialize::<WalletTx>(&serialize(&wtx)).unwrap(), wtx);
    }

    #[test]
    fn block_hash_ignores_links_and_position() {
        let mut index = DiskBlockIndex {
            height: 5,
            time: 1_231_006_505,
            bits: 0x1D00_FFFF,
            nonce: 2_083_236_893,
            ..Default::default()
        };
        let hash = index.block_hash();

        // Re-linking the node on disk must not change its identity.
        index.hash_next = [9; 32];
        index.file = 7;
        index.block_pos = 12345;
        assert_eq!(index.block_hash(), hash);

        // Touching a header field must.
        index.nonce += 1;
        assert_ne!(index.block_hash(), hash);
    }

    #[test]
    fn address_key_is_18_bytes() {
        let addr = Address::new([192, 168, 0, 1], 8333);
        let key = addr.key();
        assert_eq!(key.len(), 18);
        // Prefix, IP, big-endian port.
        assert_eq!(&key[10..12], &[0xFF, 0xFF]);
        assert_eq!(&key[12..16], &[192, 168, 0, 1]);
        assert_eq!(&key[16..18], &8333u16.to_be_bytes());
    }

    #[test]
    fn seed_lines_parse_permissively() {
        let addr = Address::parse_line("1.2.3.4").unwrap();
        assert_eq!(addr.ip, [1, 2, 3, 4]);
        assert_eq!(addr.port, DEFAULT_PEER_PORT);

        let addr = Address::parse_line(" 5.6.7.8:1234 ").unwrap();
        assert_eq!(addr.ip, [5, 6, 7, 8]);
        assert_eq!(addr.port, 1234);

        assert!(Address::parse_line("").is_none());
        assert!(Address::parse_line("not-an-address").is_none());
        assert!(Address::parse_line("1.2.3.4:notaport").is_none());

        // A zero IP parses but is null, and callers skip it.
        assert!(Address::parse_line("0.0.0.0").unwrap().is_null());
    }
}
