//! General constants used throughout `ferrate-store`.

//---------------------------------------------------------------------------------------------------- Files
/// The transaction/block index file.
pub const TX_INDEX_FILE: &str = "blkindex.dat";

/// The peer address book file.
pub const ADDRESS_FILE: &str = "addr.dat";

/// The wallet file.
pub const WALLET_FILE: &str = "wallet.dat";

/// The (legacy) review store file.
pub const REVIEW_FILE: &str = "reviews.dat";

/// The (legacy) market store file.
pub const MARKET_FILE: &str = "market.dat";

/// Optional plain-text peer seed file, one address per line.
///
/// Parsed permissively at startup; malformed lines are skipped.
pub const ADDRESS_SEED_FILE: &str = "addr.txt";

//---------------------------------------------------------------------------------------------------- Chain
/// The genesis block hash, in the internal (little-endian) byte order.
pub const GENESIS_BLOCK_HASH: [u8; 32] = [
    0x6f, 0xe2, 0x8c, 0x0a, 0xb6, 0xf1, 0xb3, 0x72, //
    0xc1, 0xa6, 0xa2, 0x46, 0xae, 0x63, 0xf7, 0x4f, //
    0x93, 0x1e, 0x83, 0x65, 0xe1, 0x5a, 0x08, 0x9c, //
    0x68, 0xd6, 0x19, 0x00, 0x00, 0x00, 0x00, 0x00, //
];

/// Service bit advertised by full network nodes.
pub(crate) const NODE_NETWORK: u64 = 1;

/// Default peer port for seed-file lines that do not carry one.
pub(crate) const DEFAULT_PEER_PORT: u16 = 8333;

/// Version byte prefixed to a public-key hash when
/// rendering it as a base58check address string.
pub(crate) const ADDRESS_VERSION_BYTE: u8 = 0;
