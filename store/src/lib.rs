#![doc = include_str!("../README.md")]
//---------------------------------------------------------------------------------------------------- Lints
#![forbid(
    unused_unsafe,
    redundant_semicolons,
    unused_allocation,
    while_true,
    unused_braces,
    unused_labels,
    keyword_idents,
    non_ascii_idents,
    unconditional_recursion,
    noop_method_call
)]
#![deny(unused_doc_comments, unused_mut, deprecated, nonstandard_style)]
// Allow some lints in tests.
#![cfg_attr(
    test,
    allow(
        clippy::cognitive_complexity,
        clippy::needless_pass_by_value,
        clippy::too_many_lines
    )
)]

//---------------------------------------------------------------------------------------------------- Public API
// Import private modules, export public types.
//
// Documentation for each module is located in the respective file.

mod constants;
mod error;
mod free;
mod state;
mod store;

pub mod crypto;
pub mod external;
pub mod types;

pub use constants::{
    ADDRESS_FILE, ADDRESS_SEED_FILE, GENESIS_BLOCK_HASH, MARKET_FILE, REVIEW_FILE, TX_INDEX_FILE,
    WALLET_FILE,
};
pub use error::{StoreError, StoreResult};
pub use ferrate_database;
pub use free::{load_wallet, open_node};
pub use state::{BlockIndex, BlockNode, KeyTable, NodeId, NodeState, WalletSettings, WalletState};
pub use store::{
    set_address_book_name, AddressStore, MarketStore, ReviewStore, TxIndexStore, WalletStore,
};

//---------------------------------------------------------------------------------------------------- Private
#[cfg(test)]
pub(crate) mod tests;
