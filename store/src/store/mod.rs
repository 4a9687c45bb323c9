//! The record-family stores.
//!
//! Each store is a thin typed façade over a
//! [`Database`](ferrate_database::Database) handle bound to one
//! file, plus the loader that rebuilds the in-memory state from it.

mod address;
mod market;
mod review;
mod tx_index;
mod wallet;

pub use address::AddressStore;
pub use market::MarketStore;
pub use review::ReviewStore;
pub use tx_index::TxIndexStore;
pub use wallet::{set_address_book_name, WalletStore};
