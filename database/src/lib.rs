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
mod cursor;
mod database;
mod env;
mod error;

pub mod config;
pub mod serial;

pub use constants::{DATABASE_DATA_FILENAME, DATABASE_LOCK_FILENAME, DATABASE_VERSION};
pub use cursor::{Cursor, SeekFlag};
pub use database::Database;
pub use env::Env;
pub use error::{DbResult, InitError, RuntimeError};

//---------------------------------------------------------------------------------------------------- Private
#[cfg(test)]
pub(crate) mod tests;
