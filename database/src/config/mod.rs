//! Database environment configuration.
//!
//! This module contains the main [`Config`]uration struct
//! for the database [`Env`](crate::Env)ironment, accessed
//! through the [`ConfigBuilder`].
//!
//! # Example
//! ```rust
//! use ferrate_database::config::{ConfigBuilder, SyncMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tmp_dir = tempfile::tempdir()?;
//!
//! let config = ConfigBuilder::new(tmp_dir.path().to_owned())
//!     .sync_mode(SyncMode::Fast)
//!     .build();
//!
//! assert_eq!(config.sync_mode, SyncMode::Fast);
//! # Ok(()) }
//! ```

mod config;
pub use config::{Config, ConfigBuilder};

mod sync_mode;
pub use sync_mode::SyncMode;
