//! General constants used throughout `ferrate-database`.

//---------------------------------------------------------------------------------------------------- Versioning
/// The schema version written into every freshly created database file.
///
/// Written as the `"version"` record the first time a file is created,
/// and never migrated beyond a straight integer comparison.
pub const DATABASE_VERSION: i32 = 105;

//---------------------------------------------------------------------------------------------------- Filenames
/// The environment's data filename.
///
/// All named database files share this single LMDB data file,
/// living inside the application directory.
pub const DATABASE_DATA_FILENAME: &str = "data.mdb";

/// The environment's lock filename.
pub const DATABASE_LOCK_FILENAME: &str = "lock.mdb";

//---------------------------------------------------------------------------------------------------- Limits
/// Maximum amount of named database files inside one environment.
///
/// We know at compile time how many files the node uses (5);
/// the headroom is for tests and future record families.
pub(crate) const MAX_NAMED_DATABASES: u32 = 32;

/// Default LMDB reader-slot count.
///
/// LMDB's own default is 126; there is no reason to deviate
/// until a machine with more reader threads than that shows up.
pub(crate) const DEFAULT_MAX_READERS: u32 = 126;

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {}
