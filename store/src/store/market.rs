//! The legacy market store; `MarketStore`.

//---------------------------------------------------------------------------------------------------- Import
use std::sync::Arc;

use ferrate_database::{Database, DbResult, Env, InitError};

use crate::constants::MARKET_FILE;

//---------------------------------------------------------------------------------------------------- MarketStore
/// A handle façade over `market.dat`.
///
/// Also left over from the distributed-market experiment; no record
/// family is defined on it anymore, only the file's version stamp.
pub struct MarketStore {
    /// The bound handle.
    db: Database,
}

impl MarketStore {
    /// Open a handle to the market store.
    ///
    /// # Errors
    /// Any [`InitError`] from the underlying open.
    pub fn open(env: &Arc<Env>, mode: &str, transactional: bool) -> Result<Self, InitError> {
        Ok(Self {
            db: Database::open(env, MARKET_FILE, mode, transactional)?,
        })
    }

    /// The file's schema version, stamped at creation.
    pub fn version(&self) -> DbResult<Option<i32>> {
        self.db.read_version()
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use ferrate_database::DATABASE_VERSION;

    use crate::tests::tmp_node;

    use super::*;

    #[test]
    fn market_file_is_created_and_stamped() {
        let (env, _state, _tempdir) = tmp_node();

        let market_db = MarketStore::open(&env, "cr+", false).unwrap();
        assert_eq!(market_db.version().unwrap(), Some(DATABASE_VERSION));
    }
}
