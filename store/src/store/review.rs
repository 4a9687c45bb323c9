//! The legacy review store; `ReviewStore`.

//---------------------------------------------------------------------------------------------------- Import
use std::sync::Arc;

use ferrate_database::{Database, DbResult, Env, InitError};

use crate::{
    constants::REVIEW_FILE,
    types::{Review, TxHash, User},
};

//---------------------------------------------------------------------------------------------------- ReviewStore
/// Typed access to `reviews.dat`.
///
/// Left over from the distributed-market experiment; the `"user"` and
/// `"reviews"` families are still readable and writable, but nothing
/// rebuilds in-memory state from them.
pub struct ReviewStore {
    /// The bound handle.
    db: Database,
}

impl ReviewStore {
    /// Open a handle to the review store.
    ///
    /// # Errors
    /// Any [`InitError`] from the underlying open.
    pub fn open(env: &Arc<Env>, mode: &str, transactional: bool) -> Result<Self, InitError> {
        Ok(Self {
            db: Database::open(env, REVIEW_FILE, mode, transactional)?,
        })
    }

    /// Read the user record stored under `hash`.
    pub fn read_user(&self, hash: TxHash) -> DbResult<Option<User>> {
        self.db.read(&("user", hash))
    }

    /// Store a user record under `hash`.
    pub fn write_user(&mut self, hash: TxHash, user: &User) -> DbResult<()> {
        self.db.write(&("user", hash), user, true)
    }

    /// Read the reviews filed under `hash`; absent means none.
    pub fn read_reviews(&self, hash: TxHash) -> DbResult<Vec<Review>> {
        Ok(self.db.read(&("reviews", hash))?.unwrap_or_default())
    }

    /// Store the ordered review sequence under `hash`.
    pub fn write_reviews(&mut self, hash: TxHash, reviews: &[Review]) -> DbResult<()> {
        self.db.write(&("reviews", hash), reviews, true)
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::tests::tmp_node;

    use super::*;

    #[test]
    fn users_and_reviews_roundtrip() {
        let (env, _state, _tempdir) = tmp_node();
        let mut reviews_db = ReviewStore::open(&env, "cr+", false).unwrap();

        let subject = [0x42; 32];
        assert_eq!(reviews_db.read_user(subject).unwrap(), None);
        assert!(reviews_db.read_reviews(subject).unwrap().is_empty());

        let user = User {
            version: 1,
            pub_key: vec![4u8; 65],
        };
        reviews_db.write_user(subject, &user).unwrap();
        assert_eq!(reviews_db.read_user(subject).unwrap(), Some(user));

        let reviews = vec![
            Review {
                version: 1,
                time: 100,
                stars: 5,
                text: "prompt shipping".into(),
                from_pub_key: vec![2u8; 33],
                signature: vec![0u8; 70],
            },
            Review {
                version: 1,
                time: 200,
                stars: 2,
                text: "never arrived".into(),
                from_pub_key: vec![3u8; 33],
                signature: vec![1u8; 70],
            },
        ];
        reviews_db.write_reviews(subject, &reviews).unwrap();
        assert_eq!(reviews_db.read_reviews(subject).unwrap(), reviews);
    }
}
