//! Ordered cursors; `Cursor` & `SeekFlag`.

//---------------------------------------------------------------------------------------------------- Import
use std::ops::Bound;

use zeroize::Zeroize;

use crate::{
    database::HeedDb,
    error::{DbResult, RuntimeError},
};

//---------------------------------------------------------------------------------------------------- SeekFlag
/// How [`Cursor::read`] positions the cursor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeekFlag {
    /// Step to the record after the current position
    /// (the first record if the cursor is fresh).
    Next,

    /// Position at exactly the given key.
    Set,

    /// Position at the first record whose key is ≥ the given key.
    ///
    /// This is the seek that starts every record-family scan:
    /// seeded with `(tag, zeroed suffix)` it lands on the first
    /// record of that family.
    SetRange,

    /// Position at the given key, requiring the stored
    /// value to equal the given value.
    GetBoth,

    /// Position at the given key, requiring the stored
    /// value to be ≥ the given value.
    GetBothRange,
}

//---------------------------------------------------------------------------------------------------- Cursor
/// An ordered cursor over one database file.
///
/// Bound to no transaction: it reads a consistent snapshot of the
/// committed state taken when the cursor was opened. Keys come back
/// in lexicographic order of their encoded bytes.
pub struct Cursor<'a> {
    /// The engine table being iterated.
    db: HeedDb,

    /// The read snapshot backing this cursor.
    tx_ro: heed::RoTxn<'a>,

    /// Encoded key of the record the cursor currently sits on.
    position: Option<Vec<u8>>,
}

impl<'a> Cursor<'a> {
    /// Open a cursor; called through [`Database::cursor`](crate::Database::cursor).
    pub(crate) fn new(engine: &'a heed::Env, db: HeedDb) -> DbResult<Self> {
        Ok(Self {
            db,
            tx_ro: engine.read_txn()?,
            position: None,
        })
    }

    /// Step or seek the cursor, replacing `key` and `value` with
    /// decoded copies of the record it lands on.
    ///
    /// For [`Set`](SeekFlag::Set)/[`SetRange`](SeekFlag::SetRange) the
    /// input `key` is the seek target; for the `GetBoth` flags the
    /// input `value` participates too. The previous contents of both
    /// buffers are wiped before being replaced.
    ///
    /// # Errors
    /// [`RuntimeError::KeyNotFound`] is the soft "no (more) records"
    /// result; scans terminate on it. Anything else is a hard error.
    pub fn read(
        &mut self,
        key: &mut Vec<u8>,
        value: &mut Vec<u8>,
        flag: SeekFlag,
    ) -> DbResult<()> {
        /// Copy an engine record out of its page.
        fn owned((key, value): (&[u8], &[u8])) -> (Vec<u8>, Vec<u8>) {
            (key.to_vec(), value.to_vec())
        }

        let record: Option<(Vec<u8>, Vec<u8>)> = match flag {
            SeekFlag::Next => match &self.position {
                None => self.db.first(&self.tx_ro)?.map(owned),
                Some(current) => {
                    let after: (Bound<&[u8]>, Bound<&[u8]>) =
                        (Bound::Excluded(current.as_slice()), Bound::Unbounded);
                    self.db
                        .range(&self.tx_ro, &after)?
                        .next()
                        .transpose()?
                        .map(owned)
                }
            },

            SeekFlag::Set => self
                .db
                .get(&self.tx_ro, key.as_slice())?
                .map(|stored| (key.clone(), stored.to_vec())),

            SeekFlag::SetRange => {
                let from: (Bound<&[u8]>, Bound<&[u8]>) =
                    (Bound::Included(key.as_slice()), Bound::Unbounded);
                self.db
                    .range(&self.tx_ro, &from)?
                    .next()
                    .transpose()?
                    .map(owned)
            }

            // Without sorted duplicates a key has one value, so the
            // "range" variant only relaxes equality into ordering.
            SeekFlag::GetBoth => self
                .db
                .get(&self.tx_ro, key.as_slice())?
                .filter(|stored| *stored == value.as_slice())
                .map(|stored| (key.clone(), stored.to_vec())),

            SeekFlag::GetBothRange => self
                .db
                .get(&self.tx_ro, key.as_slice())?
                .filter(|stored| *stored >= value.as_slice())
                .map(|stored| (key.clone(), stored.to_vec())),
        };

        let Some((found_key, found_value)) = record else {
            return Err(RuntimeError::KeyNotFound);
        };

        self.position = Some(found_key.clone());

        key.zeroize();
        value.zeroize();
        *key = found_key;
        *value = found_value;
        Ok(())
    }
}
