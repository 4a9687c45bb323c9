//! Database file handles; `Database`.

//---------------------------------------------------------------------------------------------------- Import
use std::{collections::BTreeMap, mem, sync::Arc};

use heed::types::Bytes;
use zeroize::{Zeroize, Zeroizing};

use crate::{
    config::SyncMode,
    constants::DATABASE_VERSION,
    cursor::Cursor,
    env::Env,
    error::{DbResult, InitError, RuntimeError},
    serial::{self, Decodable, Encodable},
};

//---------------------------------------------------------------------------------------------------- Types
/// The concrete engine table type.
///
/// Every named database file is a plain byte → byte B-tree;
/// typing lives in [`serial`] and the record stores above us.
pub(crate) type HeedDb = heed::Database<Bytes, Bytes>;

//---------------------------------------------------------------------------------------------------- TxnLevel
/// One level of the nested transaction stack.
///
/// A level is a write-set layered over its parent (or over the engine
/// for the root): `Some(bytes)` is a pending write, `None` a pending
/// erase. Committing a child folds its writes into the parent;
/// committing the root applies the whole set in one atomic engine
/// transaction. Aborting a level just drops it.
#[derive(Default)]
struct TxnLevel {
    /// Pending writes, ordered by encoded key.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl TxnLevel {
    /// Record a pending write (`Some`) or erase (`None`).
    ///
    /// Replaced values — and the redundant key copy when the slot
    /// already exists — are wiped, not just dropped.
    fn stash(&mut self, mut key: Vec<u8>, value: Option<Vec<u8>>) {
        if let Some(slot) = self.writes.get_mut(&key) {
            key.zeroize();
            if let Some(mut replaced) = mem::replace(slot, value) {
                replaced.zeroize();
            }
        } else {
            self.writes.insert(key, value);
        }
    }

    /// Wipe every buffered key and value.
    fn wipe(&mut self) {
        for (mut key, value) in mem::take(&mut self.writes) {
            key.zeroize();
            if let Some(mut value) = value {
                value.zeroize();
            }
        }
    }
}

impl Drop for TxnLevel {
    // Private keys transit these buffers; they never
    // outlive the level un-wiped.
    fn drop(&mut self) {
        self.wipe();
    }
}

//---------------------------------------------------------------------------------------------------- Database
/// A live binding to one named database file inside an [`Env`].
///
/// Handles are transient: constructed wherever record access is
/// needed, and closed (dropped) as soon as the caller is done.
/// Construction registers the file in the environment's use counts,
/// destruction releases it — on every exit path, including errors
/// thrown during construction itself.
///
/// # Mode
/// The `mode` string follows the classic letters:
/// `'c'` create-if-missing, `'w'` writable, `'+'` read-write;
/// anything else is read-only. Writes outside a transaction are
/// committed individually (auto-commit).
///
/// # Transactions
/// [`Database::txn_begin`] pushes a child of the current innermost
/// transaction; reads and writes always target the top of the stack.
/// The stack is strictly nested: a child commits or aborts before its
/// parent. Closing a handle with transactions outstanding aborts them
/// all, root first.
///
/// # Threading
/// A handle is owned by one thread at a time; concurrency comes from
/// opening multiple handles, which the engine isolates per-page.
pub struct Database {
    /// The shared environment, kept for use-count bookkeeping.
    env: Arc<Env>,

    /// Our clone of the engine environment.
    ///
    /// Keeps the engine alive for as long as this handle exists,
    /// even across an [`Env::flush`] shutdown.
    engine: heed::Env,

    /// The engine table of the bound file.
    db: HeedDb,

    /// The named database file this handle is bound to.
    file: &'static str,

    /// Whether writes are rejected on this handle.
    read_only: bool,

    /// The nested transaction stack; the last element is the
    /// innermost transaction and the target of all operations.
    txn_stack: Vec<TxnLevel>,

    /// Set once the handle has been closed.
    closed: bool,
}

impl Database {
    //------------------------------------------------ Construction
    /// Open a handle to `file` inside `env`.
    ///
    /// Ensures the environment itself is open first (the environment
    /// opens lazily, on the first handle). On a newly created file
    /// the `"version"` record is written immediately.
    ///
    /// # Errors
    /// - [`InitError::EnvOpen`] if the environment cannot open
    /// - [`InitError::MissingFile`] if `file` does not exist and
    ///   `mode` has no `'c'`
    /// - [`InitError::DbOpen`] for any other engine refusal
    pub fn open(
        env: &Arc<Env>,
        file: &'static str,
        mode: &str,
        transactional: bool,
    ) -> Result<Self, InitError> {
        let create = mode.contains('c');
        let read_only = !create && !mode.contains('+') && !mode.contains('w');
        // `transactional` only matters for engines that refuse
        // non-transactional operations; ours always auto-commits.
        let _ = transactional;

        let engine = env.ensure_open()?;
        env.register_use(file);

        let db = match Self::open_main_tree(&engine, file, create) {
            Ok(db) => db,
            Err(error) => {
                // The constructor failed; give the use count back
                // before surfacing, nobody else will.
                env.release_use(file);
                return Err(error);
            }
        };

        let mut handle = Self {
            env: Arc::clone(env),
            engine,
            db,
            file,
            read_only,
            txn_stack: Vec::new(),
            closed: false,
        };

        // From here on `handle`'s Drop releases the use count.
        if create {
            handle.stamp_version().map_err(InitError::Version)?;
        }

        Ok(handle)
    }

    /// Open (or create) the `"main"` B-tree of `file`.
    fn open_main_tree(
        engine: &heed::Env,
        file: &'static str,
        create: bool,
    ) -> Result<HeedDb, InitError> {
        let db_open = |source| InitError::DbOpen { file, source };

        if create {
            let mut tx_rw = engine.write_txn().map_err(db_open)?;
            let db = engine
                .create_database::<Bytes, Bytes>(&mut tx_rw, Some(file))
                .map_err(db_open)?;
            tx_rw.commit().map_err(db_open)?;
            Ok(db)
        } else {
            let tx_ro = engine.read_txn().map_err(db_open)?;
            engine
                .open_database::<Bytes, Bytes>(&tx_ro, Some(file))
                .map_err(db_open)?
                .ok_or(InitError::MissingFile { file })
        }
    }

    /// Write the `"version"` record if the file does not carry one yet.
    fn stamp_version(&mut self) -> DbResult<()> {
        if !self.exists("version")? {
            self.write("version", &DATABASE_VERSION, true)?;
        }
        Ok(())
    }

    //------------------------------------------------ Accessors
    /// The named database file this handle is bound to.
    pub const fn file(&self) -> &'static str {
        self.file
    }

    /// The environment this handle lives in.
    pub const fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Read the file's schema version record.
    pub fn read_version(&self) -> DbResult<Option<i32>> {
        self.read("version")
    }

    /// Overwrite the file's schema version record.
    pub fn write_version(&mut self, version: i32) -> DbResult<()> {
        self.write("version", &version, true)
    }

    //------------------------------------------------ Point operations
    /// Read the value stored under `key`.
    ///
    /// Returns [`None`], without error, when the key is absent.
    /// The transient value buffer is wiped before release.
    ///
    /// # Errors
    /// Engine errors, or [`RuntimeError::Decode`] if the stored
    /// bytes do not decode as a `V`.
    pub fn read<K, V>(&self, key: &K) -> DbResult<Option<V>>
    where
        K: Encodable + ?Sized,
        V: Decodable,
    {
        let key_bytes = Zeroizing::new(serial::serialize(key));

        // Pending writes in the innermost transactions win.
        for level in self.txn_stack.iter().rev() {
            if let Some(entry) = level.writes.get(key_bytes.as_slice()) {
                return match entry {
                    Some(bytes) => {
                        let value = Zeroizing::new(bytes.clone());
                        Ok(Some(serial::deserialize(&value)?))
                    }
                    None => Ok(None),
                };
            }
        }

        let tx_ro = self.engine.read_txn()?;
        match self.db.get(&tx_ro, key_bytes.as_slice())? {
            Some(bytes) => {
                // Copy out of the engine's pages, decode, wipe.
                let value = Zeroizing::new(bytes.to_vec());
                Ok(Some(serial::deserialize(&value)?))
            }
            None => Ok(None),
        }
    }

    /// Write `value` under `key`.
    ///
    /// With `overwrite` unset, a colliding key fails with
    /// [`RuntimeError::KeyExists`] and leaves the stored value intact.
    /// Both transient buffers are wiped after the call.
    ///
    /// # Errors
    /// [`RuntimeError::ReadOnly`] on a read-only handle,
    /// [`RuntimeError::KeyExists`] as above, or engine errors.
    pub fn write<K, V>(&mut self, key: &K, value: &V, overwrite: bool) -> DbResult<()>
    where
        K: Encodable + ?Sized,
        V: Encodable + ?Sized,
    {
        if self.read_only {
            return Err(RuntimeError::ReadOnly);
        }
        if !overwrite && self.exists(key)? {
            return Err(RuntimeError::KeyExists);
        }

        let key_bytes = serial::serialize(key);
        let value_bytes = serial::serialize(value);

        if let Some(level) = self.txn_stack.last_mut() {
            // Buffers move into the level; wiped when it resolves.
            level.stash(key_bytes, Some(value_bytes));
            return Ok(());
        }

        let key_bytes = Zeroizing::new(key_bytes);
        let value_bytes = Zeroizing::new(value_bytes);
        let mut tx_rw = self.engine.write_txn()?;
        self.db
            .put(&mut tx_rw, key_bytes.as_slice(), value_bytes.as_slice())?;
        tx_rw.commit()?;
        Ok(())
    }

    /// Delete the record under `key`.
    ///
    /// Both deletion and "was not there" count as success.
    ///
    /// # Errors
    /// [`RuntimeError::ReadOnly`] on a read-only handle, or engine errors.
    pub fn erase<K>(&mut self, key: &K) -> DbResult<()>
    where
        K: Encodable + ?Sized,
    {
        if self.read_only {
            return Err(RuntimeError::ReadOnly);
        }

        let key_bytes = serial::serialize(key);

        if let Some(level) = self.txn_stack.last_mut() {
            level.stash(key_bytes, None);
            return Ok(());
        }

        let key_bytes = Zeroizing::new(key_bytes);
        let mut tx_rw = self.engine.write_txn()?;
        self.db.delete(&mut tx_rw, key_bytes.as_slice())?;
        tx_rw.commit()?;
        Ok(())
    }

    /// Probe for `key` without materializing its value.
    ///
    /// # Errors
    /// Engine errors only; absence is `Ok(false)`.
    pub fn exists<K>(&self, key: &K) -> DbResult<bool>
    where
        K: Encodable + ?Sized,
    {
        let key_bytes = Zeroizing::new(serial::serialize(key));

        for level in self.txn_stack.iter().rev() {
            if let Some(entry) = level.writes.get(key_bytes.as_slice()) {
                return Ok(entry.is_some());
            }
        }

        let tx_ro = self.engine.read_txn()?;
        Ok(self.db.get(&tx_ro, key_bytes.as_slice())?.is_some())
    }

    //------------------------------------------------ Cursors
    /// Open a cursor over this file, bound to no transaction.
    ///
    /// The cursor sees the committed state as of this call; pending
    /// writes on the transaction stack are not visible to it.
    ///
    /// # Errors
    /// Engine errors when the read snapshot cannot be created.
    pub fn cursor(&self) -> DbResult<Cursor<'_>> {
        Cursor::new(&self.engine, self.db)
    }

    //------------------------------------------------ Transactions
    /// Begin a transaction as a child of the current innermost one
    /// (or as the root if the stack is empty).
    ///
    /// # Errors
    /// [`RuntimeError::ReadOnly`] on a read-only handle.
    pub fn txn_begin(&mut self) -> DbResult<()> {
        if self.read_only {
            return Err(RuntimeError::ReadOnly);
        }
        self.txn_stack.push(TxnLevel::default());
        Ok(())
    }

    /// Commit the innermost transaction.
    ///
    /// A child's writes fold into its parent; the root's writes are
    /// applied to the engine in one atomic transaction.
    ///
    /// # Errors
    /// [`RuntimeError::NoTransaction`] with an empty stack,
    /// or engine errors from the root commit.
    pub fn txn_commit(&mut self) -> DbResult<()> {
        let Some(mut level) = self.txn_stack.pop() else {
            return Err(RuntimeError::NoTransaction);
        };

        if let Some(parent) = self.txn_stack.last_mut() {
            for (key, value) in mem::take(&mut level.writes) {
                parent.stash(key, value);
            }
            return Ok(());
        }

        self.apply(level)
    }

    /// Abort the innermost transaction, discarding its writes.
    ///
    /// # Errors
    /// [`RuntimeError::NoTransaction`] with an empty stack.
    pub fn txn_abort(&mut self) -> DbResult<()> {
        match self.txn_stack.pop() {
            Some(_level) => Ok(()), // wiped on drop
            None => Err(RuntimeError::NoTransaction),
        }
    }

    /// Apply a root-level write-set to the engine, atomically.
    fn apply(&self, mut level: TxnLevel) -> DbResult<()> {
        if level.writes.is_empty() {
            return Ok(());
        }

        let mut tx_rw = self.engine.write_txn()?;
        for (key, value) in &level.writes {
            match value {
                Some(bytes) => self.db.put(&mut tx_rw, key, bytes)?,
                None => {
                    self.db.delete(&mut tx_rw, key)?;
                }
            }
        }
        tx_rw.commit()?;

        level.wipe();
        Ok(())
    }

    //------------------------------------------------ Destruction
    /// Close the handle.
    ///
    /// Equivalent to dropping it; provided so call sites can
    /// make the release point explicit.
    pub fn close(self) {}

    /// The real close path, shared with `Drop`.
    fn close_inner(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !self.txn_stack.is_empty() {
            tracing::debug!(
                file = self.file,
                depth = self.txn_stack.len(),
                "aborting outstanding transactions on close",
            );
            self.txn_stack.clear();
        }

        // Checkpoint so log growth stays bounded even when many
        // short-lived handles come and go. `Fast` defers to `flush`.
        if matches!(self.env.config().sync_mode, SyncMode::Safe) {
            if let Err(e) = self.engine.force_sync() {
                tracing::warn!(file = self.file, "checkpoint on close failed: {e}");
            }
        }

        self.env.release_use(self.file);
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close_inner();
    }
}
