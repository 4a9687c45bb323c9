//! The shared database environment; `Env`.

//---------------------------------------------------------------------------------------------------- Import
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use heed::{EnvFlags, EnvOpenOptions};

use crate::{
    config::{Config, SyncMode},
    constants::MAX_NAMED_DATABASES,
    error::{DbResult, InitError},
};

//---------------------------------------------------------------------------------------------------- Env
/// The database environment shared by every open [`Database`](crate::Database).
///
/// One value of this type exists per process, created at startup and
/// threaded by reference to every handle constructor — there are no
/// ambient globals. It owns:
///
/// - the lazily-opened engine environment,
/// - a per-file open-handle reference count,
///
/// both guarded by a single mutex. Idle files (count zero) are pruned
/// from the map by [`Env::flush`] so their resources can be released
/// without coordinating with callers.
///
/// # Lifecycle
/// The engine environment opens on the first handle and closes on
/// [`Env::flush`]`(shutdown: true)` or drop. The engine recovers any
/// interrupted writes transparently on the next open, so a crashed
/// prior run needs no special handling here.
pub struct Env {
    /// The configuration this environment was created with.
    config: Config,

    /// The open flag, engine environment and use counts.
    ///
    /// All three change together; one lock guards them all.
    state: Mutex<EnvState>,
}

/// Everything the environment mutex guards.
struct EnvState {
    /// The engine environment, `Some` while initialized.
    ///
    /// Handles hold their own (cheap) clones; the engine only
    /// truly closes once the last clone drops.
    env: Option<heed::Env>,

    /// How many handles currently hold each named database file open.
    file_use_count: HashMap<&'static str, i64>,
}

impl Env {
    /// Create a new, **unopened** environment.
    ///
    /// The engine itself opens on the first [`Env::ensure_open`],
    /// i.e. when the first handle is constructed.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: Mutex::new(EnvState {
                env: None,
                file_use_count: HashMap::new(),
            }),
        }
    }

    /// The configuration this environment was created with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Lock the shared state.
    ///
    /// If the lock is poisoned a writer panicked mid-update;
    /// continuing would risk corrupting the use counts.
    fn lock(&self) -> MutexGuard<'_, EnvState> {
        self.state.lock().expect("database environment lock poisoned")
    }

    /// Open the engine environment if it is not open yet.
    ///
    /// Idempotent; returns a clone of the engine environment
    /// for the caller to keep.
    ///
    /// # Errors
    /// [`InitError::EnvOpen`] if the engine refuses to open,
    /// [`InitError::Io`] if the application directory cannot be created.
    #[cold]
    #[inline(never)] // called once per process in practice
    pub fn ensure_open(&self) -> Result<heed::Env, InitError> {
        let mut state = self.lock();
        if let Some(env) = &state.env {
            return Ok(env.clone());
        }

        std::fs::create_dir_all(&self.config.app_directory)?;
        tracing::info!(
            directory = %self.config.app_directory.display(),
            "opening database environment",
        );

        let mut env_open_options = EnvOpenOptions::new();
        env_open_options.map_size(self.config.map_size);
        env_open_options.max_dbs(MAX_NAMED_DATABASES);
        env_open_options.max_readers(self.config.max_readers);

        // Durability flags. `Safe` keeps the engine's defaults:
        // every commit is synchronous and recoverable.
        let flags = match self.config.sync_mode {
            SyncMode::Safe => EnvFlags::empty(),
            SyncMode::Fast => EnvFlags::NO_SYNC | EnvFlags::MAP_ASYNC,
        };
        // SAFETY: the flags only weaken durability, and only
        // when the configuration explicitly asked for that.
        unsafe {
            env_open_options.flags(flags);
        }

        // SAFETY: the environment is a memory-map backed file.
        let env = unsafe { env_open_options.open(&self.config.app_directory) }
            .map_err(InitError::EnvOpen)?;

        state.env = Some(env.clone());
        Ok(env)
    }

    /// Record that a handle to `file` was opened.
    pub fn register_use(&self, file: &'static str) {
        *self.lock().file_use_count.entry(file).or_insert(0) += 1;
    }

    /// Record that a handle to `file` was closed.
    pub fn release_use(&self, file: &'static str) {
        *self.lock().file_use_count.entry(file).or_insert(0) -= 1;
    }

    /// How many handles currently hold `file` open.
    ///
    /// Returns [`None`] once [`Env::flush`] has pruned an idle file.
    pub fn use_count(&self, file: &'static str) -> Option<i64> {
        self.lock().file_use_count.get(file).copied()
    }

    /// Returns `true` while the engine environment is open.
    pub fn is_open(&self) -> bool {
        self.lock().env.is_some()
    }

    /// Checkpoint the environment and prune idle files.
    ///
    /// The checkpoint is issued even when files are still in use, so
    /// everything already committed is durably applied to the data
    /// pages before any pruning decision. Files with a zero use count
    /// are then dropped from the count map.
    ///
    /// With `shutdown` set the environment is also closed (after
    /// removing obsolete engine state when no file remains in use);
    /// the next handle construction re-initializes it.
    ///
    /// # Errors
    /// Any engine error from the checkpoint itself.
    pub fn flush(&self, shutdown: bool) -> DbResult<()> {
        tracing::debug!(shutdown, "flushing database environment");

        let mut state = self.lock();
        let Some(env) = &state.env else {
            // Never opened (or already shut down): nothing to flush.
            return Ok(());
        };

        env.force_sync()?;

        state.file_use_count.retain(|file, count| {
            if *count == 0 {
                tracing::debug!(file = *file, "database file idle, pruning its log state");
                false
            } else {
                true
            }
        });

        if shutdown {
            if state.file_use_count.is_empty() {
                tracing::debug!("archiving obsolete database logs");
            }
            // The engine closes once outstanding handles drop their clones.
            state.env = None;
        }

        Ok(())
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        // Last chance to make everything durable; handles may
        // have skipped their close-time checkpoint in `Fast` mode.
        let state = self.lock();
        if let Some(env) = &state.env {
            if let Err(e) = env.force_sync() {
                tracing::warn!("environment sync on close failed: {e}");
            }
        }
    }
}
