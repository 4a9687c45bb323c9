//! Database durability mode; `SyncMode`.

//---------------------------------------------------------------------------------------------------- SyncMode
/// When/how the environment syncs its data to disk.
///
/// This maps onto the engine's durability flags:
/// [`Safe`](SyncMode::Safe) keeps every commit synchronous, while
/// [`Fast`](SyncMode::Fast) lets the OS write pages back lazily and
/// only guarantees durability at explicit flush points.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SyncMode {
    /// Fully sync to disk on every commit and on handle close.
    ///
    /// This is the slowest, but crash-safest option.
    #[default]
    Safe,

    /// Asynchronously sync; only flush at explicit
    /// [`Env::flush`](crate::Env::flush) points and shutdown.
    Fast,
}
