use std::{
    collections::HashMap,
    num::NonZeroU64,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
};

use parking_lot::Mutex;

use crate::watcher::watcher::WatcherSlot;

/// Identifies a live `watch_name` registration. Opaque; only meaningful as an argument to
/// [`crate::unwatch_name`].
///
/// Backed by a 64-bit counter: the original design this is modeled on used a 32-bit counter that
/// could in principle wrap during a long-running process with very high watch/unwatch churn.
/// 64 bits puts wraparound out of reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatcherId(NonZeroU64);

fn next_id() -> NonZeroU64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NonZeroU64::new(NEXT.fetch_add(1, Ordering::Relaxed)).expect("counter starts at 1 and only grows")
}

fn registry() -> &'static Mutex<HashMap<WatcherId, Arc<WatcherSlot>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<WatcherId, Arc<WatcherSlot>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(super) fn register(slot: Arc<WatcherSlot>) -> WatcherId {
    let id = WatcherId(next_id());
    registry().lock().insert(id, slot);
    id
}

/// Removes and returns the slot for `id`, if it's still registered. `unwatch_name` is
/// idempotent: calling it twice, or with an id that was never valid, is a no-op the second time.
pub(super) fn unregister(id: WatcherId) -> Option<Arc<WatcherSlot>> {
    registry().lock().remove(&id)
}
