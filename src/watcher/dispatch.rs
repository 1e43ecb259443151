use tokio::runtime::Handle;

/// Delivers `f` with the same affinity guarantee the original idle-source dispatch gave: if the
/// calling task is already driving `owner`, run `f` inline; otherwise schedule it onto `owner`
/// and return without waiting for it.
///
/// This only matters when a watcher's background task (always driven by `owner`) and a
/// notification triggered from elsewhere (e.g. a signal handled by a different task on the same
/// or a different runtime) could otherwise race on delivery order.
pub(super) fn deliver<F>(owner: &Handle, f: F)
where
    F: FnOnce() + Send + 'static,
{
    match Handle::try_current() {
        Ok(current) if current.id() == owner.id() => f(),
        _ => {
            owner.spawn(async move { f() });
        }
    }
}
