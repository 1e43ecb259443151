use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::warn;
use zbus::names::BusName;

use crate::{
    error::{Error, Result},
    watcher::{
        flags::NameWatcherFlags,
        registry::{register, unregister, WatcherId},
        watcher::{AppearedHandler, VanishedHandler, Watcher, WatcherSlot},
    },
};

/// Which bus [`watch_name`] connects to. [`watch_name_on_connection`] skips this question
/// entirely by taking an existing connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusType {
    Session,
    System,
}

/// Watches for a well-known name to have an owner, connecting to `bus_type` to do so.
///
/// Returns as soon as the watch is registered; the connection itself, and the initial ownership
/// check, happen in the background on the caller's current runtime. `appeared` and `vanished`
/// are called at most once per transition and never twice in a row for the same transition (if
/// the name's owner changes from one unique name straight to another, only `appeared` fires, not
/// `vanished` then `appeared`).
///
/// Must be called from within a Tokio runtime.
pub fn watch_name(
    bus_type: BusType,
    name: &str,
    flags: NameWatcherFlags,
    appeared: impl Fn(&zbus::Connection, &str, &str) + Send + Sync + 'static,
    vanished: impl Fn(Option<&zbus::Connection>, &str) + Send + Sync + 'static,
) -> Result<WatcherId> {
    let owned_name: zbus::names::OwnedBusName = BusName::try_from(name)
        .map_err(|_| Error::InvalidBusName(name.to_string()))?
        .into();

    let slot = WatcherSlot::new();
    let id = register(slot.clone());

    let appeared: Arc<AppearedHandler> = Arc::new(appeared);
    let vanished: Arc<VanishedHandler> = Arc::new(vanished);
    let name = name.to_string();

    Handle::current().spawn(async move {
        let connection = match bus_type {
            BusType::Session => zbus::Connection::session().await,
            BusType::System => zbus::Connection::system().await,
        };

        match connection {
            Ok(connection) => {
                let watcher = Watcher::spawn(connection, owned_name, flags, appeared, vanished);
                slot.install(watcher);
            }
            Err(e) => {
                warn!("watch_name(`{name}`): failed to connect: {e}");
                // No connection was ever obtained, so there's nothing for a `Watcher` to drive;
                // deliver the caller's one guaranteed notification directly.
                vanished(None, &name);
                slot.cancel();
            }
        }
    });

    Ok(id)
}

/// Watches for a well-known name to have an owner, on an already-established connection.
pub fn watch_name_on_connection(
    connection: &zbus::Connection,
    name: &str,
    flags: NameWatcherFlags,
    appeared: impl Fn(&zbus::Connection, &str, &str) + Send + Sync + 'static,
    vanished: impl Fn(Option<&zbus::Connection>, &str) + Send + Sync + 'static,
) -> Result<WatcherId> {
    let owned_name: zbus::names::OwnedBusName = BusName::try_from(name)
        .map_err(|_| Error::InvalidBusName(name.to_string()))?
        .into();

    let watcher = Watcher::spawn(
        connection.clone(),
        owned_name,
        flags,
        Arc::new(appeared),
        Arc::new(vanished),
    );

    let slot = WatcherSlot::new();
    slot.install(watcher);

    Ok(register(slot))
}

/// Stops watching. Idempotent, and safe to call even while the watch's initial connection is
/// still being established.
pub fn unwatch_name(id: WatcherId) {
    if let Some(slot) = unregister(id) {
        slot.cancel();
    }
}
