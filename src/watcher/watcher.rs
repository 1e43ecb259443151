use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{instrument, warn};
use zbus::{
    fdo::DBusProxy,
    names::{BusName, OwnedBusName, OwnedUniqueName},
};

use crate::watcher::{dispatch::deliver, flags::NameWatcherFlags};

pub type AppearedHandler = dyn Fn(&zbus::Connection, &str, &str) + Send + Sync + 'static;
pub type VanishedHandler = dyn Fn(Option<&zbus::Connection>, &str) + Send + Sync + 'static;

/// `StartServiceByName`'s numeric reply codes, per the D-Bus specification.
const START_SERVICE_REPLY_STARTED: u32 = 1;
const START_SERVICE_REPLY_ALREADY_RUNNING: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq)]
enum PreviousCall {
    None,
    Appeared,
    Vanished,
}

/// The alternation invariant in isolation: never report the same transition twice in a row.
/// Split out from [`Watcher`] so it can be exercised without a connection.
struct Alternator(Mutex<PreviousCall>);

impl Alternator {
    fn new() -> Self {
        Self(Mutex::new(PreviousCall::None))
    }

    /// Returns `true` if this is a genuine transition (the caller should deliver it).
    fn appeared(&self) -> bool {
        let mut previous = self.0.lock();
        if *previous == PreviousCall::Appeared {
            return false;
        }
        *previous = PreviousCall::Appeared;
        true
    }

    fn vanished(&self) -> bool {
        let mut previous = self.0.lock();
        if *previous == PreviousCall::Vanished {
            return false;
        }
        *previous = PreviousCall::Vanished;
        true
    }
}

/// One `watch_name` registration's live state.
///
/// Mirrors the original design's `Client`: it remembers only whether the *last* delivered
/// notification was an appearance or a vanishing, and refuses to deliver the same one twice in a
/// row (the alternation invariant). `cancelled` is checked by the connection-closed handler only
/// — `unwatch_name` itself never synthesizes a final `vanished` call.
pub(crate) struct Watcher {
    name: OwnedBusName,
    flags: NameWatcherFlags,
    owner_handle: Handle,
    appeared: Arc<AppearedHandler>,
    vanished: Arc<VanishedHandler>,
    previous_call: Alternator,
    name_owner: Mutex<Option<OwnedUniqueName>>,
    cancelled: AtomicBool,
}

impl Watcher {
    pub(crate) fn spawn(
        connection: zbus::Connection,
        name: OwnedBusName,
        flags: NameWatcherFlags,
        appeared: Arc<AppearedHandler>,
        vanished: Arc<VanishedHandler>,
    ) -> Arc<Self> {
        let owner_handle = Handle::current();

        let watcher = Arc::new(Self {
            name,
            flags,
            owner_handle,
            appeared,
            vanished,
            previous_call: Alternator::new(),
            name_owner: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        });

        let task_watcher = watcher.clone();
        tokio::spawn(async move { task_watcher.run(connection).await });

        watcher
    }

    /// Stops delivering Appeared. A Vanished forced by the connection closing can still fire
    /// afterwards — the background task keeps running to watch for that, it isn't aborted here.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[instrument(skip(self, connection), fields(name = %self.name))]
    async fn run(self: Arc<Self>, connection: zbus::Connection) {
        let dbus = match DBusProxy::new(&connection).await {
            Ok(dbus) => dbus,
            Err(e) => {
                warn!("failed to talk to org.freedesktop.DBus: {e}");
                self.call_vanished(None, true);
                return;
            }
        };

        let name_ref: BusName<'_> = self.name.as_ref();
        let mut owner_changes = match dbus
            .receive_name_owner_changed_with_args(&[(0, &name_ref)])
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to subscribe to NameOwnerChanged for `{name_ref}`: {e}");
                self.call_vanished(None, true);
                return;
            }
        };

        self.resolve_initial_owner(&connection, &dbus, name_ref.clone())
            .await;

        // The stream runs for as long as the connection is alive; when it ends (the connection
        // was dropped or hit an I/O error), that's our only signal of disconnection, so treat it
        // as one. This fires even if the watcher was cancelled in the meantime.
        while let Some(signal) = owner_changes.next().await {
            let args = match signal.args() {
                Ok(args) => args,
                Err(e) => {
                    warn!("malformed NameOwnerChanged for `{name_ref}`: {e}");
                    continue;
                }
            };

            if args.old_owner().as_ref().is_some() && self.name_owner.lock().take().is_some() {
                self.call_vanished(Some(&connection), false);
            }

            if let Some(new_owner) = args.new_owner().as_ref() {
                *self.name_owner.lock() = Some(new_owner.to_owned().into());
                self.call_appeared(&connection, &new_owner.to_string());
            }
        }

        self.call_vanished(Some(&connection), true);
    }

    async fn resolve_initial_owner(
        &self,
        connection: &zbus::Connection,
        dbus: &DBusProxy<'_>,
        name: BusName<'_>,
    ) {
        if self.flags.contains(NameWatcherFlags::AUTO_START) {
            if let BusName::WellKnown(well_known) = &name {
                match dbus.start_service_by_name(well_known.clone(), 0).await {
                    Ok(reply)
                        if reply == START_SERVICE_REPLY_STARTED
                            || reply == START_SERVICE_REPLY_ALREADY_RUNNING => {}
                    Ok(reply) => {
                        warn!("unexpected reply {reply} from StartServiceByName(`{name}`)");
                        self.call_vanished(Some(connection), false);
                        return;
                    }
                    Err(e) => {
                        // Not unexpected: the bus may simply have no `.service` file for this
                        // name. Either way, fall through to GetNameOwner.
                        warn!("StartServiceByName(`{name}`) failed: {e}");
                    }
                }
            }
        }

        match dbus.get_name_owner(name.clone()).await {
            Ok(owner) => {
                *self.name_owner.lock() = Some(owner.clone());
                self.call_appeared(connection, &owner.to_string());
            }
            Err(e) => {
                if !matches!(e, zbus::fdo::Error::NameHasNoOwner(_)) {
                    warn!("GetNameOwner(`{name}`) failed: {e}");
                }
                self.call_vanished(Some(connection), false);
            }
        }
    }

    fn call_appeared(&self, connection: &zbus::Connection, owner: &str) {
        if !self.previous_call.appeared() {
            return;
        }

        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }

        let appeared = self.appeared.clone();
        let connection = connection.clone();
        let name = self.name.to_string();
        let owner = owner.to_string();
        deliver(&self.owner_handle, move || {
            appeared(&connection, &name, &owner);
        });
    }

    /// `connection` is `None` only when no bus connection was ever obtained. `ignore_cancelled`
    /// permits delivery even after `unwatch_name` — used for the forced Vanished on setup
    /// failure or connection closure, so a cancellation race can never suppress the watch's one
    /// guaranteed notification.
    pub(crate) fn call_vanished(
        &self,
        connection: Option<&zbus::Connection>,
        ignore_cancelled: bool,
    ) {
        if !self.previous_call.vanished() {
            return;
        }

        if self.cancelled.load(Ordering::SeqCst) && !ignore_cancelled {
            return;
        }

        let vanished = self.vanished.clone();
        let connection = connection.cloned();
        let name = self.name.to_string();
        deliver(&self.owner_handle, move || {
            vanished(connection.as_ref(), &name);
        });
    }
}

/// The registry's view of a `watch_name` call: stable from the moment `watch_name` returns, even
/// while the connection it needs is still being established in the background.
///
/// Cancelling a slot before the background connect finishes must stop that connect from ever
/// installing a [`Watcher`]; cancelling one afterwards must stop the installed `Watcher`.
pub(crate) struct WatcherSlot {
    cancelled: AtomicBool,
    watcher: Mutex<Option<Arc<Watcher>>>,
}

impl WatcherSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
            watcher: Mutex::new(None),
        })
    }

    /// Installs the watcher once its connection is ready. Returns `false` (and cancels `watcher`
    /// right back out) if this slot was already cancelled in the meantime.
    pub(crate) fn install(&self, watcher: Arc<Watcher>) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            watcher.cancel();
            return false;
        }
        *self.watcher.lock() = Some(watcher);
        true
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.cancel();
        }
    }
}
