use std::time::Duration;

use dbus_instance::{watch_name_on_connection, unwatch_name, NameWatcherFlags};
use ntest::timeout;
use parking_lot::Mutex as SyncMutex;
use tokio::{net::UnixStream, sync::mpsc};
use tracing::instrument;
use zbus::{object_server::SignalEmitter, Guid};

const WATCHED_NAME: &str = "org.example.Watched";

/// Stands in for `org.freedesktop.DBus` on the other end of a name watcher's connection: answers
/// `GetNameOwner`/`StartServiceByName` from configurable state, and lets the test drive
/// `NameOwnerChanged` directly.
struct FakeDBus {
    owner: SyncMutex<Option<String>>,
    start_service_reply: u32,
}

#[zbus::interface(name = "org.freedesktop.DBus")]
impl FakeDBus {
    async fn get_name_owner(&self, _name: String) -> zbus::fdo::Result<String> {
        self.owner
            .lock()
            .clone()
            .ok_or_else(|| zbus::fdo::Error::NameHasNoOwner("no owner".to_string()))
    }

    async fn start_service_by_name(&self, _name: String, _flags: u32) -> u32 {
        // A real service would acquire the name as a side effect of starting; fake that here so
        // a subsequent `GetNameOwner` sees it.
        *self.owner.lock() = Some("1.1".to_string());
        self.start_service_reply
    }

    #[zbus(signal)]
    async fn name_owner_changed(
        emitter: &SignalEmitter<'_>,
        name: &str,
        old_owner: &str,
        new_owner: &str,
    ) -> zbus::Result<()>;
}

/// A connected pair standing in for the watcher's own connection and, on the other end, the bus
/// daemon it talks to.
async fn peer_pair() -> (zbus::Connection, zbus::Connection) {
    let (left, right) = UnixStream::pair().expect("socket pair");
    let guid = Guid::generate();

    tokio::try_join!(
        zbus::connection::Builder::unix_stream(left)
            .server(guid)
            .expect("set server guid")
            .p2p()
            .build(),
        zbus::connection::Builder::unix_stream(right).p2p().build(),
    )
    .expect("peer connections")
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a watcher event")
        .expect("watcher event channel closed")
}

fn watch(
    connection: &zbus::Connection,
    flags: NameWatcherFlags,
) -> (dbus_instance::WatcherId, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let appeared_tx = tx.clone();
    let vanished_tx = tx;

    let id = watch_name_on_connection(
        connection,
        WATCHED_NAME,
        flags,
        move |_conn, _name, owner| {
            let _ = appeared_tx.send(format!("appeared:{owner}"));
        },
        move |_conn, _name| {
            let _ = vanished_tx.send("vanished".to_string());
        },
    )
    .unwrap();

    (id, rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[instrument]
#[timeout(15000)]
async fn appears_immediately_when_the_name_already_has_an_owner() {
    let (connection, daemon) = peer_pair().await;
    daemon
        .object_server()
        .at(
            "/org/freedesktop/DBus",
            FakeDBus {
                owner: SyncMutex::new(Some("1.1".to_string())),
                start_service_reply: 0,
            },
        )
        .await
        .unwrap();

    let (_id, mut rx) = watch(&connection, NameWatcherFlags::empty());

    assert_eq!(recv(&mut rx).await, "appeared:1.1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[instrument]
#[timeout(15000)]
async fn vanishes_on_no_owner_then_alternates_through_a_handoff() {
    let (connection, daemon) = peer_pair().await;
    daemon
        .object_server()
        .at(
            "/org/freedesktop/DBus",
            FakeDBus {
                owner: SyncMutex::new(None),
                start_service_reply: 0,
            },
        )
        .await
        .unwrap();

    let (_id, mut rx) = watch(&connection, NameWatcherFlags::empty());
    assert_eq!(recv(&mut rx).await, "vanished");

    let iface_ref = daemon
        .object_server()
        .interface::<_, FakeDBus>("/org/freedesktop/DBus")
        .await
        .unwrap();

    FakeDBus::name_owner_changed(iface_ref.signal_emitter(), WATCHED_NAME, "", "1.1")
        .await
        .unwrap();
    assert_eq!(recv(&mut rx).await, "appeared:1.1");

    // A direct ownership hand-off must alternate Vanished then Appeared, not just Appeared again.
    FakeDBus::name_owner_changed(iface_ref.signal_emitter(), WATCHED_NAME, "1.1", "1.2")
        .await
        .unwrap();
    assert_eq!(recv(&mut rx).await, "vanished");
    assert_eq!(recv(&mut rx).await, "appeared:1.2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[instrument]
#[timeout(15000)]
async fn auto_start_queries_the_owner_only_after_starting_the_service() {
    let (connection, daemon) = peer_pair().await;
    daemon
        .object_server()
        .at(
            "/org/freedesktop/DBus",
            FakeDBus {
                owner: SyncMutex::new(None),
                start_service_reply: 1, // DBUS_START_REPLY_SUCCESS
            },
        )
        .await
        .unwrap();

    let (_id, mut rx) = watch(&connection, NameWatcherFlags::AUTO_START);

    // `start_service_by_name` only sets an owner as a side effect of being called; an
    // implementation that queried `GetNameOwner` first would see no owner and report Vanished.
    assert_eq!(recv(&mut rx).await, "appeared:1.1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[instrument]
#[timeout(15000)]
async fn connection_closing_forces_a_final_vanished_even_after_unwatch() {
    let (connection, daemon) = peer_pair().await;
    daemon
        .object_server()
        .at(
            "/org/freedesktop/DBus",
            FakeDBus {
                owner: SyncMutex::new(Some("1.1".to_string())),
                start_service_reply: 0,
            },
        )
        .await
        .unwrap();

    let (id, mut rx) = watch(&connection, NameWatcherFlags::empty());
    assert_eq!(recv(&mut rx).await, "appeared:1.1");

    unwatch_name(id);
    drop(daemon);

    assert_eq!(recv(&mut rx).await, "vanished");
}
