use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};

use tracing::{info, instrument, warn};
use zbus::{
    fdo::{DBusProxy, RequestNameFlags, RequestNameReply},
    names::{OwnedWellKnownName, WellKnownName},
    zvariant::OwnedObjectPath,
};

use crate::{
    application::{dispatcher::AppDispatcher, flags::ApplicationFlags},
    delegate::ApplicationDelegate,
    error::{Error, Result},
    path::application_path_from_id,
};

/// A registered application: either the primary owner of `bus_name`, serving
/// `org.gtk.Application`, or a remote instance that forwards to whoever is.
///
/// Dropping an `Application` that is primary releases the bus name (by dropping the
/// connection's last strong reference to it held here) and unpublishes the dispatcher.
pub struct Application {
    connection: zbus::Connection,
    bus_name: OwnedWellKnownName,
    object_path: OwnedObjectPath,
    is_remote: bool,
    published: AtomicBool,
}

impl Application {
    /// Registers `appid` on the session bus, becoming primary if nobody else owns the name yet.
    #[instrument(skip(delegate))]
    pub async fn register(
        delegate: Arc<dyn ApplicationDelegate>,
        appid: &str,
        flags: ApplicationFlags,
    ) -> Result<Self> {
        let connection = zbus::Connection::session().await?;
        Self::register_on(connection, delegate, appid, flags).await
    }

    /// The registration logic proper, decoupled from how `connection` was obtained. Split out
    /// from [`Application::register`] so it can be exercised against a connection that isn't the
    /// real session bus.
    async fn register_on(
        connection: zbus::Connection,
        delegate: Arc<dyn ApplicationDelegate>,
        appid: &str,
        flags: ApplicationFlags,
    ) -> Result<Self> {
        let bus_name: OwnedWellKnownName = WellKnownName::try_from(appid)
            .map_err(|_| Error::InvalidAppId(appid.to_string()))?
            .into();

        let object_path = application_path_from_id(appid)?;

        if flags.contains(ApplicationFlags::IS_LAUNCHER) {
            info!("registering `{appid}` as a launcher; never publishing locally");
            return Ok(Self {
                connection,
                bus_name,
                object_path,
                is_remote: true,
                published: AtomicBool::new(false),
            });
        }

        connection
            .object_server()
            .at(&object_path, AppDispatcher::new(delegate))
            .await
            .map_err(|source| Error::Publish {
                path: object_path.clone(),
                source,
            })?;

        let dbus = DBusProxy::new(&connection).await?;
        let reply = dbus
            .request_name(bus_name.as_ref(), RequestNameFlags::DoNotQueue.into())
            .await
            .map_err(zbus::Error::from)?;

        let is_remote = match reply {
            RequestNameReply::PrimaryOwner => false,
            RequestNameReply::Exists => {
                connection
                    .object_server()
                    .remove::<AppDispatcher, _>(&object_path)
                    .await?;

                if flags.contains(ApplicationFlags::IS_SERVICE) {
                    return Err(Error::NameAcquisitionFailed(appid.to_string()));
                }

                true
            }
            other => return Err(Error::UnexpectedReply(other)),
        };

        Ok(Self {
            connection,
            bus_name,
            object_path,
            is_remote,
            published: AtomicBool::new(!is_remote),
        })
    }

    /// Whether this process forwards to a primary instance owned by someone else.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    pub fn bus_name(&self) -> &OwnedWellKnownName {
        &self.bus_name
    }

    pub fn object_path(&self) -> &OwnedObjectPath {
        &self.object_path
    }

    pub(crate) fn connection(&self) -> &zbus::Connection {
        &self.connection
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        if self.published.swap(false, Ordering::SeqCst) {
            let connection = self.connection.clone();
            let object_path = self.object_path.clone();
            tokio::spawn(async move {
                if let Err(e) = connection
                    .object_server()
                    .remove::<AppDispatcher, _>(&object_path)
                    .await
                {
                    warn!("failed to unpublish application object: {e}");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::UnixStream;
    use zbus::Guid;

    use super::*;

    struct NoopDelegate;
    impl ApplicationDelegate for NoopDelegate {}

    /// Stands in for `org.freedesktop.DBus`'s `RequestName`, always answering with a fixed,
    /// pre-baked numeric reply (see the D-Bus specification for the reply codes).
    struct FakeDBus(u32);

    const REQUEST_NAME_REPLY_PRIMARY_OWNER: u32 = 1;
    const REQUEST_NAME_REPLY_EXISTS: u32 = 3;

    #[zbus::interface(name = "org.freedesktop.DBus")]
    impl FakeDBus {
        async fn request_name(&self, _name: String, _flags: u32) -> u32 {
            self.0
        }
    }

    /// A connected pair standing in for the primary's bus connection and, on the other end, the
    /// bus daemon it talks to.
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

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn launcher_mode_never_publishes_or_requests_a_name() {
        let (connection, _daemon) = peer_pair().await;

        let app = Application::register_on(
            connection,
            Arc::new(NoopDelegate),
            "org.example.Launcher",
            ApplicationFlags::IS_LAUNCHER,
        )
        .await
        .unwrap();

        assert!(app.is_remote());
        assert!(!app.published.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn primary_owner_reply_yields_a_non_remote_application() {
        let (connection, daemon) = peer_pair().await;
        daemon
            .object_server()
            .at(
                "/org/freedesktop/DBus",
                FakeDBus(REQUEST_NAME_REPLY_PRIMARY_OWNER),
            )
            .await
            .unwrap();

        let app = Application::register_on(
            connection,
            Arc::new(NoopDelegate),
            "org.example.Primary",
            ApplicationFlags::empty(),
        )
        .await
        .unwrap();

        assert!(!app.is_remote());
        assert!(app.published.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exists_reply_unpublishes_and_marks_remote() {
        let (connection, daemon) = peer_pair().await;
        daemon
            .object_server()
            .at("/org/freedesktop/DBus", FakeDBus(REQUEST_NAME_REPLY_EXISTS))
            .await
            .unwrap();

        let app = Application::register_on(
            connection,
            Arc::new(NoopDelegate),
            "org.example.Remote",
            ApplicationFlags::empty(),
        )
        .await
        .unwrap();

        assert!(app.is_remote());
        assert!(!app.published.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exists_reply_is_fatal_for_a_service() {
        let (connection, daemon) = peer_pair().await;
        daemon
            .object_server()
            .at("/org/freedesktop/DBus", FakeDBus(REQUEST_NAME_REPLY_EXISTS))
            .await
            .unwrap();

        let result = Application::register_on(
            connection,
            Arc::new(NoopDelegate),
            "org.example.Service",
            ApplicationFlags::IS_SERVICE,
        )
        .await;

        assert!(matches!(result, Err(Error::NameAcquisitionFailed(_))));
    }
}
