use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;
use zbus::{names::OwnedUniqueName, zvariant::OwnedObjectPath};

use crate::platform_data::PlatformData;

/// The primary side of a remote command-line invocation.
///
/// Created by [`crate::application::AppDispatcher`] for each inbound `CommandLine` call and
/// handed to the delegate's `command_line` hook. Cheaply [`Clone`]able: a delegate that wants to
/// finish the call asynchronously (after its `command_line` hook has already returned) can keep
/// a clone around and call [`CommandLineChannel::set_exit_status`] later. The reply is sent
/// exactly once, when the last clone is dropped.
#[derive(Clone)]
pub struct CommandLineChannel {
    inner: Arc<Inner>,
}

struct Inner {
    connection: zbus::Connection,
    peer_bus_name: OwnedUniqueName,
    peer_object_path: OwnedObjectPath,
    arguments: Vec<Vec<u8>>,
    platform_data: PlatformData,
    exit_status: AtomicI32,
    done: Mutex<Option<oneshot::Sender<i32>>>,
}

impl CommandLineChannel {
    pub(crate) fn new(
        connection: zbus::Connection,
        peer_bus_name: OwnedUniqueName,
        peer_object_path: OwnedObjectPath,
        arguments: Vec<Vec<u8>>,
        platform_data: PlatformData,
    ) -> (Self, oneshot::Receiver<i32>) {
        let (tx, rx) = oneshot::channel();
        let inner = Inner {
            connection,
            peer_bus_name,
            peer_object_path,
            arguments,
            platform_data,
            exit_status: AtomicI32::new(0),
            done: Mutex::new(Some(tx)),
        };

        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    /// The remote's raw argv, as the bytes it was invoked with.
    pub fn arguments(&self) -> &[Vec<u8>] {
        &self.inner.arguments
    }

    /// The opaque platform data carried with the invocation.
    pub fn platform_data(&self) -> &PlatformData {
        &self.inner.platform_data
    }

    /// Sets the value that will become the remote process's exit status. Safe to call more than
    /// once; only the last write before the final drop takes effect.
    pub fn set_exit_status(&self, status: i32) {
        self.inner.exit_status.store(status, Ordering::SeqCst);
    }

    pub fn exit_status(&self) -> i32 {
        self.inner.exit_status.load(Ordering::SeqCst)
    }

    /// Writes `message` to the remote's stdout.
    ///
    /// Fire-and-forget: ordering with other calls to the same peer is the bus's per-destination
    /// FIFO order, but no delivery acknowledgement is awaited.
    pub fn print_literal(&self, message: &str) {
        self.send_to_peer("Print", message);
    }

    /// Writes `message` to the remote's stderr.
    pub fn print_error_literal(&self, message: &str) {
        self.send_to_peer("PrintError", message);
    }

    fn send_to_peer(&self, method: &'static str, message: &str) {
        let connection = self.inner.connection.clone();
        let destination = self.inner.peer_bus_name.clone();
        let path = self.inner.peer_object_path.clone();
        let message = message.to_string();

        tokio::spawn(async move {
            let result = connection
                .call_method(
                    Some(destination.as_ref()),
                    path.as_ref(),
                    Some("org.gtk.private.CommandLine"),
                    method,
                    &(message,),
                )
                .await;
            if let Err(e) = result {
                warn!("failed to forward `{}` to remote command line: {}", method, e);
            }
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(tx) = self.done.lock().take() {
            // The receiver may already be gone if the dispatcher task itself was aborted; that's
            // fine, there's no reply to send to a connection that no longer exists.
            let _ = tx.send(self.exit_status.load(Ordering::SeqCst));
        }
    }
}
