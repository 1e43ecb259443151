use std::sync::Arc;

use tracing::instrument;
use zbus::{interface, message, object_server::SignalEmitter, zvariant::OwnedObjectPath};

use crate::{
    application::command_line::CommandLineChannel,
    delegate::ApplicationDelegate,
    platform_data::{FileRef, PlatformData},
};

/// `org.gtk.Application`'s method handler, published at the application's derived object path
/// while it is primary.
///
/// Dispatch itself never blocks the connection's read loop beyond the duration of the
/// delegate's hooks and signal handlers; a delegate that does long-running synchronous work
/// inside those hooks is responsible for offloading it.
pub struct AppDispatcher {
    delegate: Arc<dyn ApplicationDelegate>,
}

impl AppDispatcher {
    pub fn new(delegate: Arc<dyn ApplicationDelegate>) -> Self {
        Self { delegate }
    }
}

#[interface(name = "org.gtk.Application")]
impl AppDispatcher {
    #[instrument(skip_all)]
    async fn activate(&self, platform_data: PlatformData) {
        self.delegate.before_emit(&platform_data);
        self.delegate.activate();
        self.delegate.after_emit(&platform_data);
    }

    #[instrument(skip_all)]
    async fn open(&self, uris: Vec<String>, hint: String, platform_data: PlatformData) {
        let files: Vec<FileRef> = uris.into_iter().map(FileRef::for_uri).collect();

        self.delegate.before_emit(&platform_data);
        self.delegate.open(&files, &hint);
        self.delegate.after_emit(&platform_data);
    }

    #[instrument(skip_all)]
    async fn command_line(
        &self,
        reply_path: OwnedObjectPath,
        arguments: Vec<Vec<u8>>,
        platform_data: PlatformData,
        #[zbus(header)] hdr: message::Header<'_>,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(signal_emitter)] _ctxt: SignalEmitter<'_>,
    ) -> i32 {
        let sender = hdr
            .sender()
            .expect("method call without a `sender` header")
            .to_owned()
            .into();

        let (channel, done) = CommandLineChannel::new(
            connection.clone(),
            sender,
            reply_path,
            arguments,
            platform_data.clone(),
        );

        self.delegate.before_emit(&platform_data);
        let status = self.delegate.command_line(&channel);
        channel.set_exit_status(status);
        self.delegate.after_emit(&platform_data);
        drop(channel);

        // The delegate may have kept a clone of `channel` to finish the call later (e.g. once
        // some background work completes); `done` only resolves once every clone has been
        // dropped and the final exit status is known.
        done.await.unwrap_or(status)
    }
}
