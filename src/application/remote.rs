use zbus::interface;

use crate::{
    application::registrar::Application,
    error::Result,
    platform_data::{FileRef, PlatformData},
};

impl Application {
    /// Sends `Activate` to whoever owns the bus name; fire-and-forget.
    pub async fn activate(&self, platform_data: PlatformData) -> Result<()> {
        self.connection()
            .call_method(
                Some(self.bus_name().as_ref()),
                self.object_path().as_ref(),
                Some("org.gtk.Application"),
                "Activate",
                &(platform_data,),
            )
            .await?;
        Ok(())
    }

    /// Sends `Open` to whoever owns the bus name; fire-and-forget.
    pub async fn open(
        &self,
        files: &[FileRef],
        hint: &str,
        platform_data: PlatformData,
    ) -> Result<()> {
        let uris: Vec<&str> = files.iter().map(FileRef::uri).collect();
        self.connection()
            .call_method(
                Some(self.bus_name().as_ref()),
                self.object_path().as_ref(),
                Some("org.gtk.Application"),
                "Open",
                &(uris, hint, platform_data),
            )
            .await?;
        Ok(())
    }

    /// Forwards a command line to whoever owns the bus name and awaits the primary instance's
    /// exit status. `Print`/`PrintError` calls the primary sends back in the meantime are
    /// written to this process's stdout/stderr as they arrive.
    ///
    /// Use this from within an existing Tokio runtime; from a plain synchronous `fn main`, use
    /// [`Application::command_line_blocking`] instead.
    pub async fn command_line(&self, arguments: Vec<Vec<u8>>, platform_data: PlatformData) -> Result<i32> {
        command_line_round_trip(
            self.connection().clone(),
            self.bus_name().to_owned(),
            self.object_path().clone(),
            arguments,
            platform_data,
        )
        .await
    }

    /// Like [`Application::command_line`], but for a caller with no Tokio runtime of its own: it
    /// spins up a private, single-threaded one for the round trip and blocks on it. Panics if
    /// called from within a Tokio runtime already — use [`Application::command_line`] there.
    pub fn command_line_blocking(
        &self,
        arguments: Vec<Vec<u8>>,
        platform_data: PlatformData,
    ) -> Result<i32> {
        let connection = self.connection().clone();
        let bus_name = self.bus_name().to_owned();
        let object_path = self.object_path().clone();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(crate::error::Error::Runtime)?;

        runtime.block_on(command_line_round_trip(
            connection,
            bus_name,
            object_path,
            arguments,
            platform_data,
        ))
    }
}

async fn command_line_round_trip(
    connection: zbus::Connection,
    bus_name: zbus::names::OwnedWellKnownName,
    object_path: zbus::zvariant::OwnedObjectPath,
    arguments: Vec<Vec<u8>>,
    platform_data: PlatformData,
) -> Result<i32> {
    // A fixed path collides when more than one remote invocation from this process is in
    // flight at once; a fresh one per call sidesteps that instead of hoping it never happens.
    let reply_path = zbus::zvariant::OwnedObjectPath::try_from(format!(
        "/org/gtk/Application/CommandLine/{:x}",
        fastrand::u64(..)
    ))
    .expect("generated path is a valid object path");

    connection
        .object_server()
        .at(&reply_path, ReplyListener)
        .await?;

    let status = connection
        .call_method(
            Some(bus_name.as_ref()),
            object_path.as_ref(),
            Some("org.gtk.Application"),
            "CommandLine",
            &(&reply_path, arguments, platform_data),
        )
        .await?
        .body()
        .deserialize::<i32>()?;

    connection
        .object_server()
        .remove::<ReplyListener, _>(&reply_path)
        .await?;

    Ok(status)
}

/// Receives `Print`/`PrintError` calls the primary instance sends back while a `CommandLine`
/// invocation is outstanding, and writes them to this process's own stdio.
struct ReplyListener;

#[interface(name = "org.gtk.private.CommandLine")]
impl ReplyListener {
    async fn print(&self, message: String) {
        print!("{message}");
    }

    async fn print_error(&self, message: String) {
        eprint!("{message}");
    }
}
