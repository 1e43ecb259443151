use std::sync::Arc;

use clap::Parser;
use dbus_instance::{Application, ApplicationDelegate, ApplicationFlags, CommandLineChannel, FileRef, PlatformData};
use tracing::info;

/// Single-instance demo application: the first invocation stays running and handles every
/// later invocation's command line; later invocations just forward to it and exit.
#[derive(Parser, Debug)]
struct Args {
    /// Application id to register, e.g. `org.example.Demo`.
    #[arg(long, default_value = "org.example.DbusInstanceDemo")]
    app_id: String,

    /// Arguments forwarded to the primary instance's `command_line` hook.
    trailing: Vec<String>,
}

struct Delegate;

impl ApplicationDelegate for Delegate {
    fn activate(&self) {
        info!("activated with no arguments");
    }

    fn open(&self, files: &[FileRef], hint: &str) {
        info!(?hint, "asked to open {} file(s)", files.len());
        for file in files {
            info!("  {file}");
        }
    }

    fn command_line(&self, cmdline: &CommandLineChannel) -> i32 {
        let args: Vec<String> = cmdline
            .arguments()
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        cmdline.print_literal(&format!("primary instance received: {args:?}\n"));
        0
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dbus_instance::tracing_subscriber::init();
    let args = Args::parse();

    let app = Application::register(Arc::new(Delegate), &args.app_id, ApplicationFlags::empty()).await?;

    if app.is_remote() {
        info!("another instance is already running; forwarding");
        let status = app
            .command_line(
                args.trailing.into_iter().map(String::into_bytes).collect(),
                PlatformData::new(),
            )
            .await?;
        std::process::exit(status);
    }

    info!(app_id = %args.app_id, "registered as primary instance; waiting for Ctrl-C");
    tokio::signal::ctrl_c().await?;

    Ok(())
}
