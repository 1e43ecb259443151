use clap::Parser;
use dbus_instance::{BusType, NameWatcherFlags};
use tracing::info;

/// Watches a bus name and logs every time it appears or disappears, mirroring the upstream
/// `gdbus-example-watch-name` sample.
#[derive(Parser, Debug)]
struct Args {
    /// Name to watch, e.g. `org.freedesktop.Notifications`.
    name: String,

    /// Ask the bus to start a service owning the name if nobody currently owns it.
    #[arg(long)]
    auto_start: bool,

    /// Watch the system bus instead of the session bus.
    #[arg(long)]
    system: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dbus_instance::tracing_subscriber::init();
    let args = Args::parse();

    let flags = if args.auto_start {
        NameWatcherFlags::AUTO_START
    } else {
        NameWatcherFlags::empty()
    };
    let bus_type = if args.system { BusType::System } else { BusType::Session };

    let name = args.name.clone();
    let id = dbus_instance::watch_name(
        bus_type,
        &args.name,
        flags,
        move |_conn, name, owner| info!(%name, %owner, "name appeared"),
        move |_conn, name| info!(%name, "name vanished"),
    )?;

    info!(name, "watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    dbus_instance::unwatch_name(id);

    Ok(())
}
