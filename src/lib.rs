//! Single-instance application coordination and bus name watching on top of D-Bus.
//!
//! Two independent pieces live here:
//!
//! - [`Application`] registers a well-known bus name and tells the caller whether it became the
//!   primary instance or is forwarding to one that already exists, dispatching `Activate`,
//!   `Open` and `CommandLine` to an [`ApplicationDelegate`] while primary.
//! - [`watch_name`]/[`watch_name_on_connection`]/[`unwatch_name`] watch any bus name for an
//!   owner appearing or disappearing, independent of the application machinery above.

pub mod application;
pub mod delegate;
pub mod error;
pub mod path;
pub mod platform_data;
pub mod tracing_subscriber;
pub mod watcher;

pub use application::{Application, ApplicationFlags, CommandLineChannel};
pub use delegate::ApplicationDelegate;
pub use error::{Error, Result};
pub use path::application_path_from_id;
pub use platform_data::{FileRef, PlatformData};
pub use watcher::{unwatch_name, watch_name, watch_name_on_connection, BusType, NameWatcherFlags, WatcherId};
