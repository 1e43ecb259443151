//! Watching a bus name for an owner appearing or disappearing.

mod dispatch;
mod registry;
mod watcher;

pub mod flags;
pub mod public;

pub use flags::NameWatcherFlags;
pub use public::{unwatch_name, watch_name, watch_name_on_connection, BusType};
pub use registry::WatcherId;
