use crate::{application::CommandLineChannel, platform_data::FileRef, platform_data::PlatformData};

/// Hook points a hosting application supplies to the dispatch core.
///
/// This plays the role of the base class's virtual methods and signals in the original design:
/// `before_emit`/`after_emit` bracket every inbound call, and `activate`/`open`/`command_line`
/// are the signals themselves. Implementations are invoked only on a primary instance, from the
/// task driving the application's bus connection.
pub trait ApplicationDelegate: Send + Sync {
    /// Called before `activate`, `open` or `command_line`, with the platform data of the call
    /// that is about to be emitted.
    fn before_emit(&self, _platform_data: &PlatformData) {}

    /// Called after `activate`, `open` or `command_line` returns.
    fn after_emit(&self, _platform_data: &PlatformData) {}

    /// The `Activate` signal: the application was asked to present itself with no further
    /// arguments.
    fn activate(&self) {}

    /// The `Open` signal: the application was asked to open `files`, with `hint` carrying an
    /// application-defined interpretation (e.g. "print" or a window target).
    fn open(&self, _files: &[FileRef], _hint: &str) {}

    /// The `CommandLine` signal: the application was invoked with a command line. The returned
    /// value becomes the remote process's exit status.
    ///
    /// The default implementation ignores the command line and exits successfully, mirroring a
    /// `GApplication` subclass that doesn't override the signal.
    fn command_line(&self, _cmdline: &CommandLineChannel) -> i32 {
        0
    }
}
