use bitflags::bitflags;

bitflags! {
    /// Flags controlling how [`crate::watch_name`] behaves.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NameWatcherFlags: u32 {
        /// Ask the bus to start a service owning the watched name if nobody currently owns it,
        /// via `StartServiceByName`.
        const AUTO_START = 0b0000_0001;
    }
}
