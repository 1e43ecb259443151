use bitflags::bitflags;

bitflags! {
    /// Flags controlling how [`crate::Application::register`] behaves.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ApplicationFlags: u32 {
        /// Never publish the dispatcher; always behave as a remote instance that forwards to
        /// whoever already owns the name.
        const IS_LAUNCHER = 0b0000_0001;

        /// This process must be the sole provider of the name. If `RequestName` reports that the
        /// name already exists, registration fails instead of silently becoming remote.
        const IS_SERVICE = 0b0000_0010;
    }
}
