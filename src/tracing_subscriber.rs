//! Wires up a default `tracing` subscriber for the demonstration binaries.
//!
//! Library consumers are free to install their own subscriber instead; nothing in this crate
//! calls [`init`] on their behalf.

#[cfg(feature = "tracing-subscriber")]
pub fn init() {
    use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish()
        .init();
}

#[cfg(not(feature = "tracing-subscriber"))]
pub fn init() {}
