use thiserror::Error;

/// Errors that can arise while registering an application or watching a bus name.
#[derive(Debug, Error)]
pub enum Error {
    /// Talking to the session bus itself failed (connecting, calling a method, subscribing).
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// Publishing the application's dispatcher on the `ObjectServer` failed.
    #[error("failed to publish application object at `{path}`: {source}")]
    Publish {
        path: zbus::zvariant::OwnedObjectPath,
        #[source]
        source: zbus::Error,
    },

    /// `RequestName` reported that the name is already owned, and the caller required
    /// sole ownership (`ApplicationFlags::IS_SERVICE`).
    #[error("unable to acquire bus name `{0}`")]
    NameAcquisitionFailed(String),

    /// `RequestName` returned a reply this crate doesn't know how to interpret, given that
    /// requests are always made with `DO_NOT_QUEUE`.
    #[error("unexpected reply `{0:?}` from RequestName")]
    UnexpectedReply(zbus::fdo::RequestNameReply),

    /// The application id is not a valid D-Bus well-known name.
    #[error("`{0}` is not a valid application id")]
    InvalidAppId(String),

    /// The name passed to `watch_name`/`watch_name_on_connection` is not a valid bus name.
    #[error("`{0}` is not a valid bus name")]
    InvalidBusName(String),

    /// Spinning up the private runtime for a blocking remote `CommandLine` round trip failed.
    #[error("failed to start command line runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
