use std::time::Duration;

/// Errors that can occur while driving a raw-REPL session.
///
/// Note what is *not* here: a command that raises on the device and a
/// response that fails literal decoding both come back as
/// [`Reply`](crate::Reply) variants. They are expected protocol outcomes,
/// not session faults.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] replctl_transport::TransportError),

    /// The result segment did not carry the `OK` tag. The framing is
    /// desynchronized; the session must be re-initialized before reuse.
    #[error("protocol desynchronized: result segment started with {got:?} instead of OK")]
    Protocol { got: String },

    /// No free remote names left for a new proxy.
    #[error("remote name pool exhausted")]
    PoolExhausted,

    /// The device raised while binding a remote value.
    #[error("remote bind failed on device: {0}")]
    BindFailed(String),

    /// The device never presented the raw prompt within the configured
    /// deadline. Only produced when a deadline is configured; the default
    /// is to retry the interrupt sequence forever.
    #[error("device did not present the raw prompt within {0:?}")]
    HandshakeTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, SessionError>;
