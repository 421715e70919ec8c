//! Control-channel client for MicroPython-style raw-REPL devices.
//!
//! replctl drives the raw interactive-execution protocol of a remote
//! microcontroller interpreter: interrupt whatever is running, hold the
//! device in raw mode, submit one command at a time, and decode the
//! response back into a typed value. Remote proxies let a caller keep a
//! handle to a value in device memory and invoke methods on it.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex byte transports (serial tty, fd pairs)
//! - [`codec`]: literal value codec (encode args, parse responses)
//! - [`session`]: session driver, remote proxies, name pool

/// Re-export transport types.
pub mod transport {
    pub use replctl_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use replctl_codec::*;
}

/// Re-export session types.
pub mod session {
    pub use replctl_session::*;
}
