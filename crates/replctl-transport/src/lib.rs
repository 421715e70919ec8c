//! Duplex byte transports for raw-REPL device control.
//!
//! A device session needs exactly two primitives from its byte channel:
//! blocking writes and non-blocking "read whatever is pending" reads.
//! This crate defines that contract ([`Transport`]) and provides the two
//! concrete Unix transports the protocol is driven over:
//! - a serial tty ([`TtyPort`]) for boards attached over USB-serial
//! - an already-open fd pair ([`FdPair`]) for process-attached consoles
//!
//! This is the lowest layer of replctl. Everything else builds on top of
//! the [`Transport`] trait defined here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod tty;

pub use error::{Result, TransportError};
pub use traits::Transport;

#[cfg(unix)]
pub use pipe::FdPair;
#[cfg(unix)]
pub use tty::TtyPort;
