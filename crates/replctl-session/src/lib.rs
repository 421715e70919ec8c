//! Raw-REPL session driver.
//!
//! This is the core value-add layer of replctl: it forces the device out
//! of whatever is running, holds it in raw mode, and runs the strict
//! one-command-at-a-time request/response cycle:
//!
//! ```text
//! host: <command bytes> 0x04
//! device: "OK" <result bytes> 0x04 <error bytes> 0x04 ">"
//! ```
//!
//! On top of the [`Session`] sit [`Remote`] proxies: handles to values
//! that live only in device memory, addressed through short names drawn
//! from a shared [`NamePool`].

pub mod error;
pub mod pool;
pub mod remote;
pub mod session;

pub use error::{Result, SessionError};
pub use pool::NamePool;
pub use remote::Remote;
pub use session::{Reply, Session, SessionConfig, BREAK_SEQUENCE, RAW_PROMPT, RESET_SEQUENCE};

pub use replctl_codec::Value;
