//! Literal value codec for the raw-REPL protocol.
//!
//! The device speaks in interpreter literal syntax: arguments go out as a
//! parenthesized tuple literal, results come back as the `repr()` of a
//! value. This crate owns both directions:
//! - [`encode_args`] spells a host-side argument list the way the device's
//!   parser expects it
//! - [`parse`] reads response text back into a [`Value`], admitting
//!   literals only, never identifiers or operator evaluation
//!
//! Decoding intentionally trusts the device about *content*; the
//! literal-only restriction is a parser property, not a security boundary.

pub mod encode;
pub mod error;
pub mod parse;
pub mod value;

pub use encode::{encode_args, repr};
pub use error::{DecodeError, Result};
pub use parse::parse;
pub use value::Value;
