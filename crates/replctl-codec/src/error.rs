/// A response could not be read back as a literal expression.
///
/// Carried as data rather than raised: the device legitimately echoes
/// malformed text in some error scenarios, and callers want the original
/// bytes for diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid literal at byte {offset}: {message}")]
pub struct DecodeError {
    /// The full text that failed to parse.
    pub text: String,
    /// Byte offset of the failure within `text`.
    pub offset: usize,
    /// What the parser expected or rejected.
    pub message: String,
}

pub type Result<T> = std::result::Result<T, DecodeError>;
