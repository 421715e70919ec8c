use std::time::Duration;

use crate::error::Result;

/// Back-off between write retries when the transport's output buffer is
/// full. Keeps a stalled write from spinning a core.
pub(crate) const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);

/// A duplex byte channel into the device.
///
/// The raw-REPL protocol is half-duplex request/response, so the session
/// layer only ever needs two primitives: write a buffer in full, and pick
/// up whatever input has arrived since the last poll. `read_avail` must
/// never block: an idle channel returns an empty buffer and the session
/// decides how long to wait before polling again.
pub trait Transport {
    /// Write the whole buffer to the device (blocking).
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Return the bytes currently pending, possibly none (non-blocking).
    fn read_avail(&mut self) -> Result<Vec<u8>>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str {
        "transport"
    }
}
