use std::thread;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use replctl_codec::{encode_args, DecodeError, Value};
use replctl_transport::Transport;
use tracing::{debug, trace, warn};

use crate::error::{Result, SessionError};

/// Halts whatever the interpreter is running (sent twice, since a program
/// can swallow the first one).
pub const INTERRUPT: u8 = 0x03;
/// Switches the interpreter into raw mode (no echo, no prompt dialogue).
pub const ENTER_RAW: u8 = 0x01;
/// Terminates a submitted command and triggers execution.
pub const EXECUTE: u8 = 0x04;
/// Leaves raw mode and restores the normal interactive prompt.
pub const ENTER_COOKED: u8 = 0x02;

/// Interrupt twice, enter raw mode, force the raw prompt.
pub const BREAK_SEQUENCE: [u8; 4] = [INTERRUPT, INTERRUPT, ENTER_RAW, EXECUTE];
/// Back to cooked mode, interrupt twice, resume normal operation.
pub const RESET_SEQUENCE: [u8; 4] = [ENTER_COOKED, INTERRUPT, INTERRUPT, EXECUTE];

/// The device is ready for a command once its output ends with this.
pub const RAW_PROMPT: &[u8] = b"\r\n>";

const OK_TAG: &[u8] = b"OK";
const RESULT_TERMINATOR: &[u8] = &[EXECUTE];
const ERROR_TERMINATOR: &[u8] = &[EXECUTE, b'>'];

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed settle delay after submitting a command, and the inter-poll
    /// delay while waiting for response bytes.
    pub poll_delay: Duration,
    /// How long to wait for the raw prompt before re-sending the
    /// interrupt sequence during the handshake.
    pub handshake_retry: Duration,
    /// Overall handshake deadline. `None` retries forever.
    pub handshake_deadline: Option<Duration>,
    /// Send [`RESET_SEQUENCE`] when the session is dropped.
    pub reset_on_drop: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::ZERO,
            handshake_retry: Duration::from_secs(3),
            handshake_deadline: None,
            reset_on_drop: true,
        }
    }
}

/// Outcome of one executed command.
///
/// Device-side failures and undecodable output are ordinary outcomes the
/// caller can branch on; only framing violations become [`SessionError`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The command executed and produced no output.
    None,
    /// The command printed a literal value.
    Value(Value),
    /// The command raised on the device; this is its diagnostic text.
    DeviceError(String),
    /// The command printed something the literal parser rejects.
    DecodeFailed(DecodeError),
}

/// One half-duplex control session over a device transport.
///
/// Every operation takes `&mut self`: commands are strictly serialized,
/// and overlapping submissions would corrupt framing by construction.
pub struct Session<T: Transport> {
    transport: T,
    buf: BytesMut,
    config: SessionConfig,
    reset_sent: bool,
}

impl<T: Transport> Session<T> {
    /// Take ownership of the transport and perform the raw-mode handshake.
    pub fn connect(transport: T, config: SessionConfig) -> Result<Self> {
        let mut session = Self {
            transport,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            reset_sent: false,
        };
        session.initialize()?;
        Ok(session)
    }

    /// Force the device to the raw prompt.
    ///
    /// Sends the interrupt sequence and polls until the accumulated input
    /// ends with the raw prompt marker. A device stuck in user code can
    /// swallow the first interrupt, so the sequence is re-sent whenever
    /// `handshake_retry` elapses without a prompt.
    fn initialize(&mut self) -> Result<()> {
        debug!(transport = self.transport.name(), "entering raw mode");
        self.transport.write_bytes(&BREAK_SEQUENCE)?;

        let started = Instant::now();
        let mut last_break = started;
        let mut seen: Vec<u8> = Vec::new();
        loop {
            let chunk = self.transport.read_avail()?;
            seen.extend_from_slice(&chunk);
            if seen.ends_with(RAW_PROMPT) {
                break;
            }
            if let Some(limit) = self.config.handshake_deadline {
                if started.elapsed() >= limit {
                    return Err(SessionError::HandshakeTimeout(limit));
                }
            }
            if last_break.elapsed() >= self.config.handshake_retry {
                debug!("no raw prompt yet; re-sending interrupt sequence");
                self.transport.write_bytes(&BREAK_SEQUENCE)?;
                last_break = Instant::now();
            }
            self.pause();
        }

        // Best-effort drain of boot banner bytes trailing the prompt.
        // Approximates a full input-buffer reset; a slow device may still
        // have output in flight.
        let _ = self.transport.read_avail()?;
        self.buf.clear();
        debug!("raw prompt observed");
        Ok(())
    }

    /// Submit one command and read back its response frame.
    pub fn command(&mut self, cmd: &str) -> Result<Reply> {
        debug!(cmd, "submitting");
        let mut wire = Vec::with_capacity(cmd.len() + 1);
        wire.extend_from_slice(cmd.as_bytes());
        wire.push(EXECUTE);
        self.transport.write_bytes(&wire)?;
        thread::sleep(self.config.poll_delay);

        let result = self.read_segment(RESULT_TERMINATOR)?;
        let error = self.read_segment(ERROR_TERMINATOR)?;

        if !result.starts_with(OK_TAG) {
            return Err(SessionError::Protocol {
                got: String::from_utf8_lossy(&result).into_owned(),
            });
        }
        if !error.is_empty() {
            let text = String::from_utf8_lossy(&error).into_owned();
            debug!(%text, "device raised");
            return Ok(Reply::DeviceError(text));
        }
        if result.len() > OK_TAG.len() {
            let text = String::from_utf8_lossy(&result[OK_TAG.len()..]).into_owned();
            trace!(%text, "decoding result");
            return Ok(match replctl_codec::parse(&text) {
                Ok(value) => Reply::Value(value),
                Err(err) => Reply::DecodeFailed(err),
            });
        }
        Ok(Reply::None)
    }

    /// Run `func(args...)` for its side effect; the result is whatever the
    /// device prints, usually nothing.
    pub fn statement(&mut self, func: &str, args: &[Value]) -> Result<Reply> {
        self.command(&format!("{func}{}", encode_args(args)))
    }

    /// Run `func(args...)` and print its repr so the result always comes
    /// back in literal-decodable form.
    pub fn expression(&mut self, func: &str, args: &[Value]) -> Result<Reply> {
        self.command(&format!("print(repr({func}{}))", encode_args(args)))
    }

    /// Leave raw mode and let the device resume normal operation.
    ///
    /// Fire-and-forget: the device's response is not awaited. Re-sending
    /// is harmless.
    pub fn reset(&mut self) -> Result<()> {
        debug!("sending cooked-mode reset");
        self.transport.write_bytes(&RESET_SEQUENCE)?;
        self.reset_sent = true;
        Ok(())
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Read bytes up to (and consuming) `terminator`.
    ///
    /// Accumulates whatever the transport has into the receive buffer and
    /// tries to split on the terminator, polling until it shows up.
    fn read_segment(&mut self, terminator: &[u8]) -> Result<Vec<u8>> {
        loop {
            if let Some(pos) = find(&self.buf, terminator) {
                let segment = self.buf.split_to(pos).to_vec();
                self.buf.advance(terminator.len());
                return Ok(segment);
            }
            let chunk = self.transport.read_avail()?;
            if chunk.is_empty() {
                self.pause();
            } else {
                self.buf.extend_from_slice(&chunk);
            }
        }
    }

    fn pause(&self) {
        thread::sleep(self.config.poll_delay);
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.config.reset_on_drop && !self.reset_sent {
            if let Err(err) = self.reset() {
                warn!(%err, "failed to send cooked-mode reset at teardown");
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.name())
            .field("buffered", &self.buf.len())
            .field("config", &self.config)
            .finish()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_locates_terminators() {
        assert_eq!(find(b"OK42\x04rest", &[0x04]), Some(4));
        assert_eq!(find(b"err\x04>tail", b"\x04>"), Some(3));
        assert_eq!(find(b"\x04>", b"\x04>"), Some(0));
        assert_eq!(find(b"no terminator", &[0x04]), None);
        assert_eq!(find(b"", &[0x04]), None);
    }

    #[test]
    fn find_ignores_lone_marker_for_two_byte_terminator() {
        // A 0x04 not followed by the prompt is part of the error text.
        assert_eq!(find(b"a\x04b\x04>", b"\x04>"), Some(3));
    }

    #[test]
    fn default_config_matches_protocol_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.handshake_retry, Duration::from_secs(3));
        assert_eq!(config.handshake_deadline, None);
        assert!(config.reset_on_drop);
    }
}
