use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;

use nix::sys::termios::{self, BaudRate, SetArg, SpecialCharacterIndices};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, WRITE_RETRY_DELAY};

const READ_CHUNK_SIZE: usize = 512;

/// Serial tty transport.
///
/// Opens the device in non-blocking raw mode at the requested baud rate and
/// clears DTR/RTS so boards that wire those lines to reset/bootloader pins
/// are not held down while the session runs.
pub struct TtyPort {
    file: File,
    path: PathBuf,
}

impl TtyPort {
    /// Default baud rate for MicroPython-style boards.
    pub const DEFAULT_BAUD: u32 = 115_200;

    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        configure_raw(&file, baud).map_err(|e| TransportError::Configure {
            path: path.clone(),
            source: e,
        })?;
        clear_modem_lines(&file);

        info!(?path, baud, "opened serial port");

        Ok(Self { file, path })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for TtyPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.file.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // Output buffer full; give the line time to drain.
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn read_avail(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.file.read(&mut chunk) {
                // VMIN=0: a zero-length read on a tty means no pending input.
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "serial-tty"
    }
}

impl std::fmt::Debug for TtyPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyPort").field("path", &self.path).finish()
    }
}

fn configure_raw(file: &File, baud: u32) -> std::io::Result<()> {
    let mut tio = termios::tcgetattr(file)?;
    termios::cfmakeraw(&mut tio);
    termios::cfsetspeed(&mut tio, baud_rate(baud)?)?;
    // Reads return immediately with whatever is buffered.
    tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    termios::tcsetattr(file, SetArg::TCSANOW, &tio)?;
    Ok(())
}

/// Drop DTR and RTS after open.
///
/// Some boards route these lines to reset; leaving them asserted reboots
/// the interpreter mid-session.
fn clear_modem_lines(file: &File) {
    let bits: libc::c_int = libc::TIOCM_DTR | libc::TIOCM_RTS;
    // SAFETY: the fd is an open tty descriptor owned by `file`, and `bits`
    // is a valid pointer for the duration of the call.
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            libc::TIOCMBIC,
            std::ptr::addr_of!(bits),
        )
    };
    if rc != 0 {
        debug!("TIOCMBIC not supported on this port; leaving modem lines as-is");
    }
}

fn baud_rate(baud: u32) -> std::io::Result<BaudRate> {
    let rate = match baud {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        _ => {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("unsupported baud rate: {baud}"),
            ))
        }
    };
    Ok(rate)
}
