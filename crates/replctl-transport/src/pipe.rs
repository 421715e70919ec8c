use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::thread;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Transport, WRITE_RETRY_DELAY};

const READ_CHUNK_SIZE: usize = 512;

/// Transport over an already-open read/write descriptor pair.
///
/// Covers the process-attached case: the device console arrives on this
/// process's stdin and commands leave on stdout, or on any other pair of
/// inherited descriptors. The read side is switched to `O_NONBLOCK` so
/// `read_avail` never stalls the session.
pub struct FdPair {
    reader: File,
    writer: File,
}

impl FdPair {
    /// Wrap a read fd and a write fd.
    pub fn new(read_fd: OwnedFd, write_fd: OwnedFd) -> Result<Self> {
        set_nonblocking(&read_fd)?;
        Ok(Self {
            reader: File::from(read_fd),
            writer: File::from(write_fd),
        })
    }

    /// Attach to this process's stdin/stdout (duplicated descriptors).
    pub fn stdio() -> Result<Self> {
        let read_fd = std::io::stdin().as_fd().try_clone_to_owned()?;
        let write_fd = std::io::stdout().as_fd().try_clone_to_owned()?;
        debug!("attached to stdio descriptors");
        Self::new(read_fd, write_fd)
    }
}

impl Transport for FdPair {
    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.writer.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // Peer not draining yet; back off before retrying.
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        match self.writer.flush() {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn read_avail(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.reader.read(&mut chunk) {
                // EOF on a pipe means the other end is gone for good.
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "fd-pair"
    }
}

impl std::fmt::Debug for FdPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdPair")
            .field("read_fd", &self.reader.as_raw_fd())
            .field("write_fd", &self.writer.as_raw_fd())
            .finish()
    }
}

fn set_nonblocking(fd: &OwnedFd) -> Result<()> {
    // SAFETY: `fd` is an open descriptor owned by the caller for the
    // duration of both calls.
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) };
    if flags < 0 {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }
    let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
