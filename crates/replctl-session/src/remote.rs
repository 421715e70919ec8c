use replctl_codec::Value;
use replctl_transport::Transport;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::pool::NamePool;
use crate::session::{Reply, Session};

impl<T: Transport> Session<T> {
    /// Evaluate `func(args...)` on the device and bind the result under a
    /// fresh short name, returning a proxy for it.
    ///
    /// A device error during the bind is surfaced here, not deferred; the
    /// checked-out name goes straight back to the pool in that case.
    pub fn bind(&mut self, pool: &NamePool, func: &str, args: &[Value]) -> Result<Remote> {
        let name = pool.checkout().ok_or(SessionError::PoolExhausted)?;
        match self.statement(&format!("{name}={func}"), args) {
            Ok(Reply::DeviceError(text)) => {
                pool.release(name);
                Err(SessionError::BindFailed(text))
            }
            Ok(_) => {
                debug!(%name, func, "bound remote value");
                Ok(Remote::new(name, pool.clone()))
            }
            Err(err) => {
                pool.release(name);
                Err(err)
            }
        }
    }
}

/// Handle to a value living in device memory.
///
/// Holds the short name the value is bound under. Call [`Remote::close`]
/// on every exit path to delete the device-side binding; dropping without
/// closing recycles the name (preserving the pool invariant) but leaves
/// the binding on the device until the next reset.
pub struct Remote {
    name: String,
    pool: NamePool,
    closed: bool,
}

impl Remote {
    fn new(name: String, pool: NamePool) -> Self {
        Self {
            name,
            pool,
            closed: false,
        }
    }

    /// The remote name this proxy is bound under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke `<name>.<method>(args...)` and decode the result.
    pub fn invoke<T: Transport>(
        &self,
        session: &mut Session<T>,
        method: &str,
        args: &[Value],
    ) -> Result<Reply> {
        session.expression(&format!("{}.{}", self.name, method), args)
    }

    /// Delete the device-side binding and recycle the name.
    ///
    /// Best-effort: cleanup never raises. A device or session failure is
    /// logged and the name is recycled regardless.
    pub fn close<T: Transport>(mut self, session: &mut Session<T>) {
        self.release(session);
    }

    fn release<T: Transport>(&mut self, session: &mut Session<T>) {
        if self.closed {
            return;
        }
        self.closed = true;
        match session.command(&format!("del {}", self.name)) {
            Ok(Reply::DeviceError(text)) => {
                warn!(name = %self.name, %text, "device reported an error deleting remote binding");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(name = %self.name, %err, "failed to delete remote binding");
            }
        }
        self.pool.release(self.name.clone());
    }
}

impl Drop for Remote {
    fn drop(&mut self) {
        if !self.closed {
            debug!(
                name = %self.name,
                "remote dropped without close; device-side binding persists until reset"
            );
            self.pool.release(self.name.clone());
        }
    }
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote").field("name", &self.name).finish()
    }
}
