use replctl_session::RESET_SEQUENCE;
use replctl_transport::Transport;
use tracing::info;

use crate::cmd::{DevicePort, ResetArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};

/// Writes the soft-reset sequence directly, without handshaking first:
/// the whole point is to recover a device whose state is unknown.
pub fn run(args: ResetArgs) -> CliResult<i32> {
    let mut port = DevicePort::open(&args.device)?;
    port.write_bytes(&RESET_SEQUENCE)
        .map_err(|err| transport_error("reset failed", err))?;
    info!("soft-reset sequence sent");
    Ok(SUCCESS)
}
