use replctl_session::Session;

use crate::cmd::{install_interrupt_reset, session_config, DevicePort, EvalArgs};
use crate::exit::{session_error, CliResult};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: EvalArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args.device)?;
    let port = DevicePort::open(&args.device)?;
    install_interrupt_reset(&args.device);

    let mut session =
        Session::connect(port, config).map_err(|err| session_error("handshake failed", err))?;

    let command = format!("print(repr({}))", args.expr);
    let reply = session
        .command(&command)
        .map_err(|err| session_error("eval failed", err))?;

    Ok(print_reply(&reply, format))
}
