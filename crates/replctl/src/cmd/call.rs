use replctl_codec::Value;
use replctl_session::{NamePool, Session};

use crate::cmd::{install_interrupt_reset, session_config, CallArgs, DevicePort};
use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::{print_reply, OutputFormat};

/// Binds `func(args...)` to a pooled name, invokes one method on it, and
/// deletes the binding again before exiting.
pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let ctor_args = parse_literals(&args.arg)?;
    let method_args = parse_literals(&args.method_arg)?;

    let config = session_config(&args.device)?;
    let port = DevicePort::open(&args.device)?;
    install_interrupt_reset(&args.device);

    let mut session =
        Session::connect(port, config).map_err(|err| session_error("handshake failed", err))?;

    let pool = NamePool::new();
    let remote = session
        .bind(&pool, &args.func, &ctor_args)
        .map_err(|err| session_error("bind failed", err))?;
    let reply = remote.invoke(&mut session, &args.method, &method_args);
    remote.close(&mut session);

    let reply = reply.map_err(|err| session_error("invoke failed", err))?;
    Ok(print_reply(&reply, format))
}

fn parse_literals(texts: &[String]) -> CliResult<Vec<Value>> {
    texts
        .iter()
        .map(|text| {
            replctl_codec::parse(text)
                .map_err(|err| CliError::new(USAGE, format!("argument is not a literal: {err}")))
        })
        .collect()
}
