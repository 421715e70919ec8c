//! Session tests against a scripted device simulator.
//!
//! The simulator speaks the device side of the raw-REPL protocol: it
//! answers the interrupt sequence with the raw prompt and each executed
//! command with the next scripted response frame (defaulting to an empty
//! `OK` frame).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use replctl_session::{
    NamePool, Reply, Session, SessionConfig, SessionError, Value,
};
use replctl_transport::{Result as TransportResult, Transport};

const EXECUTE: u8 = 0x04;
const BREAK_BODY: &[u8] = &[0x03, 0x03, 0x01];
const RESET_BODY: &[u8] = &[0x02, 0x03, 0x03];

#[derive(Default)]
struct SimState {
    pending: Vec<u8>,
    partial: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    commands: Vec<String>,
    breaks: usize,
    resets: usize,
    ignore_breaks: usize,
    chunk_limit: Option<usize>,
}

#[derive(Clone)]
struct SimPort {
    state: Rc<RefCell<SimState>>,
}

impl SimPort {
    fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::default())),
        }
    }

    fn push_reply(&self, reply: &[u8]) {
        self.state.borrow_mut().replies.push_back(reply.to_vec());
    }

    fn ignore_breaks(&self, count: usize) {
        self.state.borrow_mut().ignore_breaks = count;
    }

    fn deliver_byte_by_byte(&self) {
        self.state.borrow_mut().chunk_limit = Some(1);
    }

    fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    fn breaks(&self) -> usize {
        self.state.borrow().breaks
    }

    fn resets(&self) -> usize {
        self.state.borrow().resets
    }
}

impl Transport for SimPort {
    fn write_bytes(&mut self, data: &[u8]) -> TransportResult<()> {
        let mut state = self.state.borrow_mut();
        for &byte in data {
            if byte != EXECUTE {
                state.partial.push(byte);
                continue;
            }
            let body = std::mem::take(&mut state.partial);
            if body == BREAK_BODY {
                state.breaks += 1;
                if state.breaks > state.ignore_breaks {
                    state.pending.extend_from_slice(b"raw REPL; CTRL-B to exit\r\n>");
                }
            } else if body == RESET_BODY {
                state.resets += 1;
            } else {
                state
                    .commands
                    .push(String::from_utf8_lossy(&body).into_owned());
                let reply = state
                    .replies
                    .pop_front()
                    .unwrap_or_else(|| b"OK\x04\x04>".to_vec());
                state.pending.extend_from_slice(&reply);
            }
        }
        Ok(())
    }

    fn read_avail(&mut self) -> TransportResult<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        match state.chunk_limit {
            Some(limit) if state.pending.len() > limit => {
                let rest = state.pending.split_off(limit);
                Ok(std::mem::replace(&mut state.pending, rest))
            }
            _ => Ok(std::mem::take(&mut state.pending)),
        }
    }

    fn name(&self) -> &'static str {
        "device-sim"
    }
}

fn quick_config() -> SessionConfig {
    SessionConfig {
        poll_delay: Duration::from_millis(1),
        ..SessionConfig::default()
    }
}

fn connect(port: &SimPort) -> Session<SimPort> {
    Session::connect(port.clone(), quick_config()).expect("handshake should succeed")
}

#[test]
fn empty_ok_frame_yields_no_value() {
    let port = SimPort::new();
    let mut session = connect(&port);
    port.push_reply(b"OK\x04\x04>");
    let reply = session.command("pass").expect("command should succeed");
    assert_eq!(reply, Reply::None);
}

#[test]
fn printed_literal_is_decoded() {
    let port = SimPort::new();
    let mut session = connect(&port);
    port.push_reply(b"OK42\r\n\x04\x04>");
    let reply = session.command("print(repr(42))").expect("command should succeed");
    assert_eq!(reply, Reply::Value(Value::Int(42)));
}

#[test]
fn response_split_into_single_bytes_still_frames() {
    let port = SimPort::new();
    port.deliver_byte_by_byte();
    let mut session = connect(&port);
    port.push_reply(b"OK[1, 2]\r\n\x04\x04>");
    let reply = session.command("print(repr([1,2]))").expect("command should succeed");
    assert_eq!(
        reply,
        Reply::Value(Value::List(vec![Value::Int(1), Value::Int(2)]))
    );
}

#[test]
fn device_traceback_returned_as_data() {
    let port = SimPort::new();
    let mut session = connect(&port);
    port.push_reply(b"OK\x04Traceback (most recent call last):\r\nOSError: boom\r\n\x04>");
    let reply = session.command("1/0").expect("command should succeed");
    match reply {
        Reply::DeviceError(text) => assert!(text.contains("OSError: boom")),
        other => panic!("expected DeviceError, got {other:?}"),
    }
}

#[test]
fn undecodable_output_returned_as_data() {
    let port = SimPort::new();
    let mut session = connect(&port);
    port.push_reply(b"OK<oops>\x04\x04>");
    let reply = session.command("print('<oops>')").expect("command should succeed");
    match reply {
        Reply::DecodeFailed(err) => assert_eq!(err.text, "<oops>"),
        other => panic!("expected DecodeFailed, got {other:?}"),
    }
}

#[test]
fn missing_ok_tag_is_a_protocol_error() {
    let port = SimPort::new();
    let mut session = connect(&port);
    port.push_reply(b"MPY: soft reboot\x04\x04>");
    let err = session.command("pass").unwrap_err();
    assert!(matches!(err, SessionError::Protocol { .. }));
}

#[test]
fn premature_execute_marker_is_a_protocol_error() {
    let port = SimPort::new();
    let mut session = connect(&port);
    port.push_reply(b"\x04OK\x04>");
    let err = session.command("pass").unwrap_err();
    assert!(matches!(err, SessionError::Protocol { .. }));
}

#[test]
fn handshake_resends_break_until_prompt_appears() {
    let port = SimPort::new();
    port.ignore_breaks(1);
    let config = SessionConfig {
        poll_delay: Duration::from_millis(1),
        handshake_retry: Duration::from_millis(20),
        ..SessionConfig::default()
    };
    let session = Session::connect(port.clone(), config).expect("handshake should succeed");
    assert!(port.breaks() >= 2, "break sequence should be re-sent");
    drop(session);
}

#[test]
fn bounded_handshake_gives_up() {
    let port = SimPort::new();
    port.ignore_breaks(usize::MAX);
    let config = SessionConfig {
        poll_delay: Duration::from_millis(1),
        handshake_retry: Duration::from_millis(5),
        handshake_deadline: Some(Duration::from_millis(30)),
        reset_on_drop: false,
    };
    let err = Session::connect(port, config).unwrap_err();
    assert!(matches!(err, SessionError::HandshakeTimeout(_)));
}

#[test]
fn statement_and_expression_spelling() {
    let port = SimPort::new();
    let mut session = connect(&port);
    session
        .statement("machine.freq", &[Value::Int(240)])
        .expect("statement should succeed");
    session
        .expression("os.uname", &[])
        .expect("expression should succeed");
    assert_eq!(
        port.commands(),
        vec![
            "machine.freq(240,)".to_string(),
            "print(repr(os.uname()))".to_string(),
        ]
    );
}

#[test]
fn drop_sends_cooked_mode_reset_once() {
    let port = SimPort::new();
    let session = connect(&port);
    drop(session);
    assert_eq!(port.resets(), 1);
}

#[test]
fn explicit_reset_suppresses_drop_resend() {
    let port = SimPort::new();
    let mut session = connect(&port);
    session.reset().expect("reset should succeed");
    drop(session);
    assert_eq!(port.resets(), 1);
}

#[test]
fn bind_invoke_close_lifecycle() {
    let port = SimPort::new();
    let mut session = connect(&port);
    let pool = NamePool::new();

    let remote = session
        .bind(&pool, "machine.Pin", &[Value::Int(2)])
        .expect("bind should succeed");
    assert_eq!(remote.name(), "_aa");
    assert_eq!(pool.available(), NamePool::CAPACITY - 1);

    port.push_reply(b"OK1\r\n\x04\x04>");
    let reply = remote
        .invoke(&mut session, "value", &[])
        .expect("invoke should succeed");
    assert_eq!(reply, Reply::Value(Value::Int(1)));

    remote.close(&mut session);
    assert_eq!(pool.available(), NamePool::CAPACITY);

    assert_eq!(
        port.commands(),
        vec![
            "_aa=machine.Pin(2,)".to_string(),
            "print(repr(_aa.value()))".to_string(),
            "del _aa".to_string(),
        ]
    );
}

#[test]
fn close_swallows_device_error_and_recycles_name() {
    let port = SimPort::new();
    let mut session = connect(&port);
    let pool = NamePool::new();

    let remote = session
        .bind(&pool, "object", &[])
        .expect("bind should succeed");
    port.push_reply(b"OK\x04NameError: name '_aa' isn't defined\r\n\x04>");
    remote.close(&mut session);

    assert_eq!(pool.available(), NamePool::CAPACITY);
    let deletes = port
        .commands()
        .iter()
        .filter(|cmd| cmd.as_str() == "del _aa")
        .count();
    assert_eq!(deletes, 1);
}

#[test]
fn drop_without_close_recycles_name_but_sends_no_delete() {
    let port = SimPort::new();
    let mut session = connect(&port);
    let pool = NamePool::new();

    let remote = session
        .bind(&pool, "object", &[])
        .expect("bind should succeed");
    drop(remote);

    assert_eq!(pool.available(), NamePool::CAPACITY);
    assert!(port.commands().iter().all(|cmd| !cmd.starts_with("del ")));
}

#[test]
fn bind_error_surfaces_immediately_and_frees_name() {
    let port = SimPort::new();
    let mut session = connect(&port);
    let pool = NamePool::new();

    port.push_reply(b"OK\x04NameError: name 'nope' isn't defined\r\n\x04>");
    let err = session.bind(&pool, "nope", &[]).unwrap_err();
    assert!(matches!(err, SessionError::BindFailed(_)));
    assert_eq!(pool.available(), NamePool::CAPACITY);
}

#[test]
fn pool_exhaustion_fails_the_677th_bind() {
    let port = SimPort::new();
    let mut session = connect(&port);
    let pool = NamePool::new();

    let mut remotes = Vec::with_capacity(NamePool::CAPACITY);
    for _ in 0..NamePool::CAPACITY {
        remotes.push(
            session
                .bind(&pool, "object", &[])
                .expect("bind should succeed while names remain"),
        );
    }
    assert_eq!(pool.available(), 0);

    let err = session.bind(&pool, "object", &[]).unwrap_err();
    assert!(matches!(err, SessionError::PoolExhausted));

    remotes
        .pop()
        .expect("remotes should not be empty")
        .close(&mut session);
    assert_eq!(pool.available(), 1);
    session
        .bind(&pool, "object", &[])
        .expect("bind should succeed after a close");
}
