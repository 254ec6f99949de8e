// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The control-channel background reader: a thread that reads CRLF-framed
//! lines from the server, classifies each as a reply signal, and terminates
//! itself once a line matches one of the foreground's armed triggers (or is
//! an error reply). The foreground synchronizes with it by joining its
//! handle, then re-spawns a fresh thread before issuing the next command.

use std::{
    io::Read,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{
    buffer::ByteBuffer,
    error::FtpError,
    reply::signal,
    tls::TlsContext,
    transport::Transport,
};

/// Connection lifecycle state, mirroring the original's `ftp_status` enum.
/// `AsyncWaiting` exists for data-model parity with the original but is
/// never reached: this crate does not expose a non-blocking wait API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Down,
    Up,
    Connecting,
    Waiting,
    AsyncWaiting,
}

const MAX_TRIGGERS: usize = 10;
const NO_TRIGGER: u16 = 0;

/// Internal, mutex-guarded state mutated by both the reader thread and the
/// foreground.
pub(crate) struct Vars {
    pub status: Status,
    pub last_signal: i32,
    pub internal_error: bool,
    pub last_answer_lock: Option<u16>,
    pub last_answer_buffer: Option<ByteBuffer>,
    pub triggers: [u16; MAX_TRIGGERS],
    pub error: Option<FtpError>,
    pub wait_start: Option<Instant>,
    pub timeout: Duration,
}

impl Vars {
    fn new(timeout: Duration) -> Self {
        Self {
            status: Status::Down,
            last_signal: 0,
            internal_error: false,
            last_answer_lock: None,
            last_answer_buffer: None,
            triggers: [NO_TRIGGER; MAX_TRIGGERS],
            error: None,
            wait_start: None,
            timeout,
        }
    }

    fn has_triggers(&self) -> bool {
        self.triggers[0] != NO_TRIGGER
    }

    fn is_trigger(&self, signal: i32) -> bool {
        if signal < 0 || signal > u16::MAX as i32 {
            return false;
        }
        let signal = signal as u16;
        self.triggers.iter().take_while(|&&t| t != NO_TRIGGER).any(|&t| t == signal)
    }
}

/// The socket timeout the reader uses on its byte-at-a-time reads: short
/// enough to notice a wait timeout promptly without busy-looping.
const INTERNAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared state for one control channel. Owned by a `Session`/`DataChannel`
/// pair; cloned as an `Arc` into the reader thread.
pub(crate) struct ControlState {
    pub transport: Mutex<Transport>,
    pub vars: Mutex<Vars>,
    /// Held by the reader while it is processing a received line, so the
    /// foreground can observe "no message is mid-processing" without a
    /// dedicated channel.
    pub processing_lock: Mutex<()>,
    pub disable_input_thread: AtomicBool,
    pub termination: AtomicBool,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ControlState {
    pub fn new(transport: Transport, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            transport: Mutex::new(transport),
            vars: Mutex::new(Vars::new(timeout)),
            processing_lock: Mutex::new(()),
            disable_input_thread: AtomicBool::new(false),
            termination: AtomicBool::new(false),
            reader_handle: Mutex::new(None),
        })
    }

    pub fn status(&self) -> Status {
        #[allow(clippy::unwrap_used)]
        self.vars.lock().unwrap().status
    }

    pub fn set_status(&self, status: Status) {
        #[allow(clippy::unwrap_used)]
        let mut vars = self.vars.lock().unwrap();
        vars.status = status;
    }

    pub fn set_error(&self, error: Option<FtpError>) {
        #[allow(clippy::unwrap_used)]
        let mut vars = self.vars.lock().unwrap();
        vars.error = error;
    }

    pub fn take_error(&self) -> Option<FtpError> {
        #[allow(clippy::unwrap_used)]
        self.vars.lock().unwrap().error.clone()
    }

    /// Arms the given reply codes as triggers (at most [`MAX_TRIGGERS`]) and,
    /// optionally, one of them as the answer-lock code whose payload should
    /// be captured.
    pub fn arm_triggers(&self, codes: &[u16], answer_lock: Option<u16>) {
        #[allow(clippy::unwrap_used)]
        let mut vars = self.vars.lock().unwrap();
        let mut triggers = [NO_TRIGGER; MAX_TRIGGERS];
        for (slot, code) in triggers.iter_mut().zip(codes.iter()) {
            *slot = *code;
        }
        vars.triggers = triggers;
        vars.last_answer_lock = answer_lock;
        vars.last_answer_buffer = None;
    }

    fn reset_triggers(&self, vars: &mut Vars) {
        vars.triggers = [NO_TRIGGER; MAX_TRIGGERS];
        vars.last_answer_lock = None;
    }

    /// Takes and clears the payload captured for the armed answer-lock code,
    /// if any was received.
    pub fn take_answer_buffer(&self) -> Option<ByteBuffer> {
        #[allow(clippy::unwrap_used)]
        self.vars.lock().unwrap().last_answer_buffer.take()
    }

    pub fn last_signal(&self) -> i32 {
        #[allow(clippy::unwrap_used)]
        self.vars.lock().unwrap().last_signal
    }

    /// Spawns the background reader thread. Must not be called while one is
    /// already running.
    pub fn spawn_reader(self: &Arc<Self>) {
        let state = Arc::clone(self);
        #[allow(clippy::unwrap_used)]
        let mut handle_slot = self.reader_handle.lock().unwrap();
        *handle_slot = Some(std::thread::spawn(move || run_reader(state)));
    }

    /// Arms `codes` (and, if given, an answer-lock), then waits for the
    /// reader to observe a trigger or error signal. On return, triggers are
    /// reset and (unless the input thread is disabled) a fresh reader thread
    /// is already running for the next wait cycle.
    pub fn wait_for_triggers(self: &Arc<Self>, codes: &[u16], answer_lock: Option<u16>) -> Result<(), FtpError> {
        {
            #[allow(clippy::unwrap_used)]
            let mut vars = self.vars.lock().unwrap();
            if vars.status != Status::Up && vars.status != Status::Connecting {
                return Err(FtpError::NotReady);
            }
            vars.status = Status::Waiting;
            vars.error = None;
            vars.wait_start = Some(Instant::now());
        }
        self.arm_triggers(codes, answer_lock);

        let handle = {
            #[allow(clippy::unwrap_used)]
            self.reader_handle.lock().unwrap().take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                self.set_error(Some(FtpError::Thread));
            }
        }

        let result = {
            #[allow(clippy::unwrap_used)]
            let mut vars = self.vars.lock().unwrap();
            let result = match &vars.error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            };
            self.reset_triggers(&mut vars);
            vars.status = Status::Up;
            result
        };

        if !self.disable_input_thread.load(Ordering::SeqCst) {
            self.spawn_reader();
        }

        result
    }

    /// Writes a raw, already CRLF-terminated line to the control socket.
    pub fn write_line(&self, line: &str) -> Result<(), FtpError> {
        use std::io::Write;
        #[allow(clippy::unwrap_used)]
        let mut transport = self.transport.lock().unwrap();
        transport.write_all(line.as_bytes()).map_err(FtpError::from)
    }

    /// Writes `cmd [arg]...` followed by CRLF.
    pub fn send_command(&self, cmd: &str, args: &[&str]) -> Result<(), FtpError> {
        let mut line = String::from(cmd);
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line.push_str("\r\n");
        self.write_line(&line)
    }

    /// The central request/reply primitive (§4.4.2 `send_and_wait`): write
    /// the command, wait for a trigger or error, and return the reply code
    /// observed. Only a local/transport-level failure surfaces as `Err`; a
    /// remote error reply (4xx/5xx) is returned as `Ok(code)` for the caller
    /// to classify, since the correct [`FtpError`] kind depends on which
    /// operation was attempted.
    pub fn send_and_wait(
        self: &Arc<Self>,
        cmd: &str,
        args: &[&str],
        triggers: &[u16],
        answer_lock: Option<u16>,
    ) -> Result<i32, FtpError> {
        self.send_command(cmd, args)?;
        self.wait_for_triggers(triggers, answer_lock)?;
        Ok(self.last_signal())
    }

    /// Negotiates TLS on the control channel in place, reusing `tls` (see
    /// [`Transport::take_for_tls_upgrade`]). Caller must already have
    /// disabled reader auto-restart and joined the previous reader via
    /// `wait_for_triggers` before calling this.
    pub fn upgrade_to_tls(&self, tls: &TlsContext, host: &str) -> Result<(), FtpError> {
        let tcp = {
            #[allow(clippy::unwrap_used)]
            let mut transport = self.transport.lock().unwrap();
            transport.take_for_tls_upgrade()?
        };
        let wrapped = tls.handshake(host, tcp)?;
        #[allow(clippy::unwrap_used)]
        let mut transport = self.transport.lock().unwrap();
        transport.install(wrapped);
        Ok(())
    }
}

/// Reads the control socket, CRLF-framing lines, until termination, a
/// socket error, or a line matching an armed trigger/error signal.
fn run_reader(state: Arc<ControlState>) {
    let mut message = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        if state.termination.load(Ordering::SeqCst) {
            break;
        }

        let read_result = {
            #[allow(clippy::unwrap_used)]
            let mut transport = state.transport.lock().unwrap();
            if let Err(e) = transport.set_read_timeout(Some(INTERNAL_TIMEOUT)) {
                state.set_error(Some(e));
                break;
            }
            transport.read(&mut byte)
        };

        match read_result {
            Ok(1) => {
                let current = byte[0];
                if current == b'\n' {
                    continue;
                }
                if current == b'\r' {
                    let next = {
                        #[allow(clippy::unwrap_used)]
                        let mut transport = state.transport.lock().unwrap();
                        let mut next_byte = [0u8; 1];
                        transport.read(&mut next_byte).map(|n| (n, next_byte[0]))
                    };
                    match next {
                        Ok((1, b'\n')) => {},
                        _ => {
                            warn!("control channel received CR not followed by LF");
                            state.set_error(Some(FtpError::Unexpected));
                            break;
                        },
                    }

                    #[allow(clippy::unwrap_used)]
                    let _processing = state.processing_lock.lock().unwrap();
                    let stop = process_line(&state, &message);
                    message.clear();
                    drop(_processing);
                    if stop {
                        break;
                    }
                } else {
                    message.push(current);
                }
            },
            Ok(_) => {
                if state.termination.load(Ordering::SeqCst) {
                    break;
                }
            },
            Err(e) => {
                let kind = e.kind();
                if kind == std::io::ErrorKind::WouldBlock || kind == std::io::ErrorKind::TimedOut {
                    #[allow(clippy::unwrap_used)]
                    let vars = state.vars.lock().unwrap();
                    if vars.status == Status::Waiting {
                        if let Some(start) = vars.wait_start {
                            if start.elapsed() > vars.timeout {
                                drop(vars);
                                warn!("control channel timed out waiting for a reply");
                                state.set_error(Some(FtpError::Timeout));
                                break;
                            }
                        }
                    }
                    continue;
                }
                if state.termination.load(Ordering::SeqCst) {
                    break;
                }
                state.set_error(Some(FtpError::from(e)));
                break;
            },
        }
    }
}

/// Classifies one complete line and updates shared state. Returns `true` if
/// the reader thread must now terminate: either the line matched an armed
/// trigger, or it was itself an error reply.
fn process_line(state: &Arc<ControlState>, line: &[u8]) -> bool {
    if line.len() < 3 {
        return false;
    }
    let code = signal::classify(line);
    if code == signal::MALFORMED {
        return false;
    }

    debug!(code, "received control reply");

    #[allow(clippy::unwrap_used)]
    let mut vars = state.vars.lock().unwrap();
    vars.last_signal = code;
    let is_error = signal::is_error(code);
    if is_error {
        vars.internal_error = true;
    }

    if let Some(lock_code) = vars.last_answer_lock {
        if lock_code as i32 == code {
            if vars.last_answer_buffer.is_some() {
                warn!("answer-lock buffer already populated, overwriting");
            }
            let payload_start = line.len().min(4);
            vars.last_answer_buffer = Some(ByteBuffer::from(&line[payload_start..]));
        }
    }

    if vars.has_triggers() && (is_error || vars.is_trigger(code)) {
        return true;
    }

    false
}
