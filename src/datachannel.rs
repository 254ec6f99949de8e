// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Passive-mode data channel negotiation (EPSV with PASV fallback), and the
//! resulting socket used for transfers and directory listings.

use std::{
    io::{Read, Write},
    net::TcpStream,
    time::Duration,
};

use tracing::{debug, warn};

use crate::{
    buffer::ByteBuffer,
    error::FtpError,
    reader::ControlState,
    reply::{parse, signal},
    tls::TlsContext,
    transport::Transport,
};

const STANDARD_TIMEOUT: Duration = Duration::from_secs(60);

/// An established data-channel socket, optionally upgraded to TLS.
pub struct DataChannel {
    transport: Transport,
}

impl DataChannel {
    /// Negotiates a passive-mode port on the control channel and connects to
    /// it. Tries `EPSV` first when enabled, falling back to `PASV` if the
    /// server rejects `EPSV` with a remote error (not a local/timeout
    /// error).
    pub fn establish(
        state: &std::sync::Arc<ControlState>,
        host: &str,
        use_epsv: bool,
    ) -> Result<(Self, bool), FtpError> {
        if state.status() != crate::reader::Status::Up {
            return Err(FtpError::NotReady);
        }

        let (port, still_use_epsv) = if use_epsv {
            match enter_epsv(state) {
                Ok(port) => (port, true),
                // Only a remote rejection (surfaced as `Unexpected` by
                // `check_not_error`) triggers the PASV fallback; a local
                // transport/timeout failure is not the server's doing and is
                // propagated as-is.
                Err(FtpError::Unexpected) => {
                    debug!("EPSV rejected by server, falling back to PASV");
                    (enter_pasv(state)?, false)
                },
                Err(e) => return Err(e),
            }
        } else {
            (enter_pasv(state)?, false)
        };

        let socket = TcpStream::connect((host, port)).map_err(FtpError::from)?;
        socket.set_read_timeout(Some(STANDARD_TIMEOUT)).map_err(FtpError::from)?;
        socket.set_write_timeout(Some(STANDARD_TIMEOUT)).map_err(FtpError::from)?;

        Ok((Self { transport: Transport::Plain(socket) }, still_use_epsv))
    }

    /// Upgrades the data channel to TLS, reusing the control channel's TLS
    /// context (and, with it, OpenSSL's session cache) to avoid a full
    /// handshake.
    pub fn upgrade_to_tls(&mut self, tls: &TlsContext, host: &str) -> Result<(), FtpError> {
        let plain = match std::mem::replace(
            &mut self.transport,
            Transport::Plain(crate::transport::placeholder_stream()?),
        ) {
            Transport::Plain(stream) => stream,
            Transport::Tls(_) => return Err(FtpError::Already),
        };
        self.transport = tls.handshake(host, plain)?;
        Ok(())
    }

    pub fn read_to_end(&mut self) -> Result<ByteBuffer, FtpError> {
        let mut buf = Vec::new();
        self.transport.read_to_end(&mut buf).map_err(FtpError::from)?;
        Ok(ByteBuffer::from(buf))
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FtpError> {
        self.transport.read(buf).map_err(FtpError::from)
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), FtpError> {
        self.transport.write_all(buf).map_err(FtpError::from)
    }

    pub fn close(self) {
        let _ = self.transport.shutdown();
    }
}

fn enter_pasv(state: &std::sync::Arc<ControlState>) -> Result<u16, FtpError> {
    let code = state.send_and_wait(
        "PASV",
        &[],
        &[signal::ENTERING_PASSIVE_MODE],
        Some(signal::ENTERING_PASSIVE_MODE),
    )?;
    check_not_error(code)?;

    let answer = state.take_answer_buffer().ok_or(FtpError::Unexpected)?;
    let answer = String::from_utf8_lossy(&answer);
    let inner = parse::extract_parenthesized(&answer, 1200)?;
    let (_ip, hi, lo) = parse::parse_pasv(inner)?;
    Ok(parse::pasv_port(hi, lo))
}

fn enter_epsv(state: &std::sync::Arc<ControlState>) -> Result<u16, FtpError> {
    let code = state.send_and_wait(
        "EPSV",
        &[],
        &[signal::ENTERING_EXTENDED_PASSIVE_MODE],
        Some(signal::ENTERING_EXTENDED_PASSIVE_MODE),
    )?;
    check_not_error(code)?;

    let answer = state.take_answer_buffer().ok_or(FtpError::Unexpected)?;
    let answer = String::from_utf8_lossy(&answer);
    let inner = parse::extract_parenthesized(&answer, 1200)?;
    parse::parse_epsv(inner)
}

fn check_not_error(code: i32) -> Result<(), FtpError> {
    if signal::is_error(code) {
        warn!("server rejected data-connection negotiation command");
        return Err(FtpError::Unexpected);
    }
    Ok(())
}
