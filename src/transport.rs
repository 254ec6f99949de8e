// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The socket abstraction shared by the control channel and data channels:
//! a plain TCP stream, or one wrapped in a TLS session.

use std::{
    io::{self, Read, Write},
    net::TcpStream,
    time::Duration,
};

use native_tls::TlsStream;

use crate::error::FtpError;

/// Either a raw TCP stream or one already wrapped in TLS. Both variants
/// expose the same small surface the engine needs, so callers never need to
/// match on which kind of connection they hold.
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), FtpError> {
        self.tcp_ref().set_read_timeout(timeout).map_err(FtpError::from)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<(), FtpError> {
        self.tcp_ref().set_write_timeout(timeout).map_err(FtpError::from)
    }

    pub fn shutdown(&self) -> Result<(), FtpError> {
        self.tcp_ref().shutdown(std::net::Shutdown::Both).map_err(FtpError::from)
    }

    pub fn peer_addr(&self) -> Result<std::net::SocketAddr, FtpError> {
        self.tcp_ref().peer_addr().map_err(FtpError::from)
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    fn tcp_ref(&self) -> &TcpStream {
        match self {
            Transport::Plain(stream) => stream,
            Transport::Tls(stream) => stream.get_ref(),
        }
    }

    /// Swaps out the underlying plain `TcpStream`, leaving a throwaway
    /// placeholder in its place, so the caller can move the real stream into
    /// a TLS handshake without fighting the borrow checker through a
    /// `Mutex`. Fails if the transport is already TLS-wrapped.
    pub(crate) fn take_for_tls_upgrade(&mut self) -> Result<TcpStream, FtpError> {
        if self.is_tls() {
            return Err(FtpError::Already);
        }
        let placeholder = Transport::Plain(placeholder_stream()?);
        match std::mem::replace(self, placeholder) {
            Transport::Plain(stream) => Ok(stream),
            Transport::Tls(_) => Err(FtpError::Already),
        }
    }

    /// Installs a freshly-negotiated transport (typically the TLS-wrapped
    /// result of [`Transport::take_for_tls_upgrade`]).
    pub(crate) fn install(&mut self, transport: Transport) {
        *self = transport;
    }
}

/// A connected loopback socket used only as a transient placeholder while a
/// real socket is mid-swap (see [`Transport::take_for_tls_upgrade`]); never
/// read from or written to.
pub(crate) fn placeholder_stream() -> Result<TcpStream, FtpError> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").map_err(FtpError::from)?;
    let addr = listener.local_addr().map_err(FtpError::from)?;
    TcpStream::connect(addr).map_err(FtpError::from)
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.write(buf),
            Transport::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush(),
            Transport::Tls(stream) => stream.flush(),
        }
    }
}
