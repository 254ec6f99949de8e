// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io;

use thiserror::Error;

/// The error taxonomy of the core, matching the kinds distinguished by the
/// reply/translation tables rather than by Rust type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtpError {
    #[error("socket error")]
    Socket,
    #[error("could not allocate")]
    CouldNotAllocate,
    #[error("could not open socket")]
    CouldNotOpenSocket,
    #[error("host not found")]
    Host,
    #[error("connection failed")]
    Connection,
    #[error("no service")]
    NoService,
    #[error("wrong username or password")]
    WrongAuth,
    #[error("security negotiation failed")]
    Security,
    #[error("thread error")]
    Thread,

    #[error("connection not ready")]
    NotReady,
    #[error("timed out waiting for a server reply")]
    Timeout,

    #[error("write failed")]
    Write,

    #[error("unexpected server reply")]
    Unexpected,
    #[error("reply too long")]
    TooLong,
    #[error("not permitted")]
    NotPermitted,
    #[error("not found")]
    NotFound,
    #[error("not found or not empty")]
    NotFoundOrNotEmpty,
    #[error("invalid argument")]
    Invalid,
    #[error("server does not support the required capability")]
    ServerCapabilities,

    #[error("already in the requested state")]
    Already,
    #[error("invalid arguments")]
    Arguments,
    #[error("not supported")]
    NotSupported,

    #[error("TLS could not be initialized")]
    TlsCouldNotInit,
    #[error("TLS certificate error")]
    TlsCertificate,
}

impl From<io::Error> for FtpError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FtpError::Timeout,
            io::ErrorKind::NotConnected | io::ErrorKind::ConnectionReset => {
                FtpError::Connection
            },
            _ => FtpError::Socket,
        }
    }
}

pub type Result<T> = std::result::Result<T, FtpError>;
