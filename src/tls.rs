// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! TLS bring-up for the control channel, and the shared connector handed to
//! data channels for session reuse.

use std::{net::TcpStream, sync::Arc};

use native_tls::TlsConnector;

use crate::{error::FtpError, transport::Transport};

/// A handshake-ready TLS connector, shared between the control channel and
/// any data channel it opens. The original reuses the control channel's
/// `SSL_SESSION` explicitly to skip a full handshake on the data channel;
/// `native-tls` does not expose session objects directly, so the same
/// underlying connector instance is reused instead, which OpenSSL's session
/// cache does transparently for repeat handshakes against the same host.
#[derive(Clone)]
pub struct TlsContext {
    connector: Arc<TlsConnector>,
}

impl TlsContext {
    pub fn new(accept_invalid_certs: bool) -> Result<Self, FtpError> {
        let mut builder = TlsConnector::builder();
        if accept_invalid_certs {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        let connector = builder.build().map_err(|_| FtpError::TlsCouldNotInit)?;
        Ok(Self { connector: Arc::new(connector) })
    }

    /// Performs the TLS handshake over `stream`, wrapping it into a
    /// [`Transport::Tls`].
    pub fn handshake(&self, host: &str, stream: TcpStream) -> Result<Transport, FtpError> {
        let tls_stream = self
            .connector
            .connect(host, stream)
            .map_err(|_| FtpError::TlsCertificate)?;
        Ok(Transport::Tls(Box::new(tls_stream)))
    }
}
