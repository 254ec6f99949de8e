// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Pure, I/O-free parsers for the payload of specific server replies.

use crate::error::FtpError;

/// Returns the substring strictly between the first `(` and the last `)` in
/// `line`. An empty payload between the brackets is [`FtpError::Unexpected`].
pub fn extract_parenthesized(line: &str, maxlen: usize) -> Result<&str, FtpError> {
    let open = line.find('(').ok_or(FtpError::Unexpected)?;
    let close = line.rfind(')').ok_or(FtpError::Unexpected)?;
    if open >= close {
        return Err(FtpError::Unexpected);
    }
    let inner = &line[open + 1..close];
    if inner.is_empty() {
        return Err(FtpError::Unexpected);
    }
    if inner.len() > maxlen {
        return Err(FtpError::TooLong);
    }
    Ok(inner)
}

/// Parses a `PASV` payload of six comma-separated decimal integers into
/// `(ip[4], port_hi, port_lo)`.
pub fn parse_pasv(payload: &str) -> Result<([u8; 4], u8, u8), FtpError> {
    let parts: Vec<&str> = payload.split(',').map(str::trim).collect();
    if parts.len() < 6 {
        return Err(FtpError::Unexpected);
    }
    let mut values = [0u8; 6];
    for (slot, part) in values.iter_mut().zip(parts.iter()) {
        *slot = part.parse::<u16>().map_err(|_| FtpError::Unexpected)? as u8;
    }
    Ok(([values[0], values[1], values[2], values[3]], values[4], values[5]))
}

/// Combines a PASV `(hi, lo)` pair into a TCP port.
pub fn pasv_port(hi: u8, lo: u8) -> u16 {
    256 * u16::from(hi) + u16::from(lo)
}

/// Parses an `EPSV` payload already stripped of its surrounding
/// parentheses, e.g. `|||49920|`.
pub fn parse_epsv(payload: &str) -> Result<u16, FtpError> {
    let delimiter = payload.chars().next().ok_or(FtpError::Unexpected)?;
    let rest = &payload[delimiter.len_utf8()..];
    let fields: Vec<&str> = rest.split(delimiter).collect();
    // fields[0] and fields[1] are the (ignored) network protocol and address;
    // fields[2] is the port. A trailing delimiter yields a trailing empty
    // field, which is tolerated.
    if fields.len() < 3 {
        return Err(FtpError::Unexpected);
    }
    fields[2].parse::<u16>().map_err(|_| FtpError::Unexpected)
}

/// Extracts the path from a `257 "path" is the current directory` reply: the
/// substring between the first and second ASCII double-quote.
pub fn parse_pwd_path(line: &str) -> Result<&str, FtpError> {
    let mut quotes = line.match_indices('"');
    let (start, _) = quotes.next().ok_or(FtpError::Unexpected)?;
    let (end, _) = quotes.next().ok_or(FtpError::Unexpected)?;
    if end <= start + 1 {
        return Err(FtpError::Unexpected);
    }
    Ok(&line[start + 1..end])
}
