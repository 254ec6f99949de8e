// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Transport security requested for a control connection.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plain, unencrypted control channel.
    #[default]
    #[serde(rename = "none", alias = "None", alias = "NONE")]
    None,
    /// Explicit FTPS: `AUTH TLS` negotiated after the greeting, `PBSZ 0` /
    /// `PROT P` before data transfers.
    #[serde(rename = "explicit_tls", alias = "ExplicitTls", alias = "explicit")]
    ExplicitTls,
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Security::None => "none",
            Security::ExplicitTls => "explicit_tls",
        })
    }
}

/// `TYPE` negotiated on the control channel for the next data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    #[default]
    Undefined,
    Ascii,
    Binary,
}

impl TransferType {
    /// The `TYPE` argument letter, or `None` if no `TYPE` has been set yet.
    pub fn type_letter(self) -> Option<&'static str> {
        match self {
            TransferType::Undefined => None,
            TransferType::Ascii => Some("A"),
            TransferType::Binary => Some("I"),
        }
    }
}

/// Direction of a file handle opened by `Session::fopen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Where a `STOR`/`RETR` transfer should begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPosition {
    /// Start from byte 0; no `REST` is sent.
    Start,
    /// Send `REST <offset>` before `STOR`/`RETR`.
    Resume(u64),
    /// Store via `APPE` instead of `STOR` (read handles ignore this).
    Append,
}
