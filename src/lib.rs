// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A synchronous FTP/FTPS client library core: control-channel I/O engine,
//! passive-mode data channel negotiation, a sibling-connection pool for
//! concurrent transfers, and the `Session`/`FileHandle` public API built on
//! top of them.

pub mod buffer;
pub mod cfg;
pub mod client;
pub mod datachannel;
pub mod date;
pub mod error;
pub mod listing;
pub mod reader;
pub mod reply;
pub mod tls;
pub mod transport;
pub mod utils;

pub use cfg::{
    config::ClientConfig,
    enums::{Direction, OpenPosition, Security},
};
pub use client::{file::FileHandle, session::Session};
pub use date::Date;
pub use error::{FtpError, Result};
pub use listing::{ContentListing, ContentListingEntry, FileType};
