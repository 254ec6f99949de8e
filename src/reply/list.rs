// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parsing of legacy UNIX `LIST` answer lines, used when the server does not
//! support `MLSD`.

use tracing::warn;

use crate::{
    error::FtpError,
    listing::{ContentListing, ContentListingEntry, FileType, Facts},
};

/// Parses a 10-character UNIX permission string (e.g. `drwxr-xr-x`) into
/// `(mode, is_dir)`, where `mode` is the usual three-octal-digit rwx value.
pub fn parse_unix_perm_string(s: &str) -> Result<(u32, bool), FtpError> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return Err(FtpError::Unexpected);
    }
    let is_dir = bytes[0] == b'd';
    let mut mode = 0u32;
    for group in bytes[1..10].chunks(3) {
        let mut bits = 0u32;
        if group[0] == b'r' {
            bits |= 4;
        }
        if group[1] == b'w' {
            bits |= 2;
        }
        if group[2] == b'x' || group[2] == b's' || group[2] == b't' {
            bits |= 1;
        }
        mode = mode * 10 + bits;
    }
    Ok((mode, is_dir))
}

/// Parses a single legacy `ls -l`-style LIST line into `(facts, filename)`.
/// Only the fields the original exposes through `ftpparse()` results are
/// recovered: permissions/type, size, and filename; the original's `mtime`
/// assignment (a raw UNIX timestamp stuffed directly into the date field) is
/// a known bug in the source and is not reproduced here — a LIST line's
/// month/day/time fields are not reliably convertible to a full calendar
/// date without the current year, so `modify` is left unset for legacy LIST
/// entries.
pub fn parse_list_line(line: &str) -> Result<(Facts, String), FtpError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 {
        return Err(FtpError::Unexpected);
    }
    let mut facts = Facts::default();
    if let Ok((mode, is_dir)) = parse_unix_perm_string(fields[0]) {
        facts.unix_mode = Some(mode);
        facts.file_type = Some(if is_dir { FileType::Dir } else { FileType::File });
    }
    facts.size = fields[4].parse().ok();
    // Filename is everything after the first 8 whitespace-delimited fields,
    // rejoined, since filenames may themselves contain spaces. Walk the
    // actual line rather than summing field lengths plus one: `ls -l`
    // column-pads its fields with runs of spaces, not a single separator.
    let mut rest = line;
    for _ in 0..8 {
        rest = rest.trim_start();
        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = &rest[token_end..];
    }
    let filename = rest.trim_start();
    if filename.is_empty() {
        return Err(FtpError::Unexpected);
    }
    Ok((facts, filename.to_string()))
}

/// Parses a complete legacy LIST answer buffer. Tolerates CRLF or bare-LF
/// line separators, warning on the latter for consistency with MLSD
/// handling. Lines this parser cannot make sense of are skipped rather than
/// aborting the whole listing, since legacy servers often prepend a
/// "total N" summary line.
pub fn parse_list_answer(buffer: &str) -> ContentListing {
    let mut listing = ContentListing::default();
    for raw_line in buffer.split('\n') {
        let (line, used_wrong_separator) = match raw_line.strip_suffix('\r') {
            Some(stripped) => (stripped, false),
            None => (raw_line, true),
        };
        if line.trim().is_empty() {
            continue;
        }
        if used_wrong_separator {
            warn!("LIST line not terminated with CRLF: {line:?}");
        }
        if let Ok((facts, filename)) = parse_list_line(line) {
            listing.entries.push(ContentListingEntry { filename, facts });
        }
    }
    listing
}
