// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parsing of `MLSD`/`MLST` answer lines into per-entry facts.

use tracing::warn;

use crate::{
    date::Date,
    error::FtpError,
    listing::{ContentListing, ContentListingEntry, FileType, Facts},
};

/// Parses one fact (`key=value`) into `facts`. Unrecognized keys are
/// silently ignored; a malformed fact (no `=`) is an error that aborts the
/// whole line.
fn apply_fact(fact: &str, facts: &mut Facts) -> Result<(), FtpError> {
    let (key, value) = fact.split_once('=').ok_or(FtpError::Unexpected)?;
    match key.to_ascii_lowercase().as_str() {
        "size" => {
            facts.size = Some(value.parse().map_err(|_| FtpError::Unexpected)?);
        },
        "modify" => {
            if value.len() < 14 {
                return Err(FtpError::Unexpected);
            }
            facts.modify = Some(Date::from_mlsd_string(value)?);
        },
        "create" => {
            if value.len() < 14 {
                return Err(FtpError::Unexpected);
            }
            facts.create = Some(Date::from_mlsd_string(value)?);
        },
        "type" => {
            facts.file_type = Some(FileType::from_mlsd_str(value));
        },
        "unix.group" => {
            facts.unix_group = value.parse().ok();
        },
        "unix.mode" => {
            facts.unix_mode = value.parse().ok();
        },
        _ => {},
    }
    Ok(())
}

/// Parses the `key=value;key=value; filename` fact string of a single MLSD
/// line into `(facts, filename)`.
pub fn parse_mlsd_line(line: &str) -> Result<(Facts, String), FtpError> {
    let (fact_string, filename) = line.split_once(' ').ok_or(FtpError::Unexpected)?;
    if filename.is_empty() {
        return Err(FtpError::Unexpected);
    }
    let mut facts = Facts::default();
    for fact in fact_string.split(';') {
        if fact.is_empty() {
            continue;
        }
        apply_fact(fact, &mut facts)?;
    }
    Ok((facts, filename.to_string()))
}

/// Parses a complete MLSD answer buffer into a [`ContentListing`]. Both CRLF
/// and bare-LF line separators are tolerated; a bare-LF line (the server did
/// not terminate it with `\r`) is logged as a warning since it violates
/// RFC 3659 but is otherwise accepted.
pub fn parse_mlsd_answer(buffer: &str) -> Result<ContentListing, FtpError> {
    let mut listing = ContentListing::default();
    for raw_line in buffer.split('\n') {
        let (line, used_wrong_separator) = match raw_line.strip_suffix('\r') {
            Some(stripped) => (stripped, false),
            None => (raw_line, true),
        };
        if line.is_empty() {
            continue;
        }
        if used_wrong_separator {
            warn!("MLSD line not terminated with CRLF: {line:?}");
        }
        let (facts, filename) = parse_mlsd_line(line)?;
        listing.entries.push(ContentListingEntry { filename, facts });
    }
    Ok(listing)
}
