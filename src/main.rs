// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io::Read;

use anyhow::{Context, Result, bail};
use mftp_client_rs::{
    ClientConfig, Direction, OpenPosition, Security,
    cfg::{cli::resolve_config_path, logger::init_logger},
};
use tracing::info;

/// A minimal demonstration CLI: `mftp-client-rs <host> <user> <pass>
/// [remote-path]`. Connects, authenticates, lists the current directory,
/// and (if `remote-path` is given) prints the remote file's size.
fn main() -> Result<()> {
    let _logger_guard = init_logger("tests/config_logger.yaml").ok();

    let args: Vec<String> = std::env::args().collect();
    let [_, host, user, pass, rest @ ..] = args.as_slice() else {
        bail!("usage: mftp-client-rs <host> <user> <pass> [remote-path]");
    };

    let cfg = resolve_config_path("mftp.yaml")
        .ok()
        .and_then(|p| ClientConfig::load_from_file(&p).ok())
        .unwrap_or_default();

    let session = mftp_client_rs::Session::open(host, 21, Security::None, cfg)
        .context("failed to open control connection")?;
    info!(host, "connected");

    session.auth(user, pass, true).context("authentication failed")?;
    info!(directory = %session.get_cur_directory()?, "authenticated");

    let listing = session.contents_of_directory().context("directory listing failed")?;
    for entry in &listing.entries {
        println!("{}\t{:?}", entry.filename, entry.facts.size);
    }

    if let Some(path) = rest.first() {
        let size = session.size(path).context("SIZE failed")?;
        println!("{path}: {size} bytes");

        let mut handle = session
            .fopen(path, Direction::Read, OpenPosition::Start)
            .context("fopen failed")?;
        let mut buf = Vec::new();
        handle.read_to_end(&mut buf).context("download failed")?;
        println!("downloaded {} bytes", buf.len());
    }

    session.close().ok();
    Ok(())
}
