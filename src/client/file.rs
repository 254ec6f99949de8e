// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A file handle bound to one (possibly borrowed) session and one data
//! channel, returned by `Session::fopen`.

use std::sync::{Arc, atomic::Ordering};

use crate::{
    cfg::enums::Direction, client::pool, client::session::Session, datachannel::DataChannel,
    error::FtpError,
};

/// Bound to the session that negotiated its `DataChannel` — which may be a
/// temporary sibling borrowed from the pool, not `Session::fopen`'s
/// receiver itself (§3 "File handle").
pub struct FileHandle {
    session: Arc<Session>,
    data: Option<DataChannel>,
    direction: Direction,
    eof: bool,
}

impl FileHandle {
    pub(crate) fn new(session: Arc<Session>, data: DataChannel, direction: Direction) -> Self {
        Self { session, data: Some(data), direction, eof: false }
    }

    /// Reads into `buf`, returning the number of bytes read (`0` at EOF).
    /// Only valid on a handle opened with [`Direction::Read`].
    pub fn fread(&mut self, buf: &mut [u8]) -> Result<usize, FtpError> {
        if self.direction != Direction::Read {
            return Err(self.record_error(FtpError::Invalid));
        }
        let data = self.data.as_mut().ok_or(FtpError::Already)?;
        let n = data.read(buf).map_err(|e| self.record_error(e))?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    /// Writes all of `buf`. Only valid on a handle opened with
    /// [`Direction::Write`].
    pub fn fwrite(&mut self, buf: &[u8]) -> Result<(), FtpError> {
        if self.direction != Direction::Write {
            return Err(self.record_error(FtpError::Invalid));
        }
        let data = self.data.as_mut().ok_or(FtpError::Already)?;
        data.write_all(buf).map_err(|e| self.record_error(e))
    }

    /// True once a `fread` has returned `0` bytes.
    pub fn feof(&self) -> bool {
        self.eof
    }

    /// Closes the data channel and releases the underlying session back to
    /// the pool. Does not wait for the server's spontaneous `226 Transfer
    /// complete`: the control reader is free-running between waits, so a
    /// wait armed here would race a `226` the reader has often already
    /// consumed with no trigger armed. Idempotent: calling it twice (or
    /// letting `Drop` call it after an explicit `fclose`) is a no-op the
    /// second time.
    pub fn fclose(&mut self) -> Result<(), FtpError> {
        let Some(data) = self.data.take() else {
            return Ok(());
        };
        data.close();
        self.session.has_open_data.store(false, Ordering::SeqCst);
        pool::mark_unused(&self.session);
        Ok(())
    }

    fn record_error(&self, err: FtpError) -> FtpError {
        self.session.record_error(err)
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        let _ = self.fclose();
    }
}

impl std::io::Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.fread(buf).map_err(|e| std::io::Error::other(e.to_string()))
    }
}

impl std::io::Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.fwrite(buf).map(|()| buf.len()).map_err(|e| std::io::Error::other(e.to_string()))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
