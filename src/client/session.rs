// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! One control connection: owns the transport, the background reader, and
//! the cached per-connection state (current directory, negotiated transfer
//! type, feature downgrades, stored credentials) needed to issue the public
//! operations of §4.4.

use std::{
    net::TcpStream,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    cfg::{
        config::ClientConfig,
        enums::{Direction, OpenPosition, Security, TransferType},
    },
    client::{file::FileHandle, pool},
    datachannel::DataChannel,
    error::FtpError,
    listing::ContentListing,
    reader::{ControlState, Status},
    reply::{list, mlsd, parse, signal},
    tls::TlsContext,
    transport::Transport,
    utils,
};

/// One control connection and the state layered on top of it. Cheap to
/// clone as an `Arc`; every public operation borrows `&self` or `&Arc<Self>`.
pub struct Session {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) security: Security,
    pub(crate) control: Arc<ControlState>,
    pub(crate) config: ClientConfig,
    tls: Mutex<Option<TlsContext>>,
    cur_directory: Mutex<Option<String>>,
    transfer_type: Mutex<TransferType>,
    pub(crate) use_epsv: AtomicBool,
    use_mlsd: AtomicBool,
    pub(crate) credentials: Mutex<Option<(String, String)>>,
    pub(crate) allow_multi: AtomicBool,
    pub(crate) is_temporary: bool,
    pub(crate) parent: Mutex<Option<Weak<Session>>>,
    pub(crate) children: Mutex<Vec<Arc<Session>>>,
    pub(crate) has_open_data: AtomicBool,
    error: Mutex<Option<FtpError>>,
}

impl Session {
    /// Opens a new control connection, completes the greeting wait, and (if
    /// `security` requests it) negotiates TLS before returning. Mirrors the
    /// original's `ftp_connection_open`.
    pub fn open(
        host: &str,
        port: u16,
        security: Security,
        config: ClientConfig,
    ) -> Result<Arc<Session>, FtpError> {
        Self::open_internal(host, port, security, config, false)
    }

    pub(crate) fn open_internal(
        host: &str,
        port: u16,
        security: Security,
        config: ClientConfig,
        is_temporary: bool,
    ) -> Result<Arc<Session>, FtpError> {
        info!(host, port, ?security, "opening control connection");
        let stream = TcpStream::connect((host, port)).map_err(FtpError::from)?;
        let timeout = Duration::from_secs(config.timeout_seconds);
        let control = ControlState::new(Transport::Plain(stream), timeout);
        control.set_status(Status::Connecting);
        control.spawn_reader();

        if control.wait_for_triggers(&[signal::SERVICE_READY], None).is_err()
            || signal::is_error(control.last_signal())
        {
            return Err(FtpError::NoService);
        }

        let session = Arc::new(Session {
            host: host.to_string(),
            port,
            security,
            use_epsv: AtomicBool::new(config.use_epsv),
            use_mlsd: AtomicBool::new(config.use_mlsd),
            control,
            config,
            tls: Mutex::new(None),
            cur_directory: Mutex::new(None),
            transfer_type: Mutex::new(TransferType::Undefined),
            credentials: Mutex::new(None),
            allow_multi: AtomicBool::new(false),
            is_temporary,
            parent: Mutex::new(None),
            children: Mutex::new(Vec::new()),
            has_open_data: AtomicBool::new(false),
            error: Mutex::new(None),
        });

        if security == Security::ExplicitTls {
            session.upgrade_control_tls()?;
        }
        session.control.set_status(Status::Up);
        Ok(session)
    }

    /// §4.4.1 TLS bring-up on the control channel.
    fn upgrade_control_tls(&self) -> Result<(), FtpError> {
        self.control.disable_input_thread.store(true, Ordering::SeqCst);

        let wait_result = self.control.send_and_wait("AUTH", &["TLS"], &[signal::TLS_SUCCESSFUL], None);
        let code = match wait_result {
            Ok(code) => code,
            Err(e) => {
                self.control.disable_input_thread.store(false, Ordering::SeqCst);
                self.control.spawn_reader();
                return Err(e);
            },
        };
        if signal::is_error(code) {
            self.control.disable_input_thread.store(false, Ordering::SeqCst);
            self.control.spawn_reader();
            return Err(FtpError::NotSupported);
        }

        let tls = TlsContext::new(self.config.accept_invalid_certs)?;
        if let Err(e) = self.control.upgrade_to_tls(&tls, &self.host) {
            self.control.disable_input_thread.store(false, Ordering::SeqCst);
            self.control.spawn_reader();
            return Err(e);
        }
        #[allow(clippy::unwrap_used)]
        {
            *self.tls.lock().unwrap() = Some(tls);
        }
        self.control.disable_input_thread.store(false, Ordering::SeqCst);
        self.control.spawn_reader();

        let code = self.control.send_and_wait("PBSZ", &["0"], &[signal::COMMAND_OKAY], None)?;
        if signal::is_error(code) {
            return Err(FtpError::TlsCertificate);
        }
        let code = self.control.send_and_wait("PROT", &["P"], &[signal::COMMAND_OKAY], None)?;
        if signal::is_error(code) {
            return Err(FtpError::TlsCertificate);
        }
        Ok(())
    }

    /// Authenticates, optionally enabling the sibling pool for concurrent
    /// transfers (`allow_multi`).
    pub fn auth(self: &Arc<Self>, user: &str, pass: &str, allow_multi: bool) -> Result<(), FtpError> {
        if self.control.status() != Status::Up {
            return Err(FtpError::NotReady);
        }
        if allow_multi {
            self.allow_multi.store(true, Ordering::SeqCst);
            #[allow(clippy::unwrap_used)]
            {
                *self.credentials.lock().unwrap() = Some((user.to_string(), pass.to_string()));
            }
        }

        let code = self.control.send_and_wait(
            "USER",
            &[user],
            &[signal::LOGGED_IN, signal::PASSWORD_REQUIRED],
            None,
        )?;

        if code == i32::from(signal::PASSWORD_REQUIRED) {
            let code = self.control.send_and_wait("PASS", &[pass], &[signal::LOGGED_IN], None)?;
            if signal::is_error(code) {
                return Err(self.record_error(auth_error(code)));
            }
        } else if signal::is_error(code) {
            return Err(self.record_error(auth_error(code)));
        }

        self.reload_cur_directory()?;
        Ok(())
    }

    /// Sends `PWD` and returns the path, without updating the cache.
    pub fn pwd(&self) -> Result<String, FtpError> {
        let code = self.control.send_and_wait(
            "PWD",
            &[],
            &[signal::MKDIR_SUCCESS_OR_PWD],
            Some(signal::MKDIR_SUCCESS_OR_PWD),
        )?;
        if signal::is_error(code) {
            return Err(self.record_error(FtpError::Unexpected));
        }
        let answer = self.control.take_answer_buffer().ok_or(FtpError::Unexpected)?;
        let text = String::from_utf8_lossy(&answer);
        Ok(parse::parse_pwd_path(&text)?.to_string())
    }

    /// Re-issues `PWD` and refreshes the cached current directory.
    pub fn reload_cur_directory(&self) -> Result<(), FtpError> {
        let path = self.pwd()?;
        #[allow(clippy::unwrap_used)]
        {
            *self.cur_directory.lock().unwrap() = Some(path);
        }
        Ok(())
    }

    /// Returns the cached current directory, reloading it first if it has
    /// never been fetched.
    pub fn get_cur_directory(&self) -> Result<String, FtpError> {
        let cached = {
            #[allow(clippy::unwrap_used)]
            self.cur_directory.lock().unwrap().clone()
        };
        if let Some(path) = cached {
            return Ok(path);
        }
        self.reload_cur_directory()?;
        #[allow(clippy::unwrap_used)]
        self.cur_directory.lock().unwrap().clone().ok_or(FtpError::Unexpected)
    }

    /// Changes the working directory. The cache is invalidated (not
    /// eagerly reloaded) so a following `get_cur_directory` re-fetches it.
    pub fn cwd(&self, path: &str) -> Result<(), FtpError> {
        let code =
            self.control.send_and_wait("CWD", &[path], &[signal::REQUESTED_ACTION_OKAY], None)?;
        if signal::is_error(code) {
            return Err(self.record_error(remote_error_for(code, FtpError::NotFound)));
        }
        #[allow(clippy::unwrap_used)]
        {
            *self.cur_directory.lock().unwrap() = None;
        }
        Ok(())
    }

    pub fn mkdir(&self, path: &str) -> Result<(), FtpError> {
        let code = self.control.send_and_wait(
            "MKD",
            &[path],
            &[signal::MKDIR_SUCCESS_OR_PWD],
            None,
        )?;
        if signal::is_error(code) {
            return Err(self.record_error(remote_error_for(code, FtpError::NotPermitted)));
        }
        Ok(())
    }

    /// `DELE` for a file, `RMD` for a directory.
    pub fn delete(&self, path: &str, is_dir: bool) -> Result<(), FtpError> {
        let cmd = if is_dir { "RMD" } else { "DELE" };
        let code =
            self.control.send_and_wait(cmd, &[path], &[signal::REQUESTED_ACTION_OKAY], None)?;
        if signal::is_error(code) {
            let default = if is_dir { FtpError::NotFoundOrNotEmpty } else { FtpError::NotFound };
            return Err(self.record_error(remote_error_for(code, default)));
        }
        Ok(())
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<(), FtpError> {
        let code = self.control.send_and_wait(
            "RNFR",
            &[old],
            &[signal::REQUEST_FURTHER_INFORMATION],
            None,
        )?;
        if signal::is_error(code) {
            return Err(self.record_error(remote_error_for(code, FtpError::NotFound)));
        }
        let code =
            self.control.send_and_wait("RNTO", &[new], &[signal::REQUESTED_ACTION_OKAY], None)?;
        if signal::is_error(code) {
            return Err(self.record_error(remote_error_for(code, FtpError::Unexpected)));
        }
        Ok(())
    }

    /// Alias for [`Session::rename`] matching the original's `ftp_move`
    /// macro; `new` must already include the destination file name.
    pub fn move_to(&self, old: &str, new: &str) -> Result<(), FtpError> {
        self.rename(old, new)
    }

    /// `mode` is accepted as decimal digits representing octal rwx triplets
    /// (e.g. `755`), capped at `777` — see §9's "File mode argument" note.
    pub fn chmod(&self, path: &str, mode: u32) -> Result<(), FtpError> {
        let mode_str = utils::validate_chmod_mode(mode)?;
        let code = self.control.send_and_wait(
            "SITE",
            &["CHMOD", &mode_str, path],
            &[signal::COMMAND_OKAY],
            None,
        )?;
        if signal::is_error(code) {
            return Err(self.record_error(remote_error_for(code, FtpError::NotPermitted)));
        }
        Ok(())
    }

    /// `wait = false` fires `NOOP` without waiting for a reply (the same
    /// fire-and-forget pattern used for `REST`, open question (a) in §9);
    /// in that mode `noop` never changes observable state (§8 property 11).
    pub fn noop(&self, wait: bool) -> Result<(), FtpError> {
        if !wait {
            return self.control.send_command("NOOP", &[]);
        }
        let code = self.control.send_and_wait("NOOP", &[], &[signal::COMMAND_OKAY], None)?;
        if signal::is_error(code) {
            return Err(self.record_error(FtpError::Unexpected));
        }
        Ok(())
    }

    /// Lists the current directory via `MLSD`, falling back to legacy
    /// `LIST` on the first server rejection (and permanently clearing
    /// `use_mlsd`, §8 property 9).
    pub fn contents_of_directory(&self) -> Result<ContentListing, FtpError> {
        self.set_type(TransferType::Ascii)?;

        let mut listing = if self.use_mlsd.load(Ordering::SeqCst) {
            match self.run_listing("MLSD") {
                Ok(buffer) => mlsd::parse_mlsd_answer(&buffer)?,
                Err(FtpError::Unexpected) => {
                    warn!("server rejected MLSD, falling back to LIST permanently");
                    self.use_mlsd.store(false, Ordering::SeqCst);
                    list::parse_list_answer(&self.run_listing("LIST")?)
                },
                Err(e) => return Err(e),
            }
        } else {
            list::parse_list_answer(&self.run_listing("LIST")?)
        };

        if self.config.content_listing_filter {
            listing.apply_content_listing_filter();
        }
        Ok(listing)
    }

    /// Convenience wrapper over `contents_of_directory` + `item_exists` on
    /// the resulting listing.
    pub fn item_exists(&self, name: &str) -> Result<bool, FtpError> {
        Ok(self.contents_of_directory()?.item_exists(name).is_some())
    }

    fn run_listing(&self, cmd: &str) -> Result<String, FtpError> {
        let (mut data, still_use_epsv) =
            DataChannel::establish(&self.control, &self.host, self.use_epsv.load(Ordering::SeqCst))?;
        if !still_use_epsv {
            self.use_epsv.store(false, Ordering::SeqCst);
        }
        self.has_open_data.store(true, Ordering::SeqCst);

        let outcome = self.run_listing_on(&mut data, cmd);

        data.close();
        self.has_open_data.store(false, Ordering::SeqCst);
        outcome
    }

    fn run_listing_on(&self, data: &mut DataChannel, cmd: &str) -> Result<String, FtpError> {
        let code = self.control.send_and_wait(
            cmd,
            &[],
            &[signal::DATA_CONNECTION_OPEN_STARTING_TRANSFER, signal::ABOUT_TO_OPEN_DATA_CONNECTION],
            None,
        )?;
        if signal::is_error(code) {
            return Err(FtpError::Unexpected);
        }
        if self.control_is_tls() {
            data.upgrade_to_tls(&self.tls_context()?, &self.host)?;
        }
        let bytes = data.read_to_end()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Queries `SIZE`, falling back to scanning `contents_of_directory` for
    /// the filename's MLSD `size` fact if the server rejects `SIZE`.
    pub fn size(&self, path: &str) -> Result<u64, FtpError> {
        self.set_type(TransferType::Binary)?;
        let code = self.control.send_and_wait(
            "SIZE",
            &[path],
            &[signal::FILE_STATUS],
            Some(signal::FILE_STATUS),
        )?;
        if !signal::is_error(code) {
            let answer = self.control.take_answer_buffer().ok_or(FtpError::Unexpected)?;
            let text = String::from_utf8_lossy(&answer);
            return text.trim().parse::<u64>().map_err(|_| FtpError::Unexpected);
        }

        debug!("SIZE rejected by server, scanning directory listing");
        let filename = path.rsplit('/').next().unwrap_or(path);
        let listing = self.contents_of_directory()?;
        listing
            .item_exists(filename)
            .and_then(|entry| entry.facts.size)
            .ok_or_else(|| self.record_error(FtpError::NotFound))
    }

    /// Opens a file handle for reading or writing. Per the
    /// `file_transfer_second_connection` config flag (open question (b) in
    /// §9), a sibling session is taken from the pool whenever that flag is
    /// set, even if `self` itself is free.
    pub fn fopen(
        self: &Arc<Self>,
        path: &str,
        dir: Direction,
        pos: OpenPosition,
    ) -> Result<FileHandle, FtpError> {
        let target =
            pool::dequeue_usable(self, self.config.file_transfer_second_connection, true)?;
        target.set_type(TransferType::Binary)?;

        let (mut data, still_use_epsv) = DataChannel::establish(
            &target.control,
            &target.host,
            target.use_epsv.load(Ordering::SeqCst),
        )?;
        if !still_use_epsv {
            target.use_epsv.store(false, Ordering::SeqCst);
        }
        target.has_open_data.store(true, Ordering::SeqCst);

        match target.start_transfer(&mut data, path, dir, pos) {
            Ok(()) => Ok(FileHandle::new(target, data, dir)),
            Err(e) => {
                data.close();
                target.has_open_data.store(false, Ordering::SeqCst);
                pool::mark_unused(&target);
                Err(e)
            },
        }
    }

    fn start_transfer(
        &self,
        data: &mut DataChannel,
        path: &str,
        dir: Direction,
        pos: OpenPosition,
    ) -> Result<(), FtpError> {
        let (cmd, rest_offset) = match (dir, pos) {
            (Direction::Write, OpenPosition::Append) => ("APPE", None),
            (Direction::Write, OpenPosition::Start) => ("STOR", None),
            (Direction::Write, OpenPosition::Resume(n)) => ("STOR", Some(n)),
            (Direction::Read, OpenPosition::Resume(n)) => ("RETR", Some(n)),
            (Direction::Read, _) => ("RETR", None),
        };

        if let Some(offset) = rest_offset {
            // Fire-and-forget per open question (a): no wait on REST's 350.
            self.control.send_command("REST", &[&offset.to_string()])?;
        }

        let code = self.control.send_and_wait(
            cmd,
            &[path],
            &[signal::DATA_CONNECTION_OPEN_STARTING_TRANSFER, signal::ABOUT_TO_OPEN_DATA_CONNECTION],
            None,
        )?;
        if code == i32::from(signal::REQUESTED_ACTION_ABORTED) {
            return Err(self.record_error(FtpError::NotPermitted));
        }
        if signal::is_error(code) {
            return Err(self.record_error(FtpError::Unexpected));
        }

        if self.control_is_tls() {
            data.upgrade_to_tls(&self.tls_context()?, &self.host)?;
        }
        Ok(())
    }

    fn control_is_tls(&self) -> bool {
        #[allow(clippy::unwrap_used)]
        self.control.transport.lock().unwrap().is_tls()
    }

    fn tls_context(&self) -> Result<TlsContext, FtpError> {
        #[allow(clippy::unwrap_used)]
        self.tls.lock().unwrap().clone().ok_or(FtpError::Security)
    }

    fn set_type(&self, ty: TransferType) -> Result<(), FtpError> {
        {
            #[allow(clippy::unwrap_used)]
            let current = self.transfer_type.lock().unwrap();
            if *current == ty {
                return Ok(());
            }
        }
        let letter = ty.type_letter().ok_or(FtpError::Arguments)?;
        let code = self.control.send_and_wait("TYPE", &[letter], &[signal::COMMAND_OKAY], None)?;
        if signal::is_error(code) {
            return Err(self.record_error(FtpError::Unexpected));
        }
        #[allow(clippy::unwrap_used)]
        {
            *self.transfer_type.lock().unwrap() = ty;
        }
        Ok(())
    }

    /// Best-effort `QUIT` and teardown, then recursive close of every
    /// sibling this session has spawned. Idempotent: a no-op on an
    /// already-`DOWN` session (§8 property 11).
    pub fn close(self: &Arc<Self>) -> Result<(), FtpError> {
        if self.control.status() == Status::Down {
            return Ok(());
        }
        self.control.termination.store(true, Ordering::SeqCst);
        let _ = self.control.send_and_wait("QUIT", &[], &[signal::GOODBYE], None);
        let _ = self.control.transport.lock().map(|t| t.shutdown());
        self.control.set_status(Status::Down);

        let children: Vec<Arc<Session>> = {
            #[allow(clippy::unwrap_used)]
            std::mem::take(&mut *self.children.lock().unwrap())
        };
        for child in children {
            let _ = child.close();
        }
        Ok(())
    }

    /// The error slot populated by the most recent failing operation; a
    /// secondary, non-canonical channel kept for API-surface fidelity with
    /// §6/§7 alongside the idiomatic `Result` return values.
    pub fn get_error(&self) -> Option<FtpError> {
        #[allow(clippy::unwrap_used)]
        self.error.lock().unwrap().clone()
    }

    pub(crate) fn record_error(&self, err: FtpError) -> FtpError {
        #[allow(clippy::unwrap_used)]
        {
            *self.error.lock().unwrap() = Some(err.clone());
        }
        err
    }
}

/// Translates a `USER`/`PASS` remote error reply into an [`FtpError`]: 530
/// means wrong credentials, anything else is an unexpected protocol error.
fn auth_error(code: i32) -> FtpError {
    if code == i32::from(signal::NOT_LOGGED_IN) {
        FtpError::WrongAuth
    } else {
        FtpError::Unexpected
    }
}

/// The small per-operation remote-error translation table of §7: `530` is
/// always a credentials problem, `451` always a permission problem; anything
/// else falls back to the caller-supplied, operation-specific default.
fn remote_error_for(code: i32, default: FtpError) -> FtpError {
    match code {
        c if c == i32::from(signal::NOT_LOGGED_IN) => FtpError::WrongAuth,
        c if c == i32::from(signal::REQUESTED_ACTION_ABORTED) => FtpError::NotPermitted,
        _ => default,
    }
}

#[cfg(test)]
impl Session {
    /// Builds a bare `Session` around an already-constructed `ControlState`,
    /// skipping the network connect — used by `pool` unit tests that only
    /// exercise `dequeue_usable`'s status/flag bookkeeping.
    pub(crate) fn new_for_test(control: Arc<ControlState>, is_temporary: bool) -> Arc<Session> {
        Arc::new(Session {
            host: "127.0.0.1".to_string(),
            port: 21,
            security: Security::None,
            use_epsv: AtomicBool::new(true),
            use_mlsd: AtomicBool::new(true),
            control,
            config: ClientConfig::default(),
            tls: Mutex::new(None),
            cur_directory: Mutex::new(None),
            transfer_type: Mutex::new(TransferType::Undefined),
            credentials: Mutex::new(None),
            allow_multi: AtomicBool::new(false),
            is_temporary,
            parent: Mutex::new(None),
            children: Mutex::new(Vec::new()),
            has_open_data: AtomicBool::new(false),
            error: Mutex::new(None),
        })
    }
}
