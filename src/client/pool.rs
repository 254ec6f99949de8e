// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! §4.6 sibling-connection pool: classical FTP cannot multiplex commands on
//! one control connection while a data transfer occupies it, so concurrent
//! transfers borrow a temporary sibling session instead. The root session
//! owns its children directly (`Arc`); each child keeps a `Weak` link back
//! to the root so [`mark_unused`] can reclaim excess idles.

use std::sync::{Arc, atomic::Ordering};

use tracing::debug;

use crate::{client::session::Session, error::FtpError, reader::Status};

/// Walks root→…→youngest for the first usable session: `status == Up`, and
/// (if `want_free_data`) no open data socket, and (if `want_not_root`) the
/// session is a temporary. Spawns and appends a new sibling if none match.
pub(crate) fn dequeue_usable(
    root: &Arc<Session>,
    want_not_root: bool,
    want_free_data: bool,
) -> Result<Arc<Session>, FtpError> {
    if is_usable(root, want_not_root, want_free_data) {
        return Ok(Arc::clone(root));
    }

    {
        #[allow(clippy::unwrap_used)]
        let children = root.children.lock().unwrap();
        for child in children.iter() {
            if is_usable(child, want_not_root, want_free_data) {
                return Ok(Arc::clone(child));
            }
        }
    }

    let sibling = generate_sibling(root)?;
    #[allow(clippy::unwrap_used)]
    root.children.lock().unwrap().push(Arc::clone(&sibling));
    Ok(sibling)
}

fn is_usable(session: &Session, want_not_root: bool, want_free_data: bool) -> bool {
    session.control.status() == Status::Up
        && (!want_free_data || !session.has_open_data.load(Ordering::SeqCst))
        && (!want_not_root || session.is_temporary)
}

/// Opens a new control connection to the same host/port/security, copies
/// the feature-downgrade flags, authenticates with the stored credentials,
/// and `cwd`s into the root's current directory.
fn generate_sibling(root: &Arc<Session>) -> Result<Arc<Session>, FtpError> {
    if !root.allow_multi.load(Ordering::SeqCst) {
        return Err(FtpError::NotSupported);
    }
    let (user, pass) = {
        #[allow(clippy::unwrap_used)]
        root.credentials.lock().unwrap().clone().ok_or(FtpError::NotReady)?
    };

    let mut config = root.config.clone();
    config.use_epsv = root.use_epsv.load(Ordering::SeqCst);
    config.use_mlsd = root.use_mlsd.load(Ordering::SeqCst);

    debug!(host = %root.host, "spawning sibling connection for concurrent transfer");
    let sibling = Session::open_internal(&root.host, root.port, root.security, config, true)?;
    #[allow(clippy::unwrap_used)]
    {
        *sibling.parent.lock().unwrap() = Some(Arc::downgrade(root));
    }

    sibling.auth(&user, &pass, false)?;
    let cur_dir = root.get_cur_directory()?;
    sibling.cwd(&cur_dir)?;

    Ok(sibling)
}

/// Releases `session` back to its root's idle pool. A no-op for the root
/// session itself. If more than `pool_idle_cap` temporaries are idle
/// (status `Up`, no open data socket), the oldest excess ones are `QUIT`'d
/// and dropped from the chain (§8 property 10).
pub(crate) fn mark_unused(session: &Arc<Session>) {
    if !session.is_temporary {
        return;
    }
    #[allow(clippy::unwrap_used)]
    let parent = session.parent.lock().unwrap().clone();
    let Some(root) = parent.and_then(|weak| weak.upgrade()) else {
        return;
    };

    let cap = root.config.pool_idle_cap;
    #[allow(clippy::unwrap_used)]
    let mut children = root.children.lock().unwrap();
    let idle_count = children.iter().filter(|c| is_idle(c)).count();
    if idle_count <= cap {
        return;
    }

    let mut excess = idle_count - cap;
    let mut i = 0;
    while i < children.len() && excess > 0 {
        if is_idle(&children[i]) {
            let stale = children.remove(i);
            let _ = stale.close();
            excess -= 1;
        } else {
            i += 1;
        }
    }
}

fn is_idle(session: &Arc<Session>) -> bool {
    session.control.status() == Status::Up && !session.has_open_data.load(Ordering::SeqCst)
}
