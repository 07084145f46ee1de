//! Interception Dispatch
//!
//! Tracks which sessions are active and routes the crate-level entry points
//! ([`open`], [`read`], [`read_to_string`], [`write`]) through them.
//!
//! Sessions entered on the current thread are consulted innermost first,
//! then sessions entered process-wide, innermost first. A path no active
//! session claims goes to the real filesystem, so with nothing active the
//! entry points behave like `std::fs`.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use lazy_static::lazy_static;

use crate::fs::{OpenMode, Result};

use super::opener::{FileOpener, OpenFile, RealFs};
use super::session::FakeIoSession;

thread_local! {
    static THREAD_SESSIONS: RefCell<Vec<FakeIoSession>> = const { RefCell::new(Vec::new()) };
}

lazy_static! {
    static ref PROCESS_SESSIONS: RwLock<Vec<FakeIoSession>> = RwLock::new(Vec::new());
}

fn process_sessions() -> RwLockReadGuard<'static, Vec<FakeIoSession>> {
    PROCESS_SESSIONS.read().unwrap_or_else(PoisonError::into_inner)
}

fn process_sessions_mut() -> RwLockWriteGuard<'static, Vec<FakeIoSession>> {
    PROCESS_SESSIONS.write().unwrap_or_else(PoisonError::into_inner)
}

/// Where a session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the thread that entered the session.
    Thread,
    /// Every thread in the process.
    Process,
}

/// Keeps a session active. Dropping it restores the previous state.
#[must_use = "the session is deactivated as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SessionGuard {
    session: FakeIoSession,
    scope: Scope,
    // Thread-scoped guards must be dropped on the thread that made them.
    _not_send: PhantomData<*const ()>,
}

impl SessionGuard {
    pub fn session(&self) -> &FakeIoSession {
        &self.session
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }
}

pub(crate) fn activate(session: FakeIoSession, scope: Scope) -> SessionGuard {
    tracing::info!(?scope, "intercept file opens");
    match scope {
        Scope::Thread => THREAD_SESSIONS.with_borrow_mut(|s| s.push(session.clone())),
        Scope::Process => process_sessions_mut().push(session.clone()),
    }
    SessionGuard { session, scope, _not_send: PhantomData }
}

fn remove_innermost(sessions: &mut Vec<FakeIoSession>, session: &FakeIoSession) {
    if let Some(pos) = sessions.iter().rposition(|s| s.ptr_eq(session)) {
        sessions.remove(pos);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        tracing::info!(scope = ?self.scope, "restore file opens");
        match self.scope {
            Scope::Thread => {
                // The thread-local is gone if the thread is already exiting.
                let _ = THREAD_SESSIONS.try_with(|s| remove_innermost(&mut s.borrow_mut(), &self.session));
            }
            Scope::Process => remove_innermost(&mut process_sessions_mut(), &self.session),
        }
    }
}

/// Active sessions in lookup order.
pub fn active_sessions() -> Vec<FakeIoSession> {
    let mut chain: Vec<FakeIoSession> = THREAD_SESSIONS.with_borrow(|s| s.iter().rev().cloned().collect());
    chain.extend(process_sessions().iter().rev().cloned());
    chain
}

/// Opens through the active sessions, then the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Intercepted;

impl FileOpener for Intercepted {
    fn open(&self, path: &Path, mode: OpenMode) -> Result<OpenFile> {
        tracing::info!(path = %path.display(), %mode, "open file");
        // Registry keys are strings; a non-UTF-8 path can only be real.
        if let Some(key) = path.to_str() {
            for session in active_sessions() {
                if let Some(handle) = session.open_fake(key, mode)? {
                    return Ok(OpenFile::Fake(handle));
                }
            }
        }
        RealFs.open(path, mode)
    }
}

/// Open `path` with a mode string (`"r"`, `"wb"`, `"a+"`, ...).
pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<OpenFile> {
    Intercepted.open(path.as_ref(), OpenMode::parse(mode)?)
}

/// Read the whole file as bytes.
pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let mut file = open(path, "rb")?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    file.close()?;
    Ok(buf)
}

/// Read the whole file as text.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let mut file = open(path, "r")?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    file.close()?;
    Ok(buf)
}

/// Replace the file's content with `contents`.
pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let mut file = open(path, "wb")?;
    file.write_all(contents.as_ref())?;
    file.close()
}

/// Whether an active session would serve `path` instead of the real filesystem.
pub fn is_intercepted(path: impl AsRef<Path>) -> bool {
    match path.as_ref().to_str() {
        Some(key) => active_sessions().iter().any(|s| s.claims(key)),
        None => false,
    }
}
