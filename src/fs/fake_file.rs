//! Fake File Records
//!
//! A [`FakeFile`] is the in-memory stand-in for a real file. It owns the
//! stored content and enforces that at most one [`FakeFileHandle`] is open
//! on it at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::handle::FakeFileHandle;
use super::mode::{Access, FileMode, OpenMode};
use super::types::*;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct FileRecord {
    path: String,
    mode: FileMode,
    content: FileContent,
    encoding: Option<TextEncoding>,
    /// Id of the handle currently holding the record open.
    open_handle: Option<u64>,
}

/// Shared handle to an in-memory file record.
///
/// Clones refer to the same record, so a test can keep the value returned
/// by [`FakeIoSession::create_file`](crate::FakeIoSession::create_file) and
/// inspect what the code under test wrote.
#[derive(Debug, Clone)]
pub struct FakeFile {
    inner: Arc<Mutex<FileRecord>>,
}

impl FakeFile {
    /// Create a detached record. The path is normalized.
    pub fn new(path: &str, mode: FileMode, content: impl Into<FileContent>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FileRecord {
                path: normalize_path(path),
                mode,
                content: content.into(),
                encoding: None,
                open_handle: None,
            })),
        }
    }

    /// Declare the encoding stored bytes are decoded with in text mode.
    pub fn with_encoding(self, encoding: TextEncoding) -> Self {
        self.record().encoding = Some(encoding);
        self
    }

    fn record(&self) -> MutexGuard<'_, FileRecord> {
        // A panic while holding the lock leaves the record consistent, so keep going.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> String {
        self.record().path.clone()
    }

    pub fn mode(&self) -> FileMode {
        self.record().mode
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        self.record().encoding
    }

    pub fn is_open(&self) -> bool {
        self.record().open_handle.is_some()
    }

    /// Whether both values refer to the same record.
    pub fn ptr_eq(&self, other: &FakeFile) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Open the record with a mode string such as `"r"`, `"wb"` or `"a"`.
    pub fn open(&self, mode: &str) -> Result<FakeFileHandle> {
        self.open_with(OpenMode::parse(mode)?)
    }

    /// Open the record with a parsed mode.
    ///
    /// Fails with [`FakeIoError::AlreadyOpen`] while another handle is open,
    /// with [`FakeIoError::ModeMismatch`] when a read-only record is opened
    /// for writing, and with [`FakeIoError::Encoding`] when the stored content
    /// cannot be converted for the requested mode. A failed open leaves the
    /// record closed.
    pub fn open_with(&self, mode: OpenMode) -> Result<FakeFileHandle> {
        let mut record = self.record();
        if record.open_handle.is_some() {
            return Err(FakeIoError::AlreadyOpen { path: record.path.clone() });
        }
        if mode.writable() && !record.mode.is_writable() {
            return Err(FakeIoError::ModeMismatch {
                path: record.path.clone(),
                mode: mode.to_string(),
            });
        }

        let buffer = match (mode.access, mode.binary) {
            (Access::Write, _) => Vec::new(),
            (_, true) => record.content.to_bytes(record.encoding)?,
            (_, false) => record.content.to_text_bytes(record.encoding)?,
        };
        let position = match mode.access {
            Access::Append => buffer.len(),
            Access::Read | Access::Write => 0,
        };

        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        record.open_handle = Some(id);
        tracing::debug!(path = %record.path, %mode, handle = id, "opened fake file");
        let path = record.path.clone();
        drop(record);

        Ok(FakeFileHandle::new(self.clone(), path, id, mode, buffer, position))
    }

    /// Release the open lock held by handle `id`, storing `flushed` first.
    pub(crate) fn release(&self, id: u64, flushed: Option<FileContent>) -> Result<()> {
        let mut record = self.record();
        if record.open_handle != Some(id) {
            return Err(FakeIoError::NotOpen { path: record.path.clone() });
        }
        if let Some(content) = flushed {
            record.content = content;
        }
        record.open_handle = None;
        tracing::debug!(path = %record.path, handle = id, "closed fake file");
        Ok(())
    }

    /// Current content. Fails while a handle is open.
    pub fn value(&self) -> Result<FileContent> {
        let record = self.record();
        if record.open_handle.is_some() {
            return Err(FakeIoError::StillOpen { path: record.path.clone() });
        }
        Ok(record.content.clone())
    }

    /// Current content as bytes, encoding text with the declared encoding.
    pub fn value_bytes(&self) -> Result<Vec<u8>> {
        let encoding = self.encoding();
        Ok(self.value()?.to_bytes(encoding)?)
    }

    /// Current content as text, decoding bytes with the declared encoding (UTF-8 by default).
    pub fn value_string(&self) -> Result<String> {
        let encoding = self.encoding();
        match self.value()? {
            FileContent::Text(text) => Ok(text),
            FileContent::Binary(bytes) => Ok(encoding.unwrap_or_default().decode(&bytes)?),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
