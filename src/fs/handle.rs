//! Open Handles
//!
//! A [`FakeFileHandle`] is a cursor over a private copy of a record's
//! content. Writable handles store their buffer back into the record when
//! they are closed; every handle releases the record's open lock on close
//! or drop.

use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, ReadBuf};

use super::fake_file::FakeFile;
use super::mode::{Access, OpenMode};
use super::types::*;

/// An open view over a [`FakeFile`].
#[derive(Debug)]
pub struct FakeFileHandle {
    file: FakeFile,
    path: String,
    id: u64,
    mode: OpenMode,
    buffer: Vec<u8>,
    position: usize,
    // Set once the buffer differs from the record's content.
    dirty: bool,
    closed: bool,
}

impl FakeFileHandle {
    pub(crate) fn new(
        file: FakeFile,
        path: String,
        id: u64,
        mode: OpenMode,
        buffer: Vec<u8>,
        position: usize,
    ) -> Self {
        // Opening with "w" has already truncated the buffer.
        let dirty = mode.access == Access::Write;
        Self { file, path, id, mode, buffer, position, dirty, closed: false }
    }

    /// Path of the record this handle was opened on.
    pub fn name(&self) -> &str {
        &self.path
    }

    /// Mode the handle was opened with.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Length of the handle's buffer.
    pub fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Cut the buffer to `size` bytes, or at the cursor when `None`.
    pub fn truncate(&mut self, size: Option<u64>) -> io::Result<()> {
        self.check_writable()?;
        let size = size.map_or(self.position, |s| usize::try_from(s).unwrap_or(usize::MAX));
        if size < self.buffer.len() {
            self.buffer.truncate(size);
            self.dirty = true;
        }
        Ok(())
    }

    /// Close the handle, storing written content back into the record.
    /// A handle that never changed its buffer leaves the record untouched.
    ///
    /// Closing twice fails with [`FakeIoError::NotOpen`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(FakeIoError::NotOpen { path: self.path.clone() });
        }
        self.closed = true;
        let flushed = (self.mode.writable() && self.dirty).then(|| self.take_content());
        self.file.release(self.id, flushed)
    }

    fn take_content(&mut self) -> FileContent {
        let buffer = std::mem::take(&mut self.buffer);
        if self.mode.binary {
            return FileContent::Binary(buffer);
        }
        match String::from_utf8(buffer) {
            Ok(text) => FileContent::Text(text),
            Err(e) => FileContent::Binary(e.into_bytes()),
        }
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("I/O operation on closed file '{}'", self.path),
            ));
        }
        Ok(())
    }

    fn check_readable(&self) -> io::Result<()> {
        self.check_open()?;
        if !self.mode.readable() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("file not open for reading: '{}'", self.path),
            ));
        }
        Ok(())
    }

    fn check_writable(&self) -> io::Result<()> {
        self.check_open()?;
        if !self.mode.writable() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("file not open for writing: '{}'", self.path),
            ));
        }
        Ok(())
    }
}

impl Drop for FakeFileHandle {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                tracing::warn!(path = %self.path, error = %e, "failed to close fake file on drop");
            }
        }
    }
}

impl Read for FakeFileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for FakeFileHandle {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.check_readable()?;
        let start = self.position.min(self.buffer.len());
        Ok(&self.buffer[start..])
    }

    fn consume(&mut self, amt: usize) {
        self.position += amt;
    }
}

impl Write for FakeFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_writable()?;
        if self.mode.access == Access::Append {
            self.position = self.buffer.len();
        }
        let end = self.position.checked_add(buf.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "write past the maximum file size")
        })?;
        if end > self.buffer.len() {
            // Writing past the end leaves a zero-filled gap, like a sparse file.
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(buf);
        self.position = end;
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()
    }
}

impl Seek for FakeFileHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        let target = match pos {
            SeekFrom::Start(n) => usize::try_from(n).ok(),
            SeekFrom::End(n) => offset_from(self.buffer.len(), n),
            SeekFrom::Current(n) => offset_from(self.position, n),
        };
        match target {
            Some(n) => {
                self.position = n;
                Ok(n as u64)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

fn offset_from(base: usize, offset: i64) -> Option<usize> {
    let magnitude = usize::try_from(offset.unsigned_abs()).ok()?;
    if offset >= 0 {
        base.checked_add(magnitude)
    } else {
        base.checked_sub(magnitude)
    }
}

// ============================================================================
// Async adapters (the buffer is in memory, so every poll completes at once)
// ============================================================================

impl AsyncRead for FakeFileHandle {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let result = Read::read(this, buf.initialize_unfilled());
        Poll::Ready(result.map(|n| buf.advance(n)))
    }
}

impl AsyncWrite for FakeFileHandle {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Write::write(self.get_mut(), buf))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Write::flush(self.get_mut()))
    }

    /// Shutting down closes the handle and stores its content.
    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Ok(()));
        }
        Poll::Ready(this.close().map_err(io::Error::from))
    }
}

impl AsyncSeek for FakeFileHandle {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Seek::seek(self.get_mut(), position).map(|_| ())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position as u64))
    }
}

// ============================================================================
// Tests
// ============================================================================
