//! File Openers
//!
//! [`FileOpener`] is the seam code under test can take instead of calling
//! `std::fs` directly. [`RealFs`] passes through to the real filesystem.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::fs::{FakeFileHandle, OpenMode, Result};

/// Something that can open a path with a mode.
pub trait FileOpener: Send + Sync {
    fn open(&self, path: &Path, mode: OpenMode) -> Result<OpenFile>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileOpener for RealFs {
    fn open(&self, path: &Path, mode: OpenMode) -> Result<OpenFile> {
        tracing::debug!(path = %path.display(), %mode, "pass through to real filesystem");
        Ok(OpenFile::Real(mode.to_open_options().open(path)?))
    }
}

/// A file opened through an interceptable entry point.
#[derive(Debug)]
pub enum OpenFile {
    Fake(FakeFileHandle),
    Real(File),
}

impl OpenFile {
    pub fn is_fake(&self) -> bool {
        matches!(self, OpenFile::Fake(_))
    }

    pub fn as_fake(&self) -> Option<&FakeFileHandle> {
        match self {
            OpenFile::Fake(handle) => Some(handle),
            OpenFile::Real(_) => None,
        }
    }

    /// Close the file, surfacing errors a drop would only log.
    pub fn close(self) -> Result<()> {
        match self {
            OpenFile::Fake(mut handle) => handle.close(),
            OpenFile::Real(mut file) => Ok(file.flush()?),
        }
    }
}

impl Read for OpenFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OpenFile::Fake(handle) => handle.read(buf),
            OpenFile::Real(file) => file.read(buf),
        }
    }
}

impl Write for OpenFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OpenFile::Fake(handle) => handle.write(buf),
            OpenFile::Real(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OpenFile::Fake(handle) => handle.flush(),
            OpenFile::Real(file) => file.flush(),
        }
    }
}

impl Seek for OpenFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            OpenFile::Fake(handle) => handle.seek(pos),
            OpenFile::Real(file) => file.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FakeIoError;

    #[test]
    fn test_real_fs_reads_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.txt");

        let mut file = RealFs.open(&path, OpenMode::WRITE).unwrap();
        assert!(!file.is_fake());
        file.write_all(b"on disk").unwrap();
        file.close().unwrap();

        let mut file = RealFs.open(&path, OpenMode::APPEND).unwrap();
        file.write_all(b"!").unwrap();
        file.close().unwrap();

        let mut out = String::new();
        RealFs.open(&path, OpenMode::READ).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "on disk!");
    }

    #[test]
    fn test_real_fs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        match RealFs.open(&dir.path().join("missing.txt"), OpenMode::READ) {
            Err(FakeIoError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
