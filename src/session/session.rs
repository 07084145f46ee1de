use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use regex_lite::Regex;

use crate::fs::{normalize_path, FakeFile, FakeFileHandle, FileContent, FileMode, OpenMode, Result};

use super::dispatch::{self, Scope, SessionGuard};
use super::opener::{FileOpener, OpenFile, RealFs};
use super::types::*;

#[derive(Debug, Default)]
struct SessionState {
    mappings: Mutex<IndexMap<String, FakeFile>>,
    interceptors: Mutex<Vec<Interceptor>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A registry of fake files that can be activated for a scope.
///
/// Clones share the registry. While a session is entered, the crate's
/// [`open`](crate::open) entry point serves registered paths from memory
/// and passes everything else through.
#[derive(Debug, Clone, Default)]
pub struct FakeIoSession {
    state: Arc<SessionState>,
}

impl FakeIoSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file at `path`, replacing any record already there.
    pub fn create_file(&self, path: &str, mode: FileMode, content: impl Into<FileContent>) -> FakeFile {
        let file = FakeFile::new(path, mode, content);
        self.add_file(file.clone());
        file
    }

    /// Register an existing record under its own path.
    pub fn add_file(&self, file: FakeFile) {
        let path = file.path();
        tracing::debug!(%path, mode = ?file.mode(), "register fake file");
        lock(&self.state.mappings).insert(path, file);
    }

    /// Claim every unregistered path the regex matches at its start.
    pub fn intercept_regex(&self, pattern: &str) -> Result<()> {
        self.add_interceptor(Interceptor::regex(pattern)?);
        Ok(())
    }

    /// Claim every unregistered path the glob matches entirely.
    pub fn intercept_glob(&self, pattern: &str) -> Result<()> {
        self.add_interceptor(Interceptor::glob(pattern)?);
        Ok(())
    }

    pub fn intercept(&self, regex: Regex) {
        self.add_interceptor(Interceptor::Regex(regex));
    }

    pub fn add_interceptor(&self, interceptor: Interceptor) {
        tracing::debug!(pattern = interceptor.as_str(), "add interceptor");
        lock(&self.state.interceptors).push(interceptor);
    }

    /// Snapshot of the registered files, in registration order.
    pub fn mappings(&self) -> IndexMap<String, FakeFile> {
        lock(&self.state.mappings).clone()
    }

    /// The record registered at `path`, if any.
    pub fn file(&self, path: &str) -> Option<FakeFile> {
        lock(&self.state.mappings).get(&normalize_path(path)).cloned()
    }

    /// Whether this session would serve `path`, without creating anything.
    pub fn claims(&self, path: &str) -> bool {
        let path = normalize_path(path);
        lock(&self.state.mappings).contains_key(&path)
            || lock(&self.state.interceptors).iter().any(|i| i.matches(&path))
    }

    /// Resolve `path` to a record.
    ///
    /// Registered paths win over interceptors. The first matching interceptor
    /// registers a new empty read-write record for the path.
    pub fn resolve(&self, path: &str) -> Resolution {
        let path = normalize_path(path);
        let mut mappings = lock(&self.state.mappings);
        if let Some(file) = mappings.get(&path) {
            return Resolution::Mapped(file.clone());
        }

        let interceptors = lock(&self.state.interceptors);
        match interceptors.iter().find(|i| i.matches(&path)) {
            Some(interceptor) => {
                tracing::debug!(%path, pattern = interceptor.as_str(), "create intercepted file");
                let file = FakeFile::new(&path, FileMode::ReadWrite, FileContent::default());
                mappings.insert(path, file.clone());
                Resolution::Intercepted(file)
            }
            None => Resolution::Miss,
        }
    }

    /// Open `path` from this session's registry, or `None` when the session
    /// does not claim it.
    pub fn open_fake(&self, path: &str, mode: OpenMode) -> Result<Option<FakeFileHandle>> {
        match self.resolve(path).file() {
            Some(file) => file.open_with(mode).map(Some),
            None => Ok(None),
        }
    }

    /// Activate the session for the current thread until the guard drops.
    pub fn enter(&self) -> SessionGuard {
        dispatch::activate(self.clone(), Scope::Thread)
    }

    /// Activate the session for every thread until the guard drops.
    pub fn enter_global(&self) -> SessionGuard {
        dispatch::activate(self.clone(), Scope::Process)
    }

    /// Run `f` with the session active on the current thread.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.enter();
        f()
    }

    pub fn ptr_eq(&self, other: &FakeIoSession) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Opens through this session alone, falling back to the real filesystem.
impl FileOpener for FakeIoSession {
    fn open(&self, path: &Path, mode: OpenMode) -> Result<OpenFile> {
        tracing::info!(path = %path.display(), %mode, "open file");
        // Registry keys are strings; a non-UTF-8 path can only be real.
        let fake = match path.to_str() {
            Some(key) => self.open_fake(key, mode)?,
            None => None,
        };
        match fake {
            Some(handle) => Ok(OpenFile::Fake(handle)),
            None => RealFs.open(path, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FakeIoError;
    use std::io::{Read, Write};

    #[test]
    fn test_create_file_normalizes_path() {
        let session = FakeIoSession::new();
        let file = session.create_file("\\memfile\\a.txt", FileMode::ReadOnly, "a");
        assert_eq!(file.path(), "/memfile/a.txt");
        assert!(session.file("/memfile/a.txt").unwrap().ptr_eq(&file));
        assert!(session.file("\\memfile\\a.txt").unwrap().ptr_eq(&file));
    }

    #[test]
    fn test_create_file_replaces_existing() {
        let session = FakeIoSession::new();
        session.create_file("/memfile/a.txt", FileMode::ReadOnly, "old");
        let new = session.create_file("/memfile/a.txt", FileMode::ReadOnly, "new");
        assert_eq!(session.mappings().len(), 1);
        assert!(session.file("/memfile/a.txt").unwrap().ptr_eq(&new));
    }

    #[test]
    fn test_mapping_has_precedence_over_regex() {
        let session = FakeIoSession::new();
        let mapped = session.create_file("/memfile/something.txt", FileMode::ReadOnly, "something");
        session.intercept_regex("^/memfile/").unwrap();
        match session.resolve("/memfile/something.txt") {
            Resolution::Mapped(file) => assert!(file.ptr_eq(&mapped)),
            other => panic!("expected mapped file, got {other:?}"),
        }
    }

    #[test]
    fn test_regex_creates_writable_record() {
        let session = FakeIoSession::new();
        session.intercept_regex("^/memfile/").unwrap();
        let file = match session.resolve("/memfile/new.txt") {
            Resolution::Intercepted(file) => file,
            other => panic!("expected intercepted file, got {other:?}"),
        };
        assert_eq!(file.mode(), FileMode::ReadWrite);
        assert_eq!(file.value().unwrap(), FileContent::default());

        // The second lookup finds the registered record
        assert!(matches!(session.resolve("/memfile/new.txt"), Resolution::Mapped(_)));
        assert!(matches!(session.resolve("/elsewhere.txt"), Resolution::Miss));
    }

    #[test]
    fn test_first_matching_interceptor_wins_and_backslashes_match() {
        let session = FakeIoSession::new();
        session.intercept_glob("C:/fixtures/*.txt").unwrap();
        session.intercept_regex("^C:/").unwrap();
        let file = session.resolve("C:\\fixtures\\a.txt");
        assert_eq!(file.file().unwrap().path(), "C:/fixtures/a.txt");
        assert!(session.claims("C:\\other\\b.bin"));
        assert!(!session.claims("D:/b.bin"));
        // claims() does not register anything
        assert!(session.file("C:/other/b.bin").is_none());
    }

    #[test]
    fn test_mappings_snapshot_in_registration_order() {
        let session = FakeIoSession::new();
        let readable = session.create_file("/memfile/something_mapping.txt", FileMode::ReadOnly, "");
        session.intercept(Regex::new("^/memfile/").unwrap());
        session.open_fake("/memfile/something_regex.txt", OpenMode::WRITE).unwrap();

        let mappings = session.mappings();
        let keys: Vec<&str> = mappings.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/memfile/something_mapping.txt", "/memfile/something_regex.txt"]);
        assert!(mappings["/memfile/something_mapping.txt"].ptr_eq(&readable));

        // Later registrations do not show up in an old snapshot
        session.create_file("/memfile/late.txt", FileMode::ReadOnly, "");
        assert_eq!(mappings.len(), 2);
    }

    #[test]
    fn test_opener_serves_fake_and_real() {
        let dir = tempfile::tempdir().unwrap();
        let real_path = dir.path().join("real.txt");
        std::fs::write(&real_path, "from disk").unwrap();

        let session = FakeIoSession::new();
        session.create_file("/memfile/a.txt", FileMode::ReadOnly, "from memory");

        let mut out = String::new();
        let mut file = session.open(Path::new("/memfile/a.txt"), OpenMode::READ).unwrap();
        assert!(file.is_fake());
        file.read_to_string(&mut out).unwrap();
        assert_eq!(out, "from memory");

        out.clear();
        let mut file = session.open(&real_path, OpenMode::READ).unwrap();
        assert!(!file.is_fake());
        file.read_to_string(&mut out).unwrap();
        assert_eq!(out, "from disk");
    }

    #[test]
    fn test_opener_propagates_fake_errors() {
        let session = FakeIoSession::new();
        let file = session.create_file("/memfile/a.txt", FileMode::ReadWrite, "");
        let mut first = session.open(Path::new("/memfile/a.txt"), OpenMode::WRITE).unwrap();
        assert!(matches!(
            session.open(Path::new("/memfile/a.txt"), OpenMode::READ),
            Err(FakeIoError::AlreadyOpen { .. })
        ));
        first.write_all(b"done").unwrap();
        first.close().unwrap();
        assert_eq!(file.value_string().unwrap(), "done");
    }
}
