//! fake-io - An in-memory file-system double for tests
//!
//! Code under test opens files through [`open`] (or [`read`],
//! [`read_to_string`], [`write`], or any [`FileOpener`]). With no session
//! active these go straight to the real filesystem. Inside an entered
//! [`FakeIoSession`], registered paths and paths matching the session's
//! interceptors are served from memory instead.
//!
//! ```
//! use fake_io::{FakeIoSession, FileMode};
//!
//! let session = FakeIoSession::new();
//! let config = session.create_file("/etc/app.conf", FileMode::ReadWrite, "debug = false");
//!
//! session.scope(|| {
//!     assert_eq!(fake_io::read_to_string("/etc/app.conf").unwrap(), "debug = false");
//!     fake_io::write("/etc/app.conf", "debug = true").unwrap();
//! });
//! assert_eq!(config.value_string().unwrap(), "debug = true");
//! ```

pub mod fs;
pub mod session;
pub mod fixture;

pub use fs::{
    normalize_path, Access, EncodingError, FakeFile, FakeFileHandle, FakeIoError, FileContent, FileMode, OpenMode,
    Result, TextEncoding,
};
pub use session::{
    active_sessions, is_intercepted, open, read, read_to_string, write, FakeIoSession, FileOpener, Intercepted,
    Interceptor, OpenFile, RealFs, Resolution, Scope, SessionGuard,
};
pub use fixture::{Fixture, FixtureFile, FixtureFormat};
