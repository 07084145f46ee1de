//! File System Module
//!
//! In-memory stand-ins for real files:
//! - FakeFile: a shared record holding content and the open lock
//! - FakeFileHandle: a single open view over a record

pub mod types;
pub mod mode;
pub mod fake_file;
pub mod handle;

pub use types::*;
pub use mode::{Access, FileMode, OpenMode};
pub use fake_file::FakeFile;
pub use handle::FakeFileHandle;
