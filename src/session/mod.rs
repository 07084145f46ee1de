//! Interception Sessions
//!
//! A [`FakeIoSession`] maps normalized paths to fake files and, while
//! entered, serves them through the crate-level entry points.

pub mod types;
pub mod opener;
pub mod session;
pub mod dispatch;

pub use types::{Interceptor, Resolution};
pub use opener::{FileOpener, OpenFile, RealFs};
pub use session::FakeIoSession;
pub use dispatch::{active_sessions, is_intercepted, open, read, read_to_string, write, Intercepted, Scope, SessionGuard};
