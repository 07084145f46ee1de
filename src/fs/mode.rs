//! Open Modes
//!
//! Declared record modes and parsed open-mode strings (`"r"`, `"wb"`, `"a+"`, ...).

use std::fmt;
use std::fs::OpenOptions;

use super::types::{FakeIoError, Result};

/// Mode a fake file record is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// Only read opens are allowed.
    #[default]
    ReadOnly,
    /// Read, write and append opens are allowed.
    ReadWrite,
}

impl FileMode {
    /// Parse `"r"` or `"rw"`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            _ => Err(FakeIoError::InvalidFileMode { mode: s.to_string() }),
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// How an open positions the cursor and treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Truncate, then write.
    Write,
    /// Every write goes to the end.
    Append,
}

/// A parsed open-mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    /// `+` was given: the other direction is allowed as well.
    pub update: bool,
    pub binary: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode { access: Access::Read, update: false, binary: false };
    pub const WRITE: OpenMode = OpenMode { access: Access::Write, update: false, binary: false };
    pub const APPEND: OpenMode = OpenMode { access: Access::Append, update: false, binary: false };

    /// Parse a mode string such as `"r"`, `"rb"`, `"w+"` or `"at"`.
    pub fn parse(mode: &str) -> Result<Self> {
        let invalid = || FakeIoError::InvalidMode { mode: mode.to_string() };
        let mut chars = mode.chars();
        let access = match chars.next() {
            Some('r') => Access::Read,
            Some('w') => Access::Write,
            Some('a') => Access::Append,
            _ => return Err(invalid()),
        };

        let mut update = false;
        let mut binary = false;
        let mut text = false;
        for c in chars {
            let flag = match c {
                '+' => &mut update,
                'b' => &mut binary,
                't' => &mut text,
                _ => return Err(invalid()),
            };
            if *flag {
                return Err(invalid());
            }
            *flag = true;
        }
        if binary && text {
            return Err(invalid());
        }

        Ok(Self { access, update, binary })
    }

    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    pub fn readable(&self) -> bool {
        self.access == Access::Read || self.update
    }

    pub fn writable(&self) -> bool {
        self.access != Access::Read || self.update
    }

    /// Equivalent options for the real filesystem.
    pub fn to_open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.readable());
        match self.access {
            Access::Read => {
                options.write(self.update);
            }
            Access::Write => {
                options.write(true).create(true).truncate(true);
            }
            Access::Append => {
                options.append(true).create(true);
            }
        }
        options
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access {
            Access::Read => "r",
            Access::Write => "w",
            Access::Append => "a",
        };
        write!(
            f,
            "{}{}{}",
            access,
            if self.update { "+" } else { "" },
            if self.binary { "b" } else { "" }
        )
    }
}

impl std::str::FromStr for OpenMode {
    type Err = FakeIoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_modes() {
        assert_eq!(OpenMode::parse("r").unwrap(), OpenMode::READ);
        assert_eq!(OpenMode::parse("w").unwrap(), OpenMode::WRITE);
        assert_eq!(OpenMode::parse("a").unwrap(), OpenMode::APPEND);
        assert_eq!(OpenMode::parse("rt").unwrap(), OpenMode::READ);
        assert_eq!(OpenMode::parse("wb").unwrap(), OpenMode::WRITE.binary());
    }

    #[test]
    fn test_parse_update_flag() {
        let mode = OpenMode::parse("r+b").unwrap();
        assert!(mode.readable());
        assert!(mode.writable());
        assert!(mode.binary);
        assert_eq!(mode.to_string(), "r+b");

        let mode = OpenMode::parse("a").unwrap();
        assert!(!mode.readable());
        assert!(mode.writable());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "x", "rw", "rbb", "r++", "rbt", "br", "U"] {
            assert!(
                matches!(OpenMode::parse(bad), Err(FakeIoError::InvalidMode { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_file_mode_parse() {
        assert_eq!(FileMode::parse("r").unwrap(), FileMode::ReadOnly);
        assert_eq!(FileMode::parse("rw").unwrap(), FileMode::ReadWrite);
        assert!(FileMode::parse("w").is_err());
        assert!(FileMode::ReadWrite.is_writable());
        assert!(!FileMode::default().is_writable());
    }
}
