use glob::{MatchOptions, Pattern};
use regex_lite::Regex;

use crate::fs::{FakeFile, FakeIoError, Result};

/// A pattern that claims unregistered paths for a session.
#[derive(Debug, Clone)]
pub enum Interceptor {
    /// Matches when the regex matches at the start of the path.
    Regex(Regex),
    /// Matches when the glob matches the whole path. `*` stops at `/`, `**` does not.
    Glob(Pattern),
}

impl Interceptor {
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Interceptor::Regex)
            .map_err(|e| FakeIoError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        Pattern::new(pattern)
            .map(Interceptor::Glob)
            .map_err(|e| FakeIoError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    /// Test a normalized path.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            // The leftmost match starts at 0 whenever any match does.
            Interceptor::Regex(re) => re.find(path).is_some_and(|m| m.start() == 0),
            Interceptor::Glob(pattern) => pattern.matches_with(
                path,
                MatchOptions {
                    require_literal_separator: true,
                    ..MatchOptions::new()
                },
            ),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Interceptor::Regex(re) => re.as_str(),
            Interceptor::Glob(pattern) => pattern.as_str(),
        }
    }
}

impl From<Regex> for Interceptor {
    fn from(re: Regex) -> Self {
        Interceptor::Regex(re)
    }
}

/// How a session resolved a path.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// An explicitly registered record.
    Mapped(FakeFile),
    /// A record created on demand by an interceptor.
    Intercepted(FakeFile),
    /// Not this session's path.
    Miss,
}

impl Resolution {
    pub fn file(&self) -> Option<&FakeFile> {
        match self {
            Resolution::Mapped(file) | Resolution::Intercepted(file) => Some(file),
            Resolution::Miss => None,
        }
    }
}
