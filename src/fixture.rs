//! Fixtures
//!
//! Declarative session setup loaded from TOML, YAML or JSON:
//!
//! ```toml
//! intercept = ["^/memfile/"]
//! intercept_glob = ["/tmp/fake/**"]
//!
//! [[files]]
//! path = "/etc/app.conf"
//! mode = "r"
//! content = "key=value"
//! encoding = "latin1"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::fs::{FakeFile, FakeIoError, FileContent, FileMode, Result, TextEncoding};
use crate::session::{FakeIoSession, Interceptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Toml,
    Yaml,
    Json,
}

impl FixtureFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn detect_from_extension(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| Self::from_str(&ext.to_string_lossy()))
    }
}

/// A session description.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fixture {
    /// Regexes claiming unregistered paths.
    pub intercept: Vec<String>,
    /// Globs claiming unregistered paths.
    pub intercept_glob: Vec<String>,
    pub files: Vec<FixtureFile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
    pub path: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

fn default_mode() -> String {
    "r".to_string()
}

fn fixture_error(message: impl Into<String>) -> FakeIoError {
    FakeIoError::Fixture { message: message.into() }
}

impl Fixture {
    pub fn parse(source: &str, format: FixtureFormat) -> Result<Self> {
        match format {
            FixtureFormat::Toml => toml::from_str(source).map_err(|e| fixture_error(e.to_string())),
            FixtureFormat::Yaml => serde_yaml::from_str(source).map_err(|e| fixture_error(e.to_string())),
            FixtureFormat::Json => serde_json::from_str(source).map_err(|e| fixture_error(e.to_string())),
        }
    }

    /// Load a fixture from the real filesystem. The format comes from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FixtureFormat::detect_from_extension(path).ok_or_else(|| {
            fixture_error(format!("cannot tell fixture format of '{}'", path.display()))
        })?;
        // Read with std::fs so an active session never serves its own fixture.
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, format)
    }

    /// Register the fixture's files and interceptors on `session`.
    ///
    /// Everything is validated before the session is touched.
    pub fn apply(&self, session: &FakeIoSession) -> Result<()> {
        let files = self.files.iter().map(FixtureFile::to_fake_file).collect::<Result<Vec<_>>>()?;
        let mut interceptors = Vec::with_capacity(self.intercept.len() + self.intercept_glob.len());
        for pattern in &self.intercept {
            interceptors.push(Interceptor::regex(pattern)?);
        }
        for pattern in &self.intercept_glob {
            interceptors.push(Interceptor::glob(pattern)?);
        }

        for file in files {
            session.add_file(file);
        }
        for interceptor in interceptors {
            session.add_interceptor(interceptor);
        }
        Ok(())
    }
}

impl FixtureFile {
    pub fn to_fake_file(&self) -> Result<FakeFile> {
        let mode = FileMode::parse(&self.mode)?;
        let content = match (&self.content, &self.content_base64) {
            (Some(_), Some(_)) => {
                return Err(fixture_error(format!(
                    "'{}': content and content_base64 are mutually exclusive",
                    self.path
                )))
            }
            (Some(text), None) => FileContent::Text(text.clone()),
            (None, Some(encoded)) => {
                use base64::Engine;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| fixture_error(format!("'{}': base64 decode error: {}", self.path, e)))?;
                FileContent::Binary(bytes)
            }
            (None, None) => FileContent::default(),
        };
        let file = FakeFile::new(&self.path, mode, content);
        match &self.encoding {
            Some(name) => Ok(file.with_encoding(TextEncoding::parse(name)?)),
            None => Ok(file),
        }
    }
}

impl FakeIoSession {
    /// Build a new session from a fixture.
    pub fn from_fixture(fixture: &Fixture) -> Result<Self> {
        let session = Self::new();
        fixture.apply(&session)?;
        Ok(session)
    }
}
