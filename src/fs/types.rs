//! File System Types
//!
//! Core types shared by fake file records, open handles and sessions.

use std::fmt;
use std::io;

use thiserror::Error;

/// Errors raised by fake files, sessions and fixtures.
#[derive(Error, Debug)]
pub enum FakeIoError {
    #[error("EBUSY: file can be opened by only one handle at a time, open '{path}'")]
    AlreadyOpen { path: String },

    #[error("EACCES: open mode '{mode}' is not consistent with read-only file '{path}'")]
    ModeMismatch { path: String, mode: String },

    #[error("EINVAL: file open mode cannot be parsed: '{mode}'")]
    InvalidMode { mode: String },

    #[error("EINVAL: file declared mode must be \"r\" or \"rw\": '{mode}'")]
    InvalidFileMode { mode: String },

    #[error("EBUSY: file is still opened, read value of '{path}'")]
    StillOpen { path: String },

    #[error("file is not opened but closed: '{path}'")]
    NotOpen { path: String },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("unknown encoding: {name}")]
    UnknownEncoding { name: String },

    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("fixture error: {message}")]
    Fixture { message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FakeIoError>;

impl From<FakeIoError> for io::Error {
    fn from(err: FakeIoError) -> Self {
        let kind = match &err {
            FakeIoError::Io(inner) => inner.kind(),
            FakeIoError::ModeMismatch { .. } => io::ErrorKind::PermissionDenied,
            FakeIoError::InvalidMode { .. }
            | FakeIoError::InvalidFileMode { .. }
            | FakeIoError::UnknownEncoding { .. }
            | FakeIoError::Pattern { .. } => io::ErrorKind::InvalidInput,
            FakeIoError::Encoding(_) | FakeIoError::Fixture { .. } => io::ErrorKind::InvalidData,
            FakeIoError::AlreadyOpen { .. }
            | FakeIoError::StillOpen { .. }
            | FakeIoError::NotOpen { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Supported text encodings for stored content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    /// Parse encoding from its name, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf8" | "utf-8" => Some(Self::Utf8),
            "ascii" | "us-ascii" => Some(Self::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Like [`TextEncoding::from_str`], but unknown names are an error.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| FakeIoError::UnknownEncoding { name: s.to_string() })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
        }
    }

    /// Strictly decode bytes. Invalid input is an error, never replaced.
    pub fn decode(&self, bytes: &[u8]) -> std::result::Result<String, EncodingError> {
        match self {
            Self::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(s.to_string()),
                Err(e) => {
                    let position = e.valid_up_to();
                    Err(EncodingError::Decode {
                        encoding: *self,
                        byte: bytes[position],
                        position,
                    })
                }
            },
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(position) => Err(EncodingError::Decode {
                    encoding: *self,
                    byte: bytes[position],
                    position,
                }),
                // All ASCII, so this is valid UTF-8
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            Self::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encode text. Characters the encoding cannot represent are an error.
    pub fn encode(&self, text: &str) -> std::result::Result<Vec<u8>, EncodingError> {
        let limit = match self {
            Self::Utf8 => return Ok(text.as_bytes().to_vec()),
            Self::Ascii => 0x7f,
            Self::Latin1 => 0xff,
        };
        text.chars()
            .enumerate()
            .map(|(position, ch)| {
                if (ch as u32) <= limit {
                    Ok(ch as u32 as u8)
                } else {
                    Err(EncodingError::Encode { encoding: *self, ch, position })
                }
            })
            .collect()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoding failure with the offending byte or character
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("'{encoding}' codec can't decode byte 0x{byte:02x} in position {position}")]
    Decode { encoding: TextEncoding, byte: u8, position: usize },

    #[error("'{encoding}' codec can't encode character {ch:?} in position {position}")]
    Encode { encoding: TextEncoding, ch: char, position: usize },
}

/// File content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn is_empty(&self) -> bool {
        match self {
            FileContent::Text(s) => s.is_empty(),
            FileContent::Binary(b) => b.is_empty(),
        }
    }

    /// Bytes of the content; text is encoded with `encoding` (UTF-8 when `None`).
    pub fn to_bytes(&self, encoding: Option<TextEncoding>) -> std::result::Result<Vec<u8>, EncodingError> {
        match self {
            FileContent::Binary(bytes) => Ok(bytes.clone()),
            FileContent::Text(text) => encoding.unwrap_or_default().encode(text),
        }
    }

    /// Text view of the content.
    ///
    /// Binary content is decoded with `encoding` when one is declared. With no
    /// declared encoding the raw bytes are returned untouched.
    pub fn to_text_bytes(&self, encoding: Option<TextEncoding>) -> std::result::Result<Vec<u8>, EncodingError> {
        match (self, encoding) {
            (FileContent::Text(text), _) => Ok(text.as_bytes().to_vec()),
            (FileContent::Binary(bytes), Some(enc)) => enc.decode(bytes).map(String::into_bytes),
            (FileContent::Binary(bytes), None) => Ok(bytes.clone()),
        }
    }
}

impl Default for FileContent {
    fn default() -> Self {
        FileContent::Text(String::new())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(v: Vec<u8>) -> Self {
        FileContent::Binary(v)
    }
}

impl From<&[u8]> for FileContent {
    fn from(v: &[u8]) -> Self {
        FileContent::Binary(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for FileContent {
    fn from(v: &[u8; N]) -> Self {
        FileContent::Binary(v.to_vec())
    }
}

/// Replace backslashes with forward slashes. No other rewriting happens.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_encoding_from_str() {
        assert_eq!(TextEncoding::from_str("utf8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_str("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_str("US-ASCII"), Some(TextEncoding::Ascii));
        assert_eq!(TextEncoding::from_str("iso_8859_1"), Some(TextEncoding::Latin1));
        assert_eq!(TextEncoding::from_str("shift_jis"), None);
        assert!(matches!(
            TextEncoding::parse("ebcdic"),
            Err(FakeIoError::UnknownEncoding { name }) if name == "ebcdic"
        ));
    }

    #[test]
    fn test_utf8_decode_reports_position() {
        let err = TextEncoding::Utf8.decode(b"ab\xffcd").unwrap_err();
        assert_eq!(
            err,
            EncodingError::Decode { encoding: TextEncoding::Utf8, byte: 0xff, position: 2 }
        );
        assert_eq!(err.to_string(), "'utf-8' codec can't decode byte 0xff in position 2");
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        assert_eq!(TextEncoding::Ascii.decode(b"plain").unwrap(), "plain");
        assert!(TextEncoding::Ascii.decode("caf\u{e9}".as_bytes()).is_err());
        assert!(TextEncoding::Ascii.encode("caf\u{e9}").is_err());
    }

    #[test]
    fn test_latin1_round_trips_every_byte() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = TextEncoding::Latin1.decode(&bytes).unwrap();
        assert_eq!(text.chars().count(), 256);
        assert_eq!(TextEncoding::Latin1.encode(&text).unwrap(), bytes);
        assert!(matches!(
            TextEncoding::Latin1.encode("\u{3042}"),
            Err(EncodingError::Encode { ch: '\u{3042}', position: 0, .. })
        ));
    }

    #[test]
    fn test_shift_jis_bytes_fail_utf8_decode() {
        // "あいう" in Shift_JIS
        let sjis = [0x82, 0xa0, 0x82, 0xa2, 0x82, 0xa4];
        let content = FileContent::from(sjis.to_vec());
        assert_eq!(content.to_text_bytes(None).unwrap(), sjis.to_vec());
        assert!(content.to_text_bytes(Some(TextEncoding::Utf8)).is_err());
    }

    #[test]
    fn test_text_content_encoded_for_binary_view() {
        let content = FileContent::from("\u{e9}t\u{e9}");
        assert_eq!(content.to_bytes(None).unwrap(), "\u{e9}t\u{e9}".as_bytes());
        assert_eq!(content.to_bytes(Some(TextEncoding::Latin1)).unwrap(), vec![0xe9, b't', 0xe9]);
    }

    #[test]
    fn test_normalize_path_only_swaps_separators() {
        assert_eq!(normalize_path("C:\\memfile\\a.txt"), "C:/memfile/a.txt");
        assert_eq!(normalize_path("/memfile/../a.txt"), "/memfile/../a.txt");
        assert_eq!(normalize_path("relative\\dir/"), "relative/dir/");
    }

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: io::Error = FakeIoError::ModeMismatch {
            path: "/x".into(),
            mode: "w".into(),
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let err: io::Error = FakeIoError::Io(io::Error::from(io::ErrorKind::NotFound)).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err: io::Error = FakeIoError::Encoding(EncodingError::Decode {
            encoding: TextEncoding::Utf8,
            byte: 0x80,
            position: 0,
        })
        .into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
