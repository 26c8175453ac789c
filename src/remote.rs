use std::fs;
use std::path::PathBuf;

use thiserror::Error;

/// The remote text plus the opaque version token it was fetched at.
#[derive(Debug, Clone)]
pub struct RemoteSnapshot {
    pub text: String,
    pub version: String,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote source unavailable")]
    Unavailable(#[from] std::io::Error),
    #[error("remote content changed since last fetch (expected {expected}, found {found})")]
    StaleVersion { expected: String, found: String },
}

/// Where the roster file lives. `fetch` returns the current content and a
/// version token; `update` is conditional and must reject the write when
/// the token no longer matches what the remote holds.
pub trait RemoteSource {
    fn fetch(&self) -> Result<RemoteSnapshot, RemoteError>;

    /// Replace the remote content, guarded by `expected_version`. `message`
    /// is a human-readable description of the change for backends that keep
    /// history. Returns the new version token.
    fn update(
        &self,
        text: &str,
        expected_version: &str,
        message: &str,
    ) -> Result<String, RemoteError>;
}

/// File-backed remote. The version token is the blake3 digest of the file
/// content, so a conditional update detects any out-of-band edit.
pub struct FileRemote {
    path: PathBuf,
}

impl FileRemote {
    pub fn new(path: impl Into<PathBuf>) -> FileRemote {
        FileRemote { path: path.into() }
    }
}

fn content_version(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

impl RemoteSource for FileRemote {
    fn fetch(&self) -> Result<RemoteSnapshot, RemoteError> {
        let text = fs::read_to_string(&self.path)?;
        let version = content_version(&text);
        Ok(RemoteSnapshot { text, version })
    }

    fn update(
        &self,
        text: &str,
        expected_version: &str,
        _message: &str,
    ) -> Result<String, RemoteError> {
        let current = fs::read_to_string(&self.path)?;
        let found = content_version(&current);
        if found != expected_version {
            return Err(RemoteError::StaleVersion {
                expected: expected_version.to_string(),
                found,
            });
        }
        fs::write(&self.path, text)?;
        Ok(content_version(text))
    }
}
