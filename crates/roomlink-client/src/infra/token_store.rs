//! Session token persistence.
//!
//! The server identifies a returning client by one opaque token. An empty or
//! missing token means "no identity yet"; the server then issues a new one.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use parking_lot::Mutex;
use roomlink_core::error::{Result, RoomlinkError};

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
}

/// Token kept in a single file next to the working directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RoomlinkError::Internal(format!(
                "read token {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        fs::write(&self.path, token).map_err(|e| {
            RoomlinkError::Internal(format!("write token {}: {e}", self.path.display()))
        })
    }
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn missing_file_means_no_token() {
        let path = std::env::temp_dir().join(format!("roomlink-missing-{}", std::process::id()));
        let store = FileTokenStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_overwrites() {
        let path = std::env::temp_dir().join(format!("roomlink-token-{}", std::process::id()));
        let store = FileTokenStore::new(&path);

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));

        store.save("").unwrap();
        assert_eq!(store.load().unwrap(), None);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn file_store_keeps_token_bytes() {
        let path = std::env::temp_dir().join(format!("roomlink-opaque-{}", std::process::id()));
        let store = FileTokenStore::new(&path);

        store.save(" padded token\n").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some(" padded token\n"));

        let _ = fs::remove_file(path);
    }
}
