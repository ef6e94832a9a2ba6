//! Registry access credential and its file-backed store

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::CredentialError;

/// Bearer token sent to the registry. Cheap to clone, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref().trim()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Persists a single token in a text file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. Missing file or blank content yields `None`.
    pub async fn load(&self) -> Option<Credential> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let credential = Credential::new(content);
                (!credential.is_blank()).then_some(credential)
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored token");
                None
            }
        }
    }

    /// Overwrite the stored token.
    pub async fn save(&self, token: &str) -> Result<Credential, CredentialError> {
        let credential = Credential::new(token);
        if credential.is_blank() {
            return Err(CredentialError::Blank);
        }

        tokio::fs::write(&self.path, credential.expose())
            .await
            .map_err(|source| CredentialError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        info!(path = %self.path.display(), "Stored registry token");
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("super-secret");
        assert!(!format!("{:?}", credential).contains("super-secret"));
        assert_eq!(credential.expose(), "super-secret");
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.txt"));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_trims() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.txt"));

        store.save("  abc123\n").await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.expose(), "abc123");
    }

    #[tokio::test]
    async fn test_blank_token_rejected_and_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.txt"));

        assert!(matches!(store.save("   ").await, Err(CredentialError::Blank)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_blank_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "\n  \n").unwrap();
        assert!(TokenStore::new(path).load().await.is_none());
    }
}
