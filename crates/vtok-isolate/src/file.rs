use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use zeroize::Zeroize;

use crate::credential::IsolateCredential;
use crate::error::IsolateResult;
use crate::manager::{current_user_name, validate_user, IsolateCredentialManager};

/// Credential manager keeping one file per user in a directory.
///
/// Each file holds the raw credential bytes. Files are replaced atomically
/// and, on Unix, readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileIsolateCredentialManager {
    dir: PathBuf,
    current_user: Option<String>,
}

impl FileIsolateCredentialManager {
    /// Manager rooted at `dir`, acting for the user named by the environment.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current_user: current_user_name(),
        }
    }

    /// Manager rooted at `dir`, acting for `user`.
    pub fn for_user(dir: impl Into<PathBuf>, user: &str) -> IsolateResult<Self> {
        validate_user(user)?;
        Ok(Self {
            dir: dir.into(),
            current_user: Some(user.to_string()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    fn credential_path(&self, user: &str) -> IsolateResult<PathBuf> {
        validate_user(user)?;
        Ok(self.dir.join(user))
    }
}

impl IsolateCredentialManager for FileIsolateCredentialManager {
    fn current_user_credential(&self) -> IsolateResult<Option<IsolateCredential>> {
        match &self.current_user {
            Some(user) => self.user_credential(user),
            None => {
                debug!("no current user; no isolate credential");
                Ok(None)
            }
        }
    }

    fn user_credential(&self, user: &str) -> IsolateResult<Option<IsolateCredential>> {
        let path = self.credential_path(user)?;
        let mut bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credential = IsolateCredential::from_slice(&bytes);
        bytes.zeroize();
        credential.map(Some)
    }

    fn save_credential(&self, user: &str, credential: &IsolateCredential) -> IsolateResult<()> {
        let path = self.credential_path(user)?;
        fs::create_dir_all(&self.dir)?;

        // NamedTempFile creates files with mode 0600 on Unix.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(credential.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(user, "isolate credential saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::default_isolate_credential;
    use crate::error::IsolateError;

    #[test]
    fn missing_credential_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileIsolateCredentialManager::for_user(dir.path(), "alice").unwrap();
        assert!(manager.user_credential("alice").unwrap().is_none());
        assert!(manager.current_user_credential().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileIsolateCredentialManager::for_user(dir.path().join("isolates"), "alice")
            .unwrap();
        let credential = IsolateCredential::generate();
        manager.save_credential("alice", &credential).unwrap();

        assert_eq!(manager.user_credential("alice").unwrap(), Some(credential.clone()));
        assert_eq!(manager.current_user_credential().unwrap(), Some(credential.clone()));
        let raw = fs::read(dir.path().join("isolates/alice")).unwrap();
        assert_eq!(raw.as_slice(), credential.as_bytes());
    }

    #[test]
    fn last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileIsolateCredentialManager::for_user(dir.path(), "bob").unwrap();
        manager.save_credential("bob", &IsolateCredential::generate()).unwrap();
        manager.save_credential("bob", &default_isolate_credential()).unwrap();
        assert!(manager.user_credential("bob").unwrap().unwrap().is_default());
    }

    #[test]
    fn invalid_user_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FileIsolateCredentialManager::for_user(dir.path(), "alice").unwrap();
        assert!(matches!(
            manager.save_credential("../escape", &default_isolate_credential()),
            Err(IsolateError::InvalidUser(_))
        ));
        assert!(matches!(manager.user_credential(""), Err(IsolateError::InvalidUser(_))));
        assert!(FileIsolateCredentialManager::for_user(dir.path(), "..").is_err());
    }

    #[test]
    fn truncated_file_is_invalid_length() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("carol"), [1u8; 5]).unwrap();
        let manager = FileIsolateCredentialManager::for_user(dir.path(), "carol").unwrap();
        assert!(matches!(
            manager.current_user_credential(),
            Err(IsolateError::InvalidLength { actual: 5, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn credential_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let manager = FileIsolateCredentialManager::for_user(dir.path(), "dave").unwrap();
        manager.save_credential("dave", &IsolateCredential::generate()).unwrap();
        let mode = fs::metadata(dir.path().join("dave")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
