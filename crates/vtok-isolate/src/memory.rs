use std::collections::HashMap;
use std::sync::RwLock;

use crate::credential::IsolateCredential;
use crate::error::IsolateResult;
use crate::manager::{validate_user, IsolateCredentialManager};

/// In-memory credential manager for tests and embedding.
pub struct InMemoryIsolateCredentialManager {
    current_user: Option<String>,
    credentials: RwLock<HashMap<String, IsolateCredential>>,
}

impl InMemoryIsolateCredentialManager {
    pub fn new(current_user: Option<&str>) -> Self {
        Self {
            current_user: current_user.map(str::to_string),
            credentials: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IsolateCredentialManager for InMemoryIsolateCredentialManager {
    fn current_user_credential(&self) -> IsolateResult<Option<IsolateCredential>> {
        match &self.current_user {
            Some(user) => self.user_credential(user),
            None => Ok(None),
        }
    }

    fn user_credential(&self, user: &str) -> IsolateResult<Option<IsolateCredential>> {
        validate_user(user)?;
        Ok(self
            .credentials
            .read()
            .expect("lock poisoned")
            .get(user)
            .cloned())
    }

    fn save_credential(&self, user: &str, credential: &IsolateCredential) -> IsolateResult<()> {
        validate_user(user)?;
        self.credentials
            .write()
            .expect("lock poisoned")
            .insert(user.to_string(), credential.clone());
        Ok(())
    }
}
