use crate::credential::IsolateCredential;
use crate::error::{IsolateError, IsolateResult};

/// Per-user store of isolate credentials.
///
/// Lookups report whether a credential was ever saved and never invent one;
/// callers that want a fresh credential generate and save it explicitly.
pub trait IsolateCredentialManager: Send + Sync {
    /// Credential saved for the user this process runs as.
    fn current_user_credential(&self) -> IsolateResult<Option<IsolateCredential>>;

    /// Credential saved for `user`, or `None` if none was saved.
    fn user_credential(&self, user: &str) -> IsolateResult<Option<IsolateCredential>>;

    /// Save `credential` for `user`, replacing any earlier one.
    fn save_credential(&self, user: &str, credential: &IsolateCredential) -> IsolateResult<()>;
}

/// Reject user names that cannot safely name a credential entry.
pub fn validate_user(user: &str) -> IsolateResult<()> {
    let bad = user.is_empty()
        || user == "."
        || user == ".."
        || user.contains(['/', '\\', '\0']);
    if bad {
        return Err(IsolateError::InvalidUser(user.to_string()));
    }
    Ok(())
}

/// Name of the user this process runs as, from `USER` or `LOGNAME`.
pub fn current_user_name() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| validate_user(name).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_name_validation() {
        for good in ["alice", "svc-token", "user.name", "0"] {
            assert!(validate_user(good).is_ok(), "{good}");
        }
        for bad in ["", ".", "..", "a/b", "..\\x", "nul\0"] {
            assert!(
                matches!(validate_user(bad), Err(IsolateError::InvalidUser(_))),
                "{bad:?}"
            );
        }
    }
}
