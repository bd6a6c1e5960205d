use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{IsolateError, IsolateResult};

/// Length of an isolate credential in bytes.
pub const CREDENTIAL_LEN: usize = 16;

/// Secret that identifies an isolate.
///
/// Bytes are wiped on drop, never shown by `Debug`, and compared in
/// constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IsolateCredential([u8; CREDENTIAL_LEN]);

/// Credential of the default isolate: all zeroes.
pub fn default_isolate_credential() -> IsolateCredential {
    IsolateCredential([0u8; CREDENTIAL_LEN])
}

impl IsolateCredential {
    pub fn new(bytes: [u8; CREDENTIAL_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a credential from a slice of exactly [`CREDENTIAL_LEN`] bytes.
    ///
    /// The bytes are copied straight into the credential; no intermediate
    /// array is left behind.
    pub fn from_slice(bytes: &[u8]) -> IsolateResult<Self> {
        if bytes.len() != CREDENTIAL_LEN {
            return Err(IsolateError::InvalidLength {
                expected: CREDENTIAL_LEN,
                actual: bytes.len(),
            });
        }
        let mut credential = Self([0u8; CREDENTIAL_LEN]);
        credential.0.copy_from_slice(bytes);
        Ok(credential)
    }

    /// Parse a hex string of [`CREDENTIAL_LEN`] bytes.
    pub fn from_hex(text: &str) -> IsolateResult<Self> {
        let mut bytes = hex::decode(text.trim()).map_err(|_| IsolateError::InvalidLength {
            expected: CREDENTIAL_LEN,
            actual: text.trim().len() / 2,
        })?;
        let credential = Self::from_slice(&bytes);
        bytes.zeroize();
        credential
    }

    /// A fresh random credential.
    pub fn generate() -> Self {
        let mut credential = Self([0u8; CREDENTIAL_LEN]);
        rand::Rng::fill(&mut rand::thread_rng(), &mut credential.0);
        credential
    }

    pub fn as_bytes(&self) -> &[u8; CREDENTIAL_LEN] {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        *self == default_isolate_credential()
    }
}

impl PartialEq for IsolateCredential {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for IsolateCredential {}

impl fmt::Debug for IsolateCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IsolateCredential(<redacted>)")
    }
}
