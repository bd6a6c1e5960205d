use std::fmt;

use serde::{Deserialize, Serialize};

/// Object class (the `CKO_*` value space).
///
/// The five classes the token understands get their own variant; anything
/// else (hardware features, domain parameters, vendor classes) is carried as
/// `Other` with its raw value so it can still be stored and matched.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectClass {
    Data,
    Certificate,
    PublicKey,
    PrivateKey,
    SecretKey,
    Other(u64),
}

impl ObjectClass {
    /// Parse from the raw `CKO_*` value.
    pub fn from_raw(raw: u64) -> Self {
        match raw {
            0 => Self::Data,
            1 => Self::Certificate,
            2 => Self::PublicKey,
            3 => Self::PrivateKey,
            4 => Self::SecretKey,
            other => Self::Other(other),
        }
    }

    /// The raw `CKO_*` value.
    pub fn to_raw(&self) -> u64 {
        match self {
            Self::Data => 0,
            Self::Certificate => 1,
            Self::PublicKey => 2,
            Self::PrivateKey => 3,
            Self::SecretKey => 4,
            Self::Other(raw) => *raw,
        }
    }

    /// Returns `true` for public, private, and secret keys.
    pub fn is_key(&self) -> bool {
        matches!(self, Self::PublicKey | Self::PrivateKey | Self::SecretKey)
    }
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectClass({self})")
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Certificate => write!(f, "certificate"),
            Self::PublicKey => write!(f, "public-key"),
            Self::PrivateKey => write!(f, "private-key"),
            Self::SecretKey => write!(f, "secret-key"),
            Self::Other(raw) => write!(f, "class:{raw:#x}"),
        }
    }
}

/// Key type values (`CKK_*`) the policies inspect.
pub mod key_type {
    pub const RSA: u64 = 0x0000;
    pub const DSA: u64 = 0x0001;
    pub const EC: u64 = 0x0003;
    pub const GENERIC_SECRET: u64 = 0x0010;
    pub const AES: u64 = 0x001F;
}

/// Certificate type values (`CKC_*`).
pub mod certificate_type {
    pub const X_509: u64 = 0x0000;
    pub const X_509_ATTR_CERT: u64 = 0x0001;
    pub const WTLS: u64 = 0x0002;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip_for_known_classes() {
        for class in [
            ObjectClass::Data,
            ObjectClass::Certificate,
            ObjectClass::PublicKey,
            ObjectClass::PrivateKey,
            ObjectClass::SecretKey,
        ] {
            assert_eq!(ObjectClass::from_raw(class.to_raw()), class);
        }
    }

    #[test]
    fn unknown_raw_is_other() {
        let class = ObjectClass::from_raw(0x8000_0001);
        assert_eq!(class, ObjectClass::Other(0x8000_0001));
        assert_eq!(class.to_raw(), 0x8000_0001);
        assert!(!class.is_key());
    }

    #[test]
    fn key_classes() {
        assert!(ObjectClass::SecretKey.is_key());
        assert!(!ObjectClass::Certificate.is_key());
    }

    #[test]
    fn display() {
        assert_eq!(ObjectClass::PrivateKey.to_string(), "private-key");
        assert_eq!(ObjectClass::Other(5).to_string(), "class:0x5");
    }
}
