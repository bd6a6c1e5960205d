use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::class::ObjectClass;

/// Numeric attribute identifier (the `CKA_*` value space).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeType(pub u64);

/// Expected value shape for an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Ulong,
    Bytes,
    Class,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Ulong => write!(f, "ulong"),
            Self::Bytes => write!(f, "bytes"),
            Self::Class => write!(f, "class"),
        }
    }
}

macro_rules! attribute_types {
    ($( $(#[$doc:meta])* $name:ident = $value:literal, $label:literal, $kind:ident; )*) => {
        impl AttributeType {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($value);
            )*

            /// The `CKA_*` name, if this is a known attribute.
            pub fn name(&self) -> Option<&'static str> {
                match self.0 {
                    $( $value => Some($label), )*
                    _ => None,
                }
            }

            /// The value kind a known attribute must carry.
            ///
            /// Returns `None` for attributes outside the known set
            /// (vendor-defined or unrecognized identifiers).
            pub fn value_kind(&self) -> Option<ValueKind> {
                match self.0 {
                    $( $value => Some(ValueKind::$kind), )*
                    _ => None,
                }
            }
        }
    };
}

attribute_types! {
    CLASS = 0x0000, "CKA_CLASS", Class;
    TOKEN = 0x0001, "CKA_TOKEN", Bool;
    PRIVATE = 0x0002, "CKA_PRIVATE", Bool;
    LABEL = 0x0003, "CKA_LABEL", Bytes;
    APPLICATION = 0x0010, "CKA_APPLICATION", Bytes;
    VALUE = 0x0011, "CKA_VALUE", Bytes;
    OBJECT_ID = 0x0012, "CKA_OBJECT_ID", Bytes;
    CERTIFICATE_TYPE = 0x0080, "CKA_CERTIFICATE_TYPE", Ulong;
    ISSUER = 0x0081, "CKA_ISSUER", Bytes;
    SERIAL_NUMBER = 0x0082, "CKA_SERIAL_NUMBER", Bytes;
    TRUSTED = 0x0086, "CKA_TRUSTED", Bool;
    CERTIFICATE_CATEGORY = 0x0087, "CKA_CERTIFICATE_CATEGORY", Ulong;
    CHECK_VALUE = 0x0090, "CKA_CHECK_VALUE", Bytes;
    KEY_TYPE = 0x0100, "CKA_KEY_TYPE", Ulong;
    SUBJECT = 0x0101, "CKA_SUBJECT", Bytes;
    ID = 0x0102, "CKA_ID", Bytes;
    SENSITIVE = 0x0103, "CKA_SENSITIVE", Bool;
    ENCRYPT = 0x0104, "CKA_ENCRYPT", Bool;
    DECRYPT = 0x0105, "CKA_DECRYPT", Bool;
    WRAP = 0x0106, "CKA_WRAP", Bool;
    UNWRAP = 0x0107, "CKA_UNWRAP", Bool;
    SIGN = 0x0108, "CKA_SIGN", Bool;
    SIGN_RECOVER = 0x0109, "CKA_SIGN_RECOVER", Bool;
    VERIFY = 0x010A, "CKA_VERIFY", Bool;
    VERIFY_RECOVER = 0x010B, "CKA_VERIFY_RECOVER", Bool;
    DERIVE = 0x010C, "CKA_DERIVE", Bool;
    START_DATE = 0x0110, "CKA_START_DATE", Bytes;
    END_DATE = 0x0111, "CKA_END_DATE", Bytes;
    MODULUS = 0x0120, "CKA_MODULUS", Bytes;
    MODULUS_BITS = 0x0121, "CKA_MODULUS_BITS", Ulong;
    PUBLIC_EXPONENT = 0x0122, "CKA_PUBLIC_EXPONENT", Bytes;
    PRIVATE_EXPONENT = 0x0123, "CKA_PRIVATE_EXPONENT", Bytes;
    PRIME_1 = 0x0124, "CKA_PRIME_1", Bytes;
    PRIME_2 = 0x0125, "CKA_PRIME_2", Bytes;
    EXPONENT_1 = 0x0126, "CKA_EXPONENT_1", Bytes;
    EXPONENT_2 = 0x0127, "CKA_EXPONENT_2", Bytes;
    COEFFICIENT = 0x0128, "CKA_COEFFICIENT", Bytes;
    VALUE_LEN = 0x0161, "CKA_VALUE_LEN", Ulong;
    EXTRACTABLE = 0x0162, "CKA_EXTRACTABLE", Bool;
    LOCAL = 0x0163, "CKA_LOCAL", Bool;
    NEVER_EXTRACTABLE = 0x0164, "CKA_NEVER_EXTRACTABLE", Bool;
    ALWAYS_SENSITIVE = 0x0165, "CKA_ALWAYS_SENSITIVE", Bool;
    KEY_GEN_MECHANISM = 0x0166, "CKA_KEY_GEN_MECHANISM", Ulong;
    MODIFIABLE = 0x0170, "CKA_MODIFIABLE", Bool;
    EC_PARAMS = 0x0180, "CKA_EC_PARAMS", Bytes;
    EC_POINT = 0x0181, "CKA_EC_POINT", Bytes;
    ALWAYS_AUTHENTICATE = 0x0202, "CKA_ALWAYS_AUTHENTICATE", Bool;
    WRAP_WITH_TRUSTED = 0x0210, "CKA_WRAP_WITH_TRUSTED", Bool;
}

impl AttributeType {
    /// First identifier of the vendor-defined range.
    pub const VENDOR_DEFINED: Self = Self(0x8000_0000);

    /// Returns `true` for identifiers in the vendor-defined range.
    pub fn is_vendor_defined(&self) -> bool {
        self.0 >= Self::VENDOR_DEFINED.0
    }
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeType({self})")
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{:#x}", self.0),
        }
    }
}

/// A typed attribute value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Ulong(u64),
    Bytes(Vec<u8>),
    Class(ObjectClass),
}

impl AttributeValue {
    /// The shape of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Ulong(_) => ValueKind::Ulong,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Class(_) => ValueKind::Class,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_ulong(&self) -> Option<u64> {
        match self {
            Self::Ulong(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<ObjectClass> {
        match self {
            Self::Class(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Ulong(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }
}

impl From<ObjectClass> for AttributeValue {
    fn from(value: ObjectClass) -> Self {
        Self::Class(value)
    }
}

impl Zeroize for AttributeValue {
    fn zeroize(&mut self) {
        match self {
            Self::Bool(b) => *b = false,
            Self::Ulong(v) => v.zeroize(),
            Self::Bytes(bytes) => bytes.zeroize(),
            Self::Class(_) => {}
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Ulong(v) => write!(f, "Ulong({v})"),
            // Only a short prefix: values may be key material.
            Self::Bytes(bytes) if bytes.len() > 8 => {
                write!(f, "Bytes({}..; {} bytes)", hex::encode(&bytes[..4]), bytes.len())
            }
            Self::Bytes(bytes) => write!(f, "Bytes({})", hex::encode(bytes)),
            Self::Class(c) => write!(f, "Class({c})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_attribute_names() {
        assert_eq!(AttributeType::CLASS.name(), Some("CKA_CLASS"));
        assert_eq!(AttributeType::WRAP_WITH_TRUSTED.name(), Some("CKA_WRAP_WITH_TRUSTED"));
        assert_eq!(AttributeType(0x9999).name(), None);
    }

    #[test]
    fn display_falls_back_to_hex() {
        assert_eq!(AttributeType::LABEL.to_string(), "CKA_LABEL");
        assert_eq!(AttributeType(0x8000_0001).to_string(), "0x80000001");
    }

    #[test]
    fn value_kinds_for_known_attributes() {
        assert_eq!(AttributeType::CLASS.value_kind(), Some(ValueKind::Class));
        assert_eq!(AttributeType::TOKEN.value_kind(), Some(ValueKind::Bool));
        assert_eq!(AttributeType::KEY_TYPE.value_kind(), Some(ValueKind::Ulong));
        assert_eq!(AttributeType::VALUE.value_kind(), Some(ValueKind::Bytes));
        assert_eq!(AttributeType::VENDOR_DEFINED.value_kind(), None);
    }

    #[test]
    fn vendor_range() {
        assert!(AttributeType(0x8000_0042).is_vendor_defined());
        assert!(!AttributeType::MODIFIABLE.is_vendor_defined());
    }

    #[test]
    fn value_accessors() {
        assert_eq!(AttributeValue::from(true).as_bool(), Some(true));
        assert_eq!(AttributeValue::from(7u64).as_ulong(), Some(7));
        assert_eq!(AttributeValue::from("abc").as_bytes(), Some(&b"abc"[..]));
        assert_eq!(
            AttributeValue::from(ObjectClass::Data).as_class(),
            Some(ObjectClass::Data)
        );
        assert_eq!(AttributeValue::from(true).as_ulong(), None);
    }

    #[test]
    fn zeroize_clears_bytes() {
        let mut value = AttributeValue::Bytes(vec![0xAA; 16]);
        value.zeroize();
        assert_eq!(value, AttributeValue::Bytes(Vec::new()));
    }

    #[test]
    fn debug_abbreviates_long_bytes() {
        let value = AttributeValue::Bytes(vec![0xAB; 32]);
        let debug = format!("{value:?}");
        assert!(debug.contains("32 bytes"));
        assert!(!debug.contains(&"ab".repeat(16)));
    }
}
