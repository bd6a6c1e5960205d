use vtok_types::{AttributeType, Attributes, ObjectClass};

use crate::error::{PolicyError, PolicyResult};
use crate::policies::common::{
    set_key_defaults, set_protected_key_defaults, set_storage_defaults, KEY_RULES, STORAGE_RULES,
};
use crate::policies::private_key::PROTECTED_KEY_RATCHETS;
use crate::policy::{check_class, ObjectPolicy};
use crate::rule::{AttributePolicy, Ratchet};

const SECRET_KEY_RULES: &[AttributePolicy] = &[
    AttributePolicy::modifiable(AttributeType::SENSITIVE),
    AttributePolicy::modifiable(AttributeType::ENCRYPT),
    AttributePolicy::modifiable(AttributeType::DECRYPT),
    AttributePolicy::modifiable(AttributeType::SIGN),
    AttributePolicy::modifiable(AttributeType::VERIFY),
    AttributePolicy::modifiable(AttributeType::WRAP),
    AttributePolicy::modifiable(AttributeType::UNWRAP),
    AttributePolicy::modifiable(AttributeType::EXTRACTABLE),
    AttributePolicy::computed(AttributeType::ALWAYS_SENSITIVE),
    AttributePolicy::computed(AttributeType::NEVER_EXTRACTABLE),
    AttributePolicy::fixed(AttributeType::CHECK_VALUE),
    AttributePolicy::modifiable(AttributeType::WRAP_WITH_TRUSTED),
    AttributePolicy::fixed(AttributeType::TRUSTED),
    AttributePolicy::fixed(AttributeType::VALUE).required().sensitive(),
    AttributePolicy::fixed(AttributeType::VALUE_LEN),
];

/// Policy for `CKO_SECRET_KEY` objects.
pub struct SecretKeyPolicy;

impl ObjectPolicy for SecretKeyPolicy {
    fn name(&self) -> &str {
        "secret-key"
    }

    fn layers(&self) -> &[&'static [AttributePolicy]] {
        &[STORAGE_RULES, KEY_RULES, SECRET_KEY_RULES]
    }

    fn ratchets(&self) -> &[Ratchet] {
        PROTECTED_KEY_RATCHETS
    }

    fn set_defaults(&self, attributes: &mut Attributes) {
        set_storage_defaults(attributes, true);
        set_key_defaults(attributes);
        set_protected_key_defaults(attributes);
        for usage in [
            AttributeType::ENCRYPT,
            AttributeType::DECRYPT,
            AttributeType::SIGN,
            AttributeType::VERIFY,
            AttributeType::WRAP,
            AttributeType::UNWRAP,
        ] {
            attributes.set_default(usage, false);
        }
        attributes.set_default(AttributeType::TRUSTED, false);
        if let Some(len) = attributes.get_bytes(AttributeType::VALUE).map(<[u8]>::len) {
            attributes.set_default(AttributeType::VALUE_LEN, len as u64);
        }
    }

    fn check_conditional(&self, attributes: &Attributes) -> PolicyResult<()> {
        check_class(attributes, ObjectClass::SecretKey)?;
        let value = attributes.get_bytes(AttributeType::VALUE).map(<[u8]>::len);
        match (attributes.get_ulong(AttributeType::VALUE_LEN), value) {
            (Some(declared), Some(actual)) if declared != actual as u64 => Err(PolicyError::invalid(
                AttributeType::VALUE_LEN,
                format!("declares {declared} bytes but the value has {actual}"),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtok_types::key_type;

    fn aes_key() -> Attributes {
        Attributes::new()
            .with(AttributeType::CLASS, ObjectClass::SecretKey)
            .with(AttributeType::KEY_TYPE, key_type::AES)
            .with(AttributeType::VALUE, vec![0x42u8; 32])
    }

    #[test]
    fn value_required() {
        let mut attrs = aes_key();
        attrs.remove(AttributeType::VALUE);
        let err = SecretKeyPolicy.validate_create(&attrs).unwrap_err();
        assert_eq!(err.attribute(), AttributeType::VALUE);
    }

    #[test]
    fn value_len_derived_from_value() {
        let attrs = SecretKeyPolicy.validate_create(&aes_key()).unwrap();
        assert_eq!(attrs.get_ulong(AttributeType::VALUE_LEN), Some(32));
        assert!(attrs.is_private());
    }

    #[test]
    fn mismatched_value_len_rejected() {
        let err = SecretKeyPolicy
            .validate_create(&aes_key().with(AttributeType::VALUE_LEN, 16u64))
            .unwrap_err();
        assert_eq!(err.attribute(), AttributeType::VALUE_LEN);

        let attrs = SecretKeyPolicy
            .validate_create(&aes_key().with(AttributeType::VALUE_LEN, 32u64))
            .unwrap();
        assert_eq!(attrs.get_ulong(AttributeType::VALUE_LEN), Some(32));
    }

    #[test]
    fn value_is_sensitive_by_default() {
        let attrs = SecretKeyPolicy.validate_create(&aes_key()).unwrap();
        assert!(SecretKeyPolicy.is_sensitive(AttributeType::VALUE, &attrs));
        assert!(!SecretKeyPolicy.is_sensitive(AttributeType::LABEL, &attrs));
    }

    #[test]
    fn extractable_key_still_hidden_while_sensitive() {
        let attrs = SecretKeyPolicy
            .validate_create(&aes_key().with(AttributeType::EXTRACTABLE, true))
            .unwrap();
        assert!(SecretKeyPolicy.is_sensitive(AttributeType::VALUE, &attrs));
    }

    #[test]
    fn ratchets_shared_with_private_keys() {
        let current = SecretKeyPolicy
            .validate_create(&aes_key().with(AttributeType::EXTRACTABLE, true))
            .unwrap();
        let lowered = SecretKeyPolicy
            .validate_modify(&current, &Attributes::new().with(AttributeType::EXTRACTABLE, false))
            .unwrap();
        let err = SecretKeyPolicy
            .validate_modify(&lowered, &Attributes::new().with(AttributeType::EXTRACTABLE, true))
            .unwrap_err();
        assert_eq!(err, PolicyError::AttributeReadOnly(AttributeType::EXTRACTABLE));
    }

    #[test]
    fn value_fixed_after_create() {
        let current = SecretKeyPolicy.validate_create(&aes_key()).unwrap();
        let err = SecretKeyPolicy
            .validate_modify(&current, &Attributes::new().with(AttributeType::VALUE, vec![0u8; 32]))
            .unwrap_err();
        assert_eq!(err, PolicyError::AttributeReadOnly(AttributeType::VALUE));
    }
}
