use vtok_types::{key_type, AttributeType, Attributes, ObjectClass};

use crate::error::PolicyResult;
use crate::policies::common::{set_key_defaults, set_storage_defaults, KEY_RULES, STORAGE_RULES};
use crate::policy::{check_class, require_all, ObjectPolicy};
use crate::rule::AttributePolicy;

const PUBLIC_KEY_RULES: &[AttributePolicy] = &[
    AttributePolicy::modifiable(AttributeType::SUBJECT),
    AttributePolicy::modifiable(AttributeType::ENCRYPT),
    AttributePolicy::modifiable(AttributeType::VERIFY),
    AttributePolicy::modifiable(AttributeType::VERIFY_RECOVER),
    AttributePolicy::modifiable(AttributeType::WRAP),
    AttributePolicy::fixed(AttributeType::TRUSTED),
    AttributePolicy::fixed(AttributeType::MODULUS),
    AttributePolicy::fixed(AttributeType::MODULUS_BITS),
    AttributePolicy::fixed(AttributeType::PUBLIC_EXPONENT),
    AttributePolicy::fixed(AttributeType::EC_PARAMS),
    AttributePolicy::fixed(AttributeType::EC_POINT),
    AttributePolicy::fixed(AttributeType::VALUE),
];

/// Policy for `CKO_PUBLIC_KEY` objects.
pub struct PublicKeyPolicy;

impl ObjectPolicy for PublicKeyPolicy {
    fn name(&self) -> &str {
        "public-key"
    }

    fn layers(&self) -> &[&'static [AttributePolicy]] {
        &[STORAGE_RULES, KEY_RULES, PUBLIC_KEY_RULES]
    }

    fn set_defaults(&self, attributes: &mut Attributes) {
        set_storage_defaults(attributes, false);
        set_key_defaults(attributes);
        attributes.set_default(AttributeType::SUBJECT, Vec::<u8>::new());
        attributes.set_default(AttributeType::ENCRYPT, false);
        attributes.set_default(AttributeType::VERIFY, false);
        attributes.set_default(AttributeType::VERIFY_RECOVER, false);
        attributes.set_default(AttributeType::WRAP, false);
        attributes.set_default(AttributeType::TRUSTED, false);
    }

    fn check_conditional(&self, attributes: &Attributes) -> PolicyResult<()> {
        check_class(attributes, ObjectClass::PublicKey)?;
        match attributes.get_ulong(AttributeType::KEY_TYPE) {
            Some(key_type::RSA) => require_all(
                attributes,
                &[AttributeType::MODULUS, AttributeType::PUBLIC_EXPONENT],
                "RSA public keys",
            ),
            Some(key_type::EC) => require_all(
                attributes,
                &[AttributeType::EC_PARAMS, AttributeType::EC_POINT],
                "EC public keys",
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;

    fn rsa_public() -> Attributes {
        Attributes::new()
            .with(AttributeType::CLASS, ObjectClass::PublicKey)
            .with(AttributeType::KEY_TYPE, key_type::RSA)
            .with(AttributeType::MODULUS, vec![0xC5u8; 256])
            .with(AttributeType::PUBLIC_EXPONENT, vec![1u8, 0, 1])
    }

    #[test]
    fn rsa_public_key_defaults() {
        let attrs = PublicKeyPolicy.validate_create(&rsa_public()).unwrap();
        assert!(!attrs.is_private());
        assert_eq!(attrs.get_bool(AttributeType::VERIFY), Some(false));
        assert_eq!(attrs.get_bool(AttributeType::LOCAL), Some(false));
        assert_eq!(attrs.get_bytes(AttributeType::ID), Some(&b""[..]));
    }

    #[test]
    fn rsa_requires_modulus() {
        let mut attrs = rsa_public();
        attrs.remove(AttributeType::MODULUS);
        let err = PublicKeyPolicy.validate_create(&attrs).unwrap_err();
        assert_eq!(err.attribute(), AttributeType::MODULUS);
    }

    #[test]
    fn ec_requires_params_and_point() {
        let attrs = Attributes::new()
            .with(AttributeType::CLASS, ObjectClass::PublicKey)
            .with(AttributeType::KEY_TYPE, key_type::EC)
            .with(AttributeType::EC_PARAMS, vec![6u8, 8]);
        let err = PublicKeyPolicy.validate_create(&attrs).unwrap_err();
        assert_eq!(err.attribute(), AttributeType::EC_POINT);
    }

    #[test]
    fn key_type_required() {
        let mut attrs = rsa_public();
        attrs.remove(AttributeType::KEY_TYPE);
        let err = PublicKeyPolicy.validate_create(&attrs).unwrap_err();
        assert_eq!(err.attribute(), AttributeType::KEY_TYPE);
    }

    #[test]
    fn local_cannot_be_supplied() {
        let attrs = rsa_public().with(AttributeType::LOCAL, true);
        let err = PublicKeyPolicy.validate_create(&attrs).unwrap_err();
        assert_eq!(err, PolicyError::AttributeReadOnly(AttributeType::LOCAL));
    }

    #[test]
    fn usage_flags_modifiable_key_material_fixed() {
        let current = PublicKeyPolicy.validate_create(&rsa_public()).unwrap();
        assert!(PublicKeyPolicy
            .validate_modify(&current, &Attributes::new().with(AttributeType::VERIFY, true))
            .is_ok());
        let err = PublicKeyPolicy
            .validate_modify(&current, &Attributes::new().with(AttributeType::MODULUS, vec![1u8]))
            .unwrap_err();
        assert_eq!(err, PolicyError::AttributeReadOnly(AttributeType::MODULUS));
    }

    #[test]
    fn nothing_is_sensitive() {
        let attrs = PublicKeyPolicy.validate_create(&rsa_public()).unwrap();
        assert!(!PublicKeyPolicy.is_sensitive(AttributeType::MODULUS, &attrs));
    }
}
