use vtok_types::{key_type, AttributeType, Attributes, ObjectClass};

use crate::error::PolicyResult;
use crate::policies::common::{
    set_key_defaults, set_protected_key_defaults, set_storage_defaults, KEY_RULES, STORAGE_RULES,
};
use crate::policy::{check_class, require_all, ObjectPolicy};
use crate::rule::{AttributePolicy, Ratchet};

const PRIVATE_KEY_RULES: &[AttributePolicy] = &[
    AttributePolicy::modifiable(AttributeType::SUBJECT),
    AttributePolicy::modifiable(AttributeType::SENSITIVE),
    AttributePolicy::modifiable(AttributeType::DECRYPT),
    AttributePolicy::modifiable(AttributeType::SIGN),
    AttributePolicy::modifiable(AttributeType::SIGN_RECOVER),
    AttributePolicy::modifiable(AttributeType::UNWRAP),
    AttributePolicy::modifiable(AttributeType::EXTRACTABLE),
    AttributePolicy::computed(AttributeType::ALWAYS_SENSITIVE),
    AttributePolicy::computed(AttributeType::NEVER_EXTRACTABLE),
    AttributePolicy::modifiable(AttributeType::WRAP_WITH_TRUSTED),
    AttributePolicy::modifiable(AttributeType::ALWAYS_AUTHENTICATE),
    AttributePolicy::fixed(AttributeType::MODULUS),
    AttributePolicy::fixed(AttributeType::PUBLIC_EXPONENT),
    AttributePolicy::fixed(AttributeType::PRIVATE_EXPONENT).sensitive(),
    AttributePolicy::fixed(AttributeType::PRIME_1).sensitive(),
    AttributePolicy::fixed(AttributeType::PRIME_2).sensitive(),
    AttributePolicy::fixed(AttributeType::EXPONENT_1).sensitive(),
    AttributePolicy::fixed(AttributeType::EXPONENT_2).sensitive(),
    AttributePolicy::fixed(AttributeType::COEFFICIENT).sensitive(),
    AttributePolicy::fixed(AttributeType::EC_PARAMS),
    AttributePolicy::fixed(AttributeType::VALUE).sensitive(),
];

/// One-way transitions shared by keys that carry secret material.
pub(crate) const PROTECTED_KEY_RATCHETS: &[Ratchet] = &[
    Ratchet::new(AttributeType::SENSITIVE, false, true),
    Ratchet::new(AttributeType::EXTRACTABLE, true, false),
    Ratchet::new(AttributeType::WRAP_WITH_TRUSTED, false, true),
];

/// Policy for `CKO_PRIVATE_KEY` objects.
pub struct PrivateKeyPolicy;

impl ObjectPolicy for PrivateKeyPolicy {
    fn name(&self) -> &str {
        "private-key"
    }

    fn layers(&self) -> &[&'static [AttributePolicy]] {
        &[STORAGE_RULES, KEY_RULES, PRIVATE_KEY_RULES]
    }

    fn ratchets(&self) -> &[Ratchet] {
        PROTECTED_KEY_RATCHETS
    }

    fn set_defaults(&self, attributes: &mut Attributes) {
        set_storage_defaults(attributes, true);
        set_key_defaults(attributes);
        set_protected_key_defaults(attributes);
        attributes.set_default(AttributeType::SUBJECT, Vec::<u8>::new());
        attributes.set_default(AttributeType::DECRYPT, false);
        attributes.set_default(AttributeType::SIGN, false);
        attributes.set_default(AttributeType::SIGN_RECOVER, false);
        attributes.set_default(AttributeType::UNWRAP, false);
        attributes.set_default(AttributeType::ALWAYS_AUTHENTICATE, false);
    }

    fn check_conditional(&self, attributes: &Attributes) -> PolicyResult<()> {
        check_class(attributes, ObjectClass::PrivateKey)?;
        match attributes.get_ulong(AttributeType::KEY_TYPE) {
            Some(key_type::RSA) => require_all(
                attributes,
                &[AttributeType::MODULUS, AttributeType::PRIVATE_EXPONENT],
                "RSA private keys",
            ),
            Some(key_type::EC) => require_all(
                attributes,
                &[AttributeType::EC_PARAMS, AttributeType::VALUE],
                "EC private keys",
            ),
            _ => Ok(()),
        }
    }
}
