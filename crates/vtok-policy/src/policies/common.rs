use vtok_types::{AttributeType, Attributes};

use crate::policy::ObjectPolicy;
use crate::rule::AttributePolicy;

/// Storage attributes shared by every object class.
pub const STORAGE_RULES: &[AttributePolicy] = &[
    AttributePolicy::fixed(AttributeType::CLASS).required(),
    AttributePolicy::fixed(AttributeType::TOKEN),
    AttributePolicy::fixed(AttributeType::PRIVATE),
    AttributePolicy::fixed(AttributeType::MODIFIABLE),
    AttributePolicy::modifiable(AttributeType::LABEL),
];

/// Attributes shared by public, private, and secret keys.
pub const KEY_RULES: &[AttributePolicy] = &[
    AttributePolicy::fixed(AttributeType::KEY_TYPE).required(),
    AttributePolicy::modifiable(AttributeType::ID),
    AttributePolicy::modifiable(AttributeType::START_DATE),
    AttributePolicy::modifiable(AttributeType::END_DATE),
    AttributePolicy::modifiable(AttributeType::DERIVE),
    AttributePolicy::computed(AttributeType::LOCAL),
    AttributePolicy::computed(AttributeType::KEY_GEN_MECHANISM),
];

/// Defaults for the storage attributes.
pub fn set_storage_defaults(attributes: &mut Attributes, private_default: bool) {
    attributes.set_default(AttributeType::TOKEN, false);
    attributes.set_default(AttributeType::PRIVATE, private_default);
    attributes.set_default(AttributeType::MODIFIABLE, true);
    attributes.set_default(AttributeType::LABEL, Vec::<u8>::new());
}

/// Defaults for the key attributes.
pub fn set_key_defaults(attributes: &mut Attributes) {
    attributes.set_default(AttributeType::ID, Vec::<u8>::new());
    attributes.set_default(AttributeType::START_DATE, Vec::<u8>::new());
    attributes.set_default(AttributeType::END_DATE, Vec::<u8>::new());
    attributes.set_default(AttributeType::DERIVE, false);
    attributes.set_default(AttributeType::LOCAL, false);
}

/// Defaults for keys carrying secret material (private and secret keys).
///
/// `ALWAYS_SENSITIVE` and `NEVER_EXTRACTABLE` record the state at creation
/// and are computed here rather than supplied by callers.
pub fn set_protected_key_defaults(attributes: &mut Attributes) {
    attributes.set_default(AttributeType::SENSITIVE, true);
    attributes.set_default(AttributeType::EXTRACTABLE, false);
    attributes.set_default(AttributeType::WRAP_WITH_TRUSTED, false);
    let sensitive = attributes.get_bool(AttributeType::SENSITIVE).unwrap_or(true);
    let extractable = attributes.get_bool(AttributeType::EXTRACTABLE).unwrap_or(false);
    attributes.set_default(AttributeType::ALWAYS_SENSITIVE, sensitive);
    attributes.set_default(AttributeType::NEVER_EXTRACTABLE, !extractable);
}

/// Policy for classes without a dedicated rule set.
///
/// Only the storage attributes are known; anything else is rejected.
pub struct CommonPolicy;

impl ObjectPolicy for CommonPolicy {
    fn name(&self) -> &str {
        "common"
    }

    fn layers(&self) -> &[&'static [AttributePolicy]] {
        &[STORAGE_RULES]
    }

    fn set_defaults(&self, attributes: &mut Attributes) {
        set_storage_defaults(attributes, false);
    }
}
