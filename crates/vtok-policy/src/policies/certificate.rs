use vtok_types::{certificate_type, AttributeType, Attributes, ObjectClass};

use crate::error::PolicyResult;
use crate::policies::common::{set_storage_defaults, STORAGE_RULES};
use crate::policy::{check_class, require_all, ObjectPolicy};
use crate::rule::AttributePolicy;

const CERTIFICATE_RULES: &[AttributePolicy] = &[
    AttributePolicy::fixed(AttributeType::CERTIFICATE_TYPE).required(),
    AttributePolicy::fixed(AttributeType::TRUSTED),
    AttributePolicy::fixed(AttributeType::CERTIFICATE_CATEGORY),
    AttributePolicy::fixed(AttributeType::CHECK_VALUE),
    AttributePolicy::modifiable(AttributeType::START_DATE),
    AttributePolicy::modifiable(AttributeType::END_DATE),
    AttributePolicy::fixed(AttributeType::SUBJECT),
    AttributePolicy::modifiable(AttributeType::ID),
    AttributePolicy::modifiable(AttributeType::ISSUER),
    AttributePolicy::modifiable(AttributeType::SERIAL_NUMBER),
    AttributePolicy::fixed(AttributeType::VALUE),
];

/// Policy for `CKO_CERTIFICATE` objects.
pub struct CertificatePolicy;

impl ObjectPolicy for CertificatePolicy {
    fn name(&self) -> &str {
        "certificate"
    }

    fn layers(&self) -> &[&'static [AttributePolicy]] {
        &[STORAGE_RULES, CERTIFICATE_RULES]
    }

    fn set_defaults(&self, attributes: &mut Attributes) {
        set_storage_defaults(attributes, false);
        attributes.set_default(AttributeType::TRUSTED, false);
        attributes.set_default(AttributeType::CERTIFICATE_CATEGORY, 0u64);
        attributes.set_default(AttributeType::ID, Vec::<u8>::new());
    }

    fn check_conditional(&self, attributes: &Attributes) -> PolicyResult<()> {
        check_class(attributes, ObjectClass::Certificate)?;
        if attributes.get_ulong(AttributeType::CERTIFICATE_TYPE) == Some(certificate_type::X_509) {
            require_all(
                attributes,
                &[AttributeType::SUBJECT, AttributeType::VALUE],
                "X.509 certificates",
            )?;
        }
        Ok(())
    }
}
