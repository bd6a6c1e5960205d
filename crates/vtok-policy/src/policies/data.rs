use vtok_types::{AttributeType, Attributes, ObjectClass};

use crate::error::PolicyResult;
use crate::policies::common::{set_storage_defaults, STORAGE_RULES};
use crate::policy::{check_class, ObjectPolicy};
use crate::rule::AttributePolicy;

const DATA_RULES: &[AttributePolicy] = &[
    AttributePolicy::modifiable(AttributeType::APPLICATION),
    AttributePolicy::modifiable(AttributeType::OBJECT_ID),
    AttributePolicy::modifiable(AttributeType::VALUE),
];

/// Policy for `CKO_DATA` objects.
///
/// Data objects are opaque payloads: attributes outside the known set are
/// stored verbatim.
pub struct DataPolicy;

impl ObjectPolicy for DataPolicy {
    fn name(&self) -> &str {
        "data"
    }

    fn layers(&self) -> &[&'static [AttributePolicy]] {
        &[STORAGE_RULES, DATA_RULES]
    }

    fn accepts_unknown(&self) -> bool {
        true
    }

    fn set_defaults(&self, attributes: &mut Attributes) {
        set_storage_defaults(attributes, false);
        attributes.set_default(AttributeType::APPLICATION, Vec::<u8>::new());
        attributes.set_default(AttributeType::VALUE, Vec::<u8>::new());
    }

    fn check_conditional(&self, attributes: &Attributes) -> PolicyResult<()> {
        check_class(attributes, ObjectClass::Data)
    }
}
