//! Built-in object policies, one per object class.

pub mod certificate;
pub mod common;
pub mod data;
pub mod private_key;
pub mod public_key;
pub mod secret_key;

use vtok_types::ObjectClass;

use crate::policy::ObjectPolicy;

static DATA: data::DataPolicy = data::DataPolicy;
static CERTIFICATE: certificate::CertificatePolicy = certificate::CertificatePolicy;
static PUBLIC_KEY: public_key::PublicKeyPolicy = public_key::PublicKeyPolicy;
static PRIVATE_KEY: private_key::PrivateKeyPolicy = private_key::PrivateKeyPolicy;
static SECRET_KEY: secret_key::SecretKeyPolicy = secret_key::SecretKeyPolicy;
static COMMON: common::CommonPolicy = common::CommonPolicy;

/// Select the policy for an object class.
///
/// This is the only place class-to-policy dispatch happens.
pub fn policy_for(class: ObjectClass) -> &'static dyn ObjectPolicy {
    match class {
        ObjectClass::Data => &DATA,
        ObjectClass::Certificate => &CERTIFICATE,
        ObjectClass::PublicKey => &PUBLIC_KEY,
        ObjectClass::PrivateKey => &PRIVATE_KEY,
        ObjectClass::SecretKey => &SECRET_KEY,
        ObjectClass::Other(_) => &COMMON,
    }
}
