use std::fmt;

use vtok_policy::{policy_for, ObjectPolicy};
use vtok_store::StoreKey;
use vtok_types::{AttributeType, Attributes, ObjectClass, ObjectHandle};
use zeroize::Zeroize;

/// A validated object: a handle plus its full attribute set.
///
/// Attribute values are wiped when the object is dropped.
#[derive(Clone)]
pub struct Object {
    handle: ObjectHandle,
    attributes: Attributes,
    store_key: Option<StoreKey>,
}

impl Object {
    pub fn new(handle: ObjectHandle, attributes: Attributes) -> Self {
        Self {
            handle,
            attributes,
            store_key: None,
        }
    }

    pub(crate) fn stored(handle: ObjectHandle, attributes: Attributes, key: StoreKey) -> Self {
        Self {
            handle,
            attributes,
            store_key: Some(key),
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, attribute: AttributeType) -> Option<&vtok_types::AttributeValue> {
        self.attributes.get(attribute)
    }

    /// Key of the persisted copy, for token objects held by a store.
    pub fn store_key(&self) -> Option<StoreKey> {
        self.store_key
    }

    pub fn class(&self) -> Option<ObjectClass> {
        self.attributes.class()
    }

    /// Policy selected by this object's class.
    pub fn policy(&self) -> &'static dyn ObjectPolicy {
        policy_for(self.class().unwrap_or(ObjectClass::Other(u64::MAX)))
    }

    pub fn is_token_object(&self) -> bool {
        self.attributes.is_token_object()
    }

    pub fn is_private(&self) -> bool {
        self.attributes.is_private()
    }

    pub fn is_modifiable(&self) -> bool {
        self.attributes.is_modifiable()
    }

    /// Whether the value of `attribute` must be withheld from readers.
    pub fn is_sensitive(&self, attribute: AttributeType) -> bool {
        self.policy().is_sensitive(attribute, &self.attributes)
    }

    pub(crate) fn replace_attributes(&mut self, attributes: Attributes) {
        let mut old = std::mem::replace(&mut self.attributes, attributes);
        old.zeroize();
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        self.attributes.zeroize();
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("handle", &self.handle)
            .field("class", &self.class())
            .field("token", &self.is_token_object())
            .field("attributes", &self.attributes.len())
            .finish()
    }
}
