use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::attribute::{AttributeType, AttributeValue};
use crate::class::ObjectClass;
use crate::error::TypeError;

/// An ordered attribute set: the content of an object, a template, or a
/// batch of changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(BTreeMap<AttributeType, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, attribute: AttributeType, value: impl Into<AttributeValue>) -> Self {
        self.0.insert(attribute, value.into());
        self
    }

    /// Insert or replace a value, returning the previous one.
    pub fn set(
        &mut self,
        attribute: AttributeType,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.0.insert(attribute, value.into())
    }

    /// Insert only if the attribute is absent.
    pub fn set_default(&mut self, attribute: AttributeType, value: impl Into<AttributeValue>) {
        self.0.entry(attribute).or_insert_with(|| value.into());
    }

    pub fn get(&self, attribute: AttributeType) -> Option<&AttributeValue> {
        self.0.get(&attribute)
    }

    pub fn remove(&mut self, attribute: AttributeType) -> Option<AttributeValue> {
        self.0.remove(&attribute)
    }

    pub fn contains(&self, attribute: AttributeType) -> bool {
        self.0.contains_key(&attribute)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeType, &AttributeValue)> {
        self.0.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = AttributeType> + '_ {
        self.0.keys().copied()
    }

    /// Boolean value of `attribute`, or `None` when absent or not a bool.
    pub fn get_bool(&self, attribute: AttributeType) -> Option<bool> {
        self.get(attribute).and_then(AttributeValue::as_bool)
    }

    pub fn get_ulong(&self, attribute: AttributeType) -> Option<u64> {
        self.get(attribute).and_then(AttributeValue::as_ulong)
    }

    pub fn get_bytes(&self, attribute: AttributeType) -> Option<&[u8]> {
        self.get(attribute).and_then(AttributeValue::as_bytes)
    }

    /// The object class, if set.
    pub fn class(&self) -> Option<ObjectClass> {
        self.get(AttributeType::CLASS).and_then(AttributeValue::as_class)
    }

    /// The object class, or an error if it was never set.
    pub fn require_class(&self) -> Result<ObjectClass, TypeError> {
        self.class()
            .ok_or(TypeError::MissingAttribute(AttributeType::CLASS))
    }

    /// `CKA_TOKEN`; absent means session-only.
    pub fn is_token_object(&self) -> bool {
        self.get_bool(AttributeType::TOKEN).unwrap_or(false)
    }

    /// `CKA_PRIVATE`; absent means public.
    pub fn is_private(&self) -> bool {
        self.get_bool(AttributeType::PRIVATE).unwrap_or(false)
    }

    /// `CKA_MODIFIABLE`; absent means modifiable.
    pub fn is_modifiable(&self) -> bool {
        self.get_bool(AttributeType::MODIFIABLE).unwrap_or(true)
    }

    /// Exact match over every attribute in `template`.
    ///
    /// An empty template matches everything.
    pub fn matches(&self, template: &Attributes) -> bool {
        template
            .iter()
            .all(|(attribute, wanted)| self.get(*attribute) == Some(wanted))
    }

    /// Apply every value in `changes` on top of this set.
    pub fn merge(&mut self, changes: &Attributes) {
        for (attribute, value) in changes.iter() {
            self.0.insert(*attribute, value.clone());
        }
    }
}

impl FromIterator<(AttributeType, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (AttributeType, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Attributes {
    type Item = (AttributeType, AttributeValue);
    type IntoIter = std::collections::btree_map::IntoIter<AttributeType, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Zeroize for Attributes {
    fn zeroize(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
        self.0.clear();
    }
}
