use vtok_types::{AttributeType, Attributes, ObjectClass};

use crate::error::{PolicyError, PolicyResult};
use crate::rule::{lookup, AttributePolicy, Ratchet, ReadOnly};

/// Attributes a copy may override even though they are fixed at creation.
const COPY_OVERRIDABLE: &[AttributeType] = &[
    AttributeType::TOKEN,
    AttributeType::PRIVATE,
    AttributeType::MODIFIABLE,
];

/// The rule set for one object class.
///
/// Implementors supply their attribute tables, ratchets, defaults, and any
/// class-conditional requirements; creation, modification, copy, and
/// sensitivity checks are provided on top of those.
///
/// The trait is object-safe and `Send + Sync` so policies can be shared as
/// `&'static dyn ObjectPolicy`.
pub trait ObjectPolicy: Send + Sync {
    /// Human-readable name of this policy (e.g. "private-key").
    fn name(&self) -> &str;

    /// Attribute tables, least specific first.
    fn layers(&self) -> &[&'static [AttributePolicy]];

    /// One-way transitions enforced on modification and copy.
    fn ratchets(&self) -> &[Ratchet] {
        &[]
    }

    /// Whether attributes outside the known tables are stored verbatim.
    fn accepts_unknown(&self) -> bool {
        false
    }

    /// Fill in values the caller omitted.
    fn set_defaults(&self, attributes: &mut Attributes);

    /// Requirements that depend on other attribute values (key type,
    /// certificate type, ...).
    fn check_conditional(&self, _attributes: &Attributes) -> PolicyResult<()> {
        Ok(())
    }

    /// The rule for `attribute`, if it is part of this policy.
    fn rule(&self, attribute: AttributeType) -> Option<&'static AttributePolicy> {
        lookup(self.layers(), attribute)
    }

    /// Validate a caller-supplied attribute set for creation.
    ///
    /// Returns the full attribute set with defaults applied.
    fn validate_create(&self, supplied: &Attributes) -> PolicyResult<Attributes> {
        for (attribute, value) in supplied.iter() {
            match self.rule(*attribute) {
                Some(rule) if rule.read_only == ReadOnly::Always => {
                    return Err(PolicyError::AttributeReadOnly(*attribute));
                }
                Some(_) => check_kind(*attribute, value)?,
                None if self.accepts_unknown() => {
                    check_kind(*attribute, value)?;
                    tracing::debug!(attribute = %attribute, policy = self.name(), "storing opaque attribute");
                }
                None => {
                    return Err(PolicyError::invalid(
                        *attribute,
                        format!("not valid for {} objects", self.name()),
                    ));
                }
            }
        }

        let mut attributes = supplied.clone();
        self.set_defaults(&mut attributes);
        self.check_required(&attributes)?;
        Ok(attributes)
    }

    /// Validate `changes` against an existing object's attributes.
    ///
    /// Returns the merged attribute set.
    fn validate_modify(
        &self,
        current: &Attributes,
        changes: &Attributes,
    ) -> PolicyResult<Attributes> {
        for (attribute, value) in changes.iter() {
            if !current.is_modifiable() {
                return Err(PolicyError::AttributeReadOnly(*attribute));
            }
            match self.rule(*attribute) {
                Some(rule) if rule.read_only != ReadOnly::Never => {
                    return Err(PolicyError::AttributeReadOnly(*attribute));
                }
                Some(_) => check_kind(*attribute, value)?,
                None if self.accepts_unknown() => check_kind(*attribute, value)?,
                None => {
                    return Err(PolicyError::invalid(
                        *attribute,
                        format!("not valid for {} objects", self.name()),
                    ));
                }
            }
        }
        self.check_ratchets(current, changes)?;

        let mut merged = current.clone();
        merged.merge(changes);
        self.check_required(&merged)?;
        Ok(merged)
    }

    /// Validate the attribute set for a copy of `source` with `overrides`.
    ///
    /// Besides ordinarily modifiable attributes, a copy may change the
    /// token, private, and modifiable flags. Ratchets still apply.
    fn validate_copy(&self, source: &Attributes, overrides: &Attributes) -> PolicyResult<Attributes> {
        for (attribute, value) in overrides.iter() {
            match self.rule(*attribute) {
                Some(rule)
                    if rule.read_only == ReadOnly::Never
                        || COPY_OVERRIDABLE.contains(attribute) =>
                {
                    check_kind(*attribute, value)?
                }
                Some(_) => return Err(PolicyError::AttributeReadOnly(*attribute)),
                None if self.accepts_unknown() => check_kind(*attribute, value)?,
                None => {
                    return Err(PolicyError::invalid(
                        *attribute,
                        format!("not valid for {} objects", self.name()),
                    ));
                }
            }
        }
        self.check_ratchets(source, overrides)?;

        let mut merged = source.clone();
        merged.merge(overrides);
        self.check_required(&merged)?;
        Ok(merged)
    }

    /// Whether the value of `attribute` must be withheld from readers.
    fn is_sensitive(&self, attribute: AttributeType, attributes: &Attributes) -> bool {
        let Some(rule) = self.rule(attribute) else {
            return false;
        };
        rule.sensitive
            && (attributes.get_bool(AttributeType::SENSITIVE) == Some(true)
                || attributes.get_bool(AttributeType::EXTRACTABLE) == Some(false))
    }

    /// Required attributes plus class-conditional requirements.
    fn check_required(&self, attributes: &Attributes) -> PolicyResult<()> {
        for layer in self.layers() {
            for rule in layer.iter().filter(|r| r.required) {
                if !attributes.contains(rule.attribute) {
                    return Err(PolicyError::invalid(rule.attribute, "required attribute missing"));
                }
            }
        }
        self.check_conditional(attributes)
    }

    /// Apply every ratchet to the proposed changes.
    fn check_ratchets(&self, current: &Attributes, changes: &Attributes) -> PolicyResult<()> {
        for ratchet in self.ratchets() {
            let Some(proposed) = changes.get_bool(ratchet.attribute) else {
                continue;
            };
            let existing = current.get_bool(ratchet.attribute).unwrap_or(ratchet.from);
            if !ratchet.permits(existing, proposed) {
                return Err(PolicyError::AttributeReadOnly(ratchet.attribute));
            }
        }
        Ok(())
    }
}

/// Reject a value whose shape does not match a known attribute.
pub(crate) fn check_kind(
    attribute: AttributeType,
    value: &vtok_types::AttributeValue,
) -> PolicyResult<()> {
    match attribute.value_kind() {
        Some(expected) if expected != value.kind() => Err(PolicyError::invalid(
            attribute,
            format!("expected {expected} value, got {}", value.kind()),
        )),
        _ => Ok(()),
    }
}

/// Require that the class attribute equals `expected`.
pub(crate) fn check_class(attributes: &Attributes, expected: ObjectClass) -> PolicyResult<()> {
    match attributes.class() {
        Some(class) if class == expected => Ok(()),
        Some(class) => Err(PolicyError::invalid(
            AttributeType::CLASS,
            format!("expected class {expected}, got {class}"),
        )),
        None => Err(PolicyError::invalid(AttributeType::CLASS, "required attribute missing")),
    }
}

/// Require each of `attributes` when a condition on another attribute holds.
pub(crate) fn require_all(
    attributes: &Attributes,
    required: &[AttributeType],
    context: &str,
) -> PolicyResult<()> {
    for attribute in required {
        if !attributes.contains(*attribute) {
            return Err(PolicyError::invalid(
                *attribute,
                format!("required for {context}"),
            ));
        }
    }
    Ok(())
}
