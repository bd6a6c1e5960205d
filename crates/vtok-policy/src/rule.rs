use vtok_types::AttributeType;

/// When an attribute may be written by a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOnly {
    /// Writable at creation and modifiable afterwards.
    Never,
    /// May be supplied at creation; fixed afterwards.
    AfterCreate,
    /// Computed by the token; callers may never supply it.
    Always,
}

/// Rule for a single attribute within a policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributePolicy {
    pub attribute: AttributeType,
    /// Creation fails if the attribute is absent after defaults are applied.
    pub required: bool,
    pub read_only: ReadOnly,
    /// Withheld from readers while the object is sensitive or unextractable.
    pub sensitive: bool,
}

impl AttributePolicy {
    /// An optional attribute, modifiable at any time.
    pub const fn modifiable(attribute: AttributeType) -> Self {
        Self {
            attribute,
            required: false,
            read_only: ReadOnly::Never,
            sensitive: false,
        }
    }

    /// An optional attribute fixed at creation.
    pub const fn fixed(attribute: AttributeType) -> Self {
        Self {
            attribute,
            required: false,
            read_only: ReadOnly::AfterCreate,
            sensitive: false,
        }
    }

    /// An attribute only the token may set.
    pub const fn computed(attribute: AttributeType) -> Self {
        Self {
            attribute,
            required: false,
            read_only: ReadOnly::Always,
            sensitive: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// A one-way transition rule for a boolean attribute.
///
/// A change from `from` to `to` is allowed; the reverse is rejected as
/// read-only. Writing the current value again is always allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ratchet {
    pub attribute: AttributeType,
    pub from: bool,
    pub to: bool,
}

impl Ratchet {
    pub const fn new(attribute: AttributeType, from: bool, to: bool) -> Self {
        Self {
            attribute,
            from,
            to,
        }
    }

    /// Whether moving from `current` to `proposed` is permitted.
    pub fn permits(&self, current: bool, proposed: bool) -> bool {
        current == proposed || (current == self.from && proposed == self.to)
    }
}

/// Look up the rule for `attribute` across layered tables.
///
/// Later layers are more specific and take precedence.
pub fn lookup(
    layers: &[&'static [AttributePolicy]],
    attribute: AttributeType,
) -> Option<&'static AttributePolicy> {
    layers
        .iter()
        .rev()
        .find_map(|layer| layer.iter().find(|rule| rule.attribute == attribute))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &[AttributePolicy] = &[
        AttributePolicy::fixed(AttributeType::CLASS).required(),
        AttributePolicy::modifiable(AttributeType::VALUE),
    ];
    const SPECIFIC: &[AttributePolicy] =
        &[AttributePolicy::fixed(AttributeType::VALUE).sensitive()];

    #[test]
    fn constructors() {
        let rule = AttributePolicy::computed(AttributeType::LOCAL);
        assert_eq!(rule.read_only, ReadOnly::Always);
        assert!(!rule.required);
        assert!(AttributePolicy::modifiable(AttributeType::LABEL).required().required);
    }

    #[test]
    fn later_layers_take_precedence() {
        let rule = lookup(&[BASE, SPECIFIC], AttributeType::VALUE).unwrap();
        assert_eq!(rule.read_only, ReadOnly::AfterCreate);
        assert!(rule.sensitive);

        let rule = lookup(&[BASE, SPECIFIC], AttributeType::CLASS).unwrap();
        assert!(rule.required);

        assert!(lookup(&[BASE, SPECIFIC], AttributeType::LABEL).is_none());
    }

    #[test]
    fn ratchet_directions() {
        let sensitive = Ratchet::new(AttributeType::SENSITIVE, false, true);
        assert!(sensitive.permits(false, true));
        assert!(!sensitive.permits(true, false));
        assert!(sensitive.permits(true, true));
        assert!(sensitive.permits(false, false));
    }
}
