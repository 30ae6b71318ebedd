//! `Attribute` and `AttributeContainer`: the vocabulary of variant selection
//!
//! An [`Attribute`] is a named, typed axis (`usage: string`,
//! `debuggable: bool`). An [`AttributeContainer`] maps attributes to values and
//! represents either a consumer request or a producer variant.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{AttributeMergeConflict, AttributeValue, SchemaError, ValueType};

/// A named, typed attribute.
///
/// Cheap to clone; the name is shared.
///
/// # Example
///
/// ```
/// use vmatch::{Attribute, ValueType};
///
/// let usage = Attribute::string("usage");
/// assert_eq!(usage.name(), "usage");
/// assert_eq!(usage.value_type(), ValueType::String);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: Arc<str>,
    value_type: ValueType,
}

impl Attribute {
    /// Create an attribute with the given name and value type.
    pub fn of(name: impl Into<Arc<str>>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    /// A string-typed attribute.
    pub fn string(name: impl Into<Arc<str>>) -> Self {
        Self::of(name, ValueType::String)
    }

    /// A boolean-typed attribute.
    pub fn bool(name: impl Into<Arc<str>>) -> Self {
        Self::of(name, ValueType::Bool)
    }

    /// An integer-typed attribute.
    pub fn int(name: impl Into<Arc<str>>) -> Self {
        Self::of(name, ValueType::Int)
    }

    /// The attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A set of attribute values, keyed by attribute name.
///
/// Iteration is ordered by attribute name so diagnostics and traces are
/// reproducible.
///
/// # Example
///
/// ```
/// use vmatch::{Attribute, AttributeContainer};
///
/// let usage = Attribute::string("usage");
/// let request = AttributeContainer::new().with(&usage, "api")?;
/// assert_eq!(request.get(&usage).and_then(|v| v.as_str()), Some("api"));
/// # Ok::<(), vmatch::SchemaError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeContainer {
    entries: BTreeMap<Arc<str>, (Attribute, AttributeValue)>,
}

impl AttributeContainer {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value (builder style).
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn with(
        mut self,
        attribute: &Attribute,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, SchemaError> {
        self.insert(attribute, value)?;
        Ok(self)
    }

    /// Set the value of `attribute`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ValueTypeMismatch`] if the value's type differs
    /// from the attribute's declared type, or if the container already holds
    /// an attribute of the same name with another type.
    pub fn insert(
        &mut self,
        attribute: &Attribute,
        value: impl Into<AttributeValue>,
    ) -> Result<(), SchemaError> {
        let value = value.into();
        if value.value_type() != attribute.value_type() {
            return Err(SchemaError::ValueTypeMismatch {
                attribute: attribute.name().to_string(),
                expected: attribute.value_type(),
                found: value.value_type(),
            });
        }
        if let Some((existing, _)) = self.entries.get(attribute.name()) {
            if existing.value_type() != attribute.value_type() {
                return Err(SchemaError::ValueTypeMismatch {
                    attribute: attribute.name().to_string(),
                    expected: existing.value_type(),
                    found: attribute.value_type(),
                });
            }
        }
        self.entries
            .insert(attribute.name.clone(), (attribute.clone(), value));
        Ok(())
    }

    /// The value of `attribute`, looked up by name.
    #[must_use]
    pub fn get(&self, attribute: &Attribute) -> Option<&AttributeValue> {
        self.get_by_name(attribute.name()).map(|(_, value)| value)
    }

    /// The attribute and value stored under `name`.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<(&Attribute, &AttributeValue)> {
        self.entries.get(name).map(|(a, v)| (a, v))
    }

    /// Returns `true` if a value is stored under the attribute's name.
    #[must_use]
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.entries.contains_key(attribute.name())
    }

    /// Iterate over `(attribute, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Attribute, &AttributeValue)> {
        self.entries.values().map(|(a, v)| (a, v))
    }

    /// Iterate over the attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.values().map(|(a, _)| a)
    }

    /// Number of attributes in this container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the container holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into a copy of `self`.
    ///
    /// Attributes present on only one side are copied. Attributes present on
    /// both sides must agree (after coercing `other`'s value to `self`'s
    /// type), otherwise the merge fails. The first side's declaration wins.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeMergeConflict`] naming the first disagreeing attribute.
    pub fn safe_concat(&self, other: &AttributeContainer) -> Result<Self, AttributeMergeConflict> {
        let mut merged = self.clone();
        for (attribute, value) in other.iter() {
            match self.get_by_name(attribute.name()) {
                Some((mine, existing)) => {
                    let agrees = value
                        .coerce(mine.value_type())
                        .is_some_and(|v| &v == existing);
                    if !agrees {
                        return Err(AttributeMergeConflict {
                            attribute: mine.clone(),
                            first: existing.clone(),
                            second: value.clone(),
                        });
                    }
                }
                None => {
                    merged
                        .entries
                        .insert(attribute.name.clone(), (attribute.clone(), value.clone()));
                }
            }
        }
        Ok(merged)
    }
}

impl fmt::Display for AttributeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (attribute, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attribute}={value}")?;
        }
        f.write_str("}")
    }
}

/// Anything that exposes an attribute set: a producer variant, a consumer
/// request, a richer domain object wrapping one.
///
/// [`AttributeMatcher`](crate::AttributeMatcher) selects among `&[C]` where
/// `C: HasAttributes` and hands back references into the caller's slice, so
/// callers keep their own variant metadata.
///
/// # Example
///
/// ```
/// use vmatch::{AttributeContainer, HasAttributes};
///
/// struct Variant { name: String, attributes: AttributeContainer }
///
/// impl HasAttributes for Variant {
///     fn attributes(&self) -> &AttributeContainer { &self.attributes }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `HasAttributes`",
    label = "this type cannot be matched as a variant",
    note = "implement `HasAttributes::attributes` to expose the variant's `AttributeContainer`"
)]
pub trait HasAttributes {
    /// The attribute set of this variant.
    fn attributes(&self) -> &AttributeContainer;
}

impl HasAttributes for AttributeContainer {
    fn attributes(&self) -> &AttributeContainer {
        self
    }
}

impl<T: HasAttributes + ?Sized> HasAttributes for Arc<T> {
    fn attributes(&self) -> &AttributeContainer {
        (**self).attributes()
    }
}
