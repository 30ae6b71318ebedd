//! `AttributesSchema`: attribute declarations, rule chains and describers
//!
//! A schema is built during configuration through `&mut self` methods and
//! read during resolution through immutable [`AttributeMatcher`] snapshots.
//! The state lives behind an `Arc` and is copied on write, so taking a
//! snapshot is a pointer copy and a snapshot never observes later
//! registrations.
//!
//! # Rule order
//!
//! Chains run in registration order. [`extend`](AttributesSchema::extend)
//! places the base schema's rules in front of the local ones, so for any
//! attribute inherited rules always run first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::rule::{CompatibilityChain, DisambiguationChain};
use crate::{
    Attribute, AttributeMatcher, CompatibilityRule, DisambiguationRule, FailureDescriber,
    FailureDescriberRegistry, FailureKind, SchemaError, ValueType,
};

/// Shared, copy-on-write schema contents.
#[derive(Clone, Default)]
pub(crate) struct SchemaState {
    /// Declared attributes in registration order.
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) compatibility: HashMap<String, CompatibilityChain>,
    pub(crate) disambiguation: HashMap<String, DisambiguationChain>,
    pub(crate) describers: FailureDescriberRegistry,
}

impl SchemaState {
    pub(crate) fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub(crate) fn compatibility_chain(&self, name: &str) -> &[Arc<dyn CompatibilityRule>] {
        self.compatibility.get(name).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn disambiguation_chain(&self, name: &str) -> &[Arc<dyn DisambiguationRule>] {
        self.disambiguation.get(name).map_or(&[], Vec::as_slice)
    }

    /// Declare `attribute`; idempotent for an identical declaration.
    fn declare(&mut self, attribute: &Attribute) -> Result<(), SchemaError> {
        match self.attribute_by_name(attribute.name()) {
            Some(existing) if existing.value_type() == attribute.value_type() => Ok(()),
            Some(existing) => Err(SchemaError::DuplicateAttribute {
                name: attribute.name().to_string(),
                existing: existing.value_type(),
                requested: attribute.value_type(),
            }),
            None => {
                self.attributes.push(attribute.clone());
                Ok(())
            }
        }
    }
}

/// Attribute vocabulary and matching rules of one build configuration.
///
/// # Example
///
/// ```
/// use vmatch::{AttributeContainer, AttributesSchema, ExactMatch, PreferValue, ValueType};
///
/// let mut schema = AttributesSchema::new();
/// let usage = schema.add_attribute("usage", ValueType::String)?;
/// let debuggable = schema.add_attribute("debuggable", ValueType::Bool)?;
/// schema.add_compatibility_rule(&usage, ExactMatch)?;
/// schema.add_disambiguation_rule(&debuggable, PreferValue::new(false))?;
///
/// let candidates = vec![
///     AttributeContainer::new().with(&usage, "api")?.with(&debuggable, true)?,
///     AttributeContainer::new().with(&usage, "api")?.with(&debuggable, false)?,
///     AttributeContainer::new().with(&usage, "runtime")?,
/// ];
/// let request = AttributeContainer::new().with(&usage, "api")?;
///
/// let selected = schema.matcher().select_matches(&candidates, &request)?;
/// assert_eq!(selected, vec![&candidates[1]]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Default)]
pub struct AttributesSchema {
    state: Arc<SchemaState>,
}

impl AttributesSchema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute and return its handle.
    ///
    /// Redeclaring an attribute with the same type returns the existing handle.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateAttribute`] if `name` is already
    /// declared with another type.
    pub fn add_attribute(
        &mut self,
        name: impl Into<Arc<str>>,
        value_type: ValueType,
    ) -> Result<Attribute, SchemaError> {
        let attribute = Attribute::of(name, value_type);
        self.declare(&attribute)?;
        Ok(attribute)
    }

    /// Declare an existing attribute handle.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateAttribute`] on a type conflict.
    pub fn declare(&mut self, attribute: &Attribute) -> Result<(), SchemaError> {
        if self.state.attribute_by_name(attribute.name()).is_none() {
            debug!(attribute = attribute.name(), value_type = %attribute.value_type(), "declared attribute");
        }
        Arc::make_mut(&mut self.state).declare(attribute)
    }

    /// Append a compatibility rule to `attribute`'s chain, declaring the
    /// attribute if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateAttribute`] on a type conflict.
    pub fn add_compatibility_rule<R>(&mut self, attribute: &Attribute, rule: R) -> Result<(), SchemaError>
    where
        R: CompatibilityRule + 'static,
    {
        self.push_compatibility_rule(attribute, Arc::new(rule))
    }

    /// Append a disambiguation rule to `attribute`'s chain, declaring the
    /// attribute if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateAttribute`] on a type conflict.
    pub fn add_disambiguation_rule<R>(&mut self, attribute: &Attribute, rule: R) -> Result<(), SchemaError>
    where
        R: DisambiguationRule + 'static,
    {
        self.push_disambiguation_rule(attribute, Arc::new(rule))
    }

    pub(crate) fn push_compatibility_rule(
        &mut self,
        attribute: &Attribute,
        rule: Arc<dyn CompatibilityRule>,
    ) -> Result<(), SchemaError> {
        self.declare(attribute)?;
        Arc::make_mut(&mut self.state)
            .compatibility
            .entry(attribute.name().to_string())
            .or_default()
            .push(rule);
        Ok(())
    }

    pub(crate) fn push_disambiguation_rule(
        &mut self,
        attribute: &Attribute,
        rule: Arc<dyn DisambiguationRule>,
    ) -> Result<(), SchemaError> {
        self.declare(attribute)?;
        Arc::make_mut(&mut self.state)
            .disambiguation
            .entry(attribute.name().to_string())
            .or_default()
            .push(rule);
        Ok(())
    }

    /// Inherit `base`'s attributes, rule chains and describers.
    ///
    /// Inherited attributes come first in declaration order and inherited
    /// rules run before local ones, including rules registered on `self`
    /// after this call. Inherited describers are tried after local ones.
    /// Nothing is removed. Rules and describers `self` already holds (from an
    /// earlier `extend` of the same base, or a shared ancestor) are not
    /// copied again.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateAttribute`] if both schemas declare an
    /// attribute name with different types; `self` is left unchanged.
    pub fn extend(&mut self, base: &AttributesSchema) -> Result<(), SchemaError> {
        let base = &base.state;
        for inherited in &base.attributes {
            if let Some(local) = self.state.attribute_by_name(inherited.name()) {
                if local.value_type() != inherited.value_type() {
                    return Err(SchemaError::DuplicateAttribute {
                        name: inherited.name().to_string(),
                        existing: inherited.value_type(),
                        requested: local.value_type(),
                    });
                }
            }
        }

        let state = Arc::make_mut(&mut self.state);

        let mut attributes = base.attributes.clone();
        attributes.extend(
            state
                .attributes
                .iter()
                .filter(|a| base.attribute_by_name(a.name()).is_none())
                .cloned(),
        );
        state.attributes = attributes;

        for (name, inherited) in &base.compatibility {
            prefix_chain(state.compatibility.entry(name.clone()).or_default(), inherited);
        }
        for (name, inherited) in &base.disambiguation {
            prefix_chain(state.disambiguation.entry(name.clone()).or_default(), inherited);
        }
        state.describers.inherit(&base.describers);

        debug!(
            attributes = state.attributes.len(),
            "extended schema from base"
        );
        Ok(())
    }

    /// Snapshot that matches with this schema's rules, falling back to
    /// `producer` only for attributes this schema never declared.
    #[must_use]
    pub fn with_producer(&self, producer: &AttributesSchema) -> AttributeMatcher {
        AttributeMatcher::new(Arc::clone(&self.state), Arc::clone(&producer.state))
    }

    /// Snapshot for matching variants described by this same schema.
    #[must_use]
    pub fn matcher(&self) -> AttributeMatcher {
        self.with_producer(self)
    }

    /// Register a describer for `kind`. Later registrations are tried first.
    pub fn add_failure_describer<D>(&mut self, kind: FailureKind, describer: D)
    where
        D: FailureDescriber + 'static,
    {
        self.push_failure_describer(kind, Arc::new(describer));
    }

    pub(crate) fn push_failure_describer(
        &mut self,
        kind: FailureKind,
        describer: Arc<dyn FailureDescriber>,
    ) {
        Arc::make_mut(&mut self.state).describers.add(kind, describer);
    }

    /// Describers registered for exactly `kind`, most recent first.
    #[must_use]
    pub fn failure_describers(&self, kind: FailureKind) -> &[Arc<dyn FailureDescriber>] {
        self.state.describers.describers(kind)
    }

    /// Look up a declared attribute.
    #[must_use]
    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.state.attribute_by_name(name)
    }

    /// Returns `true` if `attribute`'s name is declared.
    #[must_use]
    pub fn has_attribute(&self, attribute: &Attribute) -> bool {
        self.attribute_by_name(attribute.name()).is_some()
    }

    /// Declared attributes in registration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.state.attributes
    }

    /// Length of `attribute`'s compatibility chain.
    #[must_use]
    pub fn compatibility_rule_count(&self, attribute: &Attribute) -> usize {
        self.state.compatibility_chain(attribute.name()).len()
    }

    /// Length of `attribute`'s disambiguation chain.
    #[must_use]
    pub fn disambiguation_rule_count(&self, attribute: &Attribute) -> usize {
        self.state.disambiguation_chain(attribute.name()).len()
    }
}

impl fmt::Debug for AttributesSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributesSchema")
            .field("attributes", &self.state.attributes)
            .field("describers", &self.state.describers)
            .finish()
    }
}

/// Same allocation, compared by data pointer only.
pub(crate) fn same_arc<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

/// Put `inherited` in front of `local`, skipping rules `local` already holds.
fn prefix_chain<T: ?Sized>(local: &mut Vec<Arc<T>>, inherited: &[Arc<T>]) {
    let mut chain: Vec<Arc<T>> = inherited
        .iter()
        .filter(|rule| !local.iter().any(|held| same_arc(held, *rule)))
        .cloned()
        .collect();
    chain.append(local);
    *local = chain;
}
