//! Config types for declarative schema construction.
//!
//! These types mirror the runtime schema but are serde-deserializable,
//! enabling config-driven schemas via [`RuleRegistry::load_schema()`](crate::RuleRegistry::load_schema).
//!
//! # Relationship to runtime types
//!
//! | Config type | Runtime type | Loader |
//! |-------------|-------------|--------|
//! | [`SchemaConfig`] | [`AttributesSchema`](crate::AttributesSchema) | `RuleRegistry::load_schema()` |
//! | [`AttributeConfig`] | [`Attribute`] | `AttributeConfig::attribute()` |
//! | [`RuleConfig`] | `Arc<dyn CompatibilityRule>` / `Arc<dyn DisambiguationRule>` | via registry factory |
//! | [`DescriberConfig`] | `Arc<dyn FailureDescriber>` | via registry factory |
//! | [`ContainerConfig`] | [`AttributeContainer`] | `ContainerConfig::load()` |
//!
//! ```yaml
//! attributes:
//!   - { name: usage, type: string }
//!   - { name: debuggable, type: bool }
//! compatibility:
//!   - attribute: usage
//!     rule: { type_url: vmatch.core.v1.ExactMatch }
//! disambiguation:
//!   - attribute: debuggable
//!     rule: { type_url: vmatch.core.v1.PreferValue, config: { value: false } }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{
    Attribute, AttributeContainer, AttributeMatcher, AttributeValue, FailureKind, SchemaError,
    ValueType,
};

/// Configuration for an [`AttributesSchema`](crate::AttributesSchema).
///
/// Sections are applied in order: attributes, compatibility rules,
/// disambiguation rules, describers. Rules within a section keep their
/// listed order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Attribute declarations.
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,

    /// Compatibility rules, appended to each attribute's chain in order.
    #[serde(default)]
    pub compatibility: Vec<RuleConfig>,

    /// Disambiguation rules, appended to each attribute's chain in order.
    #[serde(default)]
    pub disambiguation: Vec<RuleConfig>,

    /// Failure describers. Later entries take precedence over earlier ones.
    #[serde(default)]
    pub describers: Vec<DescriberConfig>,
}

/// One attribute declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeConfig {
    /// Attribute name.
    pub name: String,

    /// Value type (default: `string`).
    #[serde(rename = "type", default)]
    pub value_type: ValueTypeConfig,
}

impl AttributeConfig {
    /// The runtime attribute.
    #[must_use]
    pub fn attribute(&self) -> Attribute {
        Attribute::of(self.name.as_str(), self.value_type.into())
    }
}

/// Value types expressible in configuration.
///
/// Custom value types only exist in code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTypeConfig {
    /// [`ValueType::String`]
    #[default]
    String,
    /// [`ValueType::Bool`]
    Bool,
    /// [`ValueType::Int`]
    Int,
}

impl From<ValueTypeConfig> for ValueType {
    fn from(config: ValueTypeConfig) -> Self {
        match config {
            ValueTypeConfig::String => ValueType::String,
            ValueTypeConfig::Bool => ValueType::Bool,
            ValueTypeConfig::Int => ValueType::Int,
        }
    }
}

/// A rule attached to one attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Name of a declared attribute.
    pub attribute: String,

    /// The rule, resolved through the registry.
    pub rule: TypedConfig,
}

/// A describer attached to one failure kind.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriberConfig {
    /// The failure kind (`no_matching_candidates`, `ambiguous_candidates`,
    /// `incompatible_attributes`).
    pub failure: FailureKind,

    /// The describer, resolved through the registry.
    pub describer: TypedConfig,
}

/// Reference to a registered type with its configuration.
///
/// - `type_url` identifies the registered type
/// - `config` carries the type-specific configuration payload
#[derive(Debug, Clone, Deserialize)]
pub struct TypedConfig {
    /// The type URL identifying the registered rule or describer.
    /// Must match a `type_url` registered in the [`RuleRegistry`](crate::RuleRegistry).
    pub type_url: String,

    /// Type-specific configuration payload.
    /// Deserialized as the `Config` associated type of the registered constructor.
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

fn default_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Empty configuration for rules that need no parameters.
///
/// Accepts any JSON value (`{}`, `null`, etc.) and ignores it.
#[derive(Debug, Clone, Copy)]
pub struct UnitConfig;

impl<'de> Deserialize<'de> for UnitConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(UnitConfig)
    }
}

/// An attribute set written as a map of name to scalar.
///
/// ```yaml
/// { usage: api, debuggable: false, level: 11 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ContainerConfig(pub BTreeMap<String, serde_json::Value>);

impl ContainerConfig {
    /// Build the container, typing each entry by the matcher's declaration.
    ///
    /// Attributes neither schema declares take the scalar's own type.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::InvalidConfig`]: an entry is not a string, bool or integer
    /// - [`SchemaError::ValueTypeMismatch`]: an entry cannot be read as its
    ///   declared type
    pub fn load(&self, matcher: &AttributeMatcher) -> Result<AttributeContainer, SchemaError> {
        let mut container = AttributeContainer::new();
        for (name, raw) in &self.0 {
            let (attribute, value) = match matcher.attribute_by_name(name) {
                Some(attribute) => (attribute.clone(), typed_value(attribute, raw)?),
                None => {
                    let value = scalar_value(name, raw)?;
                    (Attribute::of(name.as_str(), value.value_type()), value)
                }
            };
            container.insert(&attribute, value)?;
        }
        Ok(container)
    }
}

/// Convert a JSON scalar into a value of `attribute`'s type.
///
/// # Errors
///
/// [`SchemaError::InvalidConfig`] for non-scalars, [`SchemaError::ValueTypeMismatch`]
/// when the scalar cannot be read as the attribute's type.
pub fn typed_value(
    attribute: &Attribute,
    raw: &serde_json::Value,
) -> Result<AttributeValue, SchemaError> {
    let value = scalar_value(attribute.name(), raw)?;
    value
        .coerce(attribute.value_type())
        .ok_or_else(|| SchemaError::ValueTypeMismatch {
            attribute: attribute.name().to_string(),
            expected: attribute.value_type(),
            found: value.value_type(),
        })
}

fn scalar_value(name: &str, raw: &serde_json::Value) -> Result<AttributeValue, SchemaError> {
    match raw {
        serde_json::Value::String(s) => Ok(AttributeValue::String(s.clone())),
        serde_json::Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
        serde_json::Value::Number(n) => n.as_i64().map(AttributeValue::Int).ok_or_else(|| {
            SchemaError::InvalidConfig {
                message: format!("attribute '{name}': {n} is not a 64-bit integer"),
            }
        }),
        other => Err(SchemaError::InvalidConfig {
            message: format!("attribute '{name}': expected a string, bool or integer, got {other}"),
        }),
    }
}
