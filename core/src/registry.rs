//! Type registry for config-driven schema construction.
//!
//! The registry enables **declarative schemas**: JSON/YAML config ->
//! [`AttributesSchema`] without hand-written wiring code.
//!
//! # Architecture (axum `BoxedIntoRoute` pattern)
//!
//! Each rule type registers itself via [`IntoCompatibilityRule`] or
//! [`IntoDisambiguationRule`], each describer via [`IntoFailureDescriber`]. At
//! registration time the concrete type `T` is monomorphized into a closure and
//! erased behind `Box<dyn Fn>`. Lookup happens once, while the schema is
//! loaded; resolution never touches the registry.
//!
//! # Three Extension Seams
//!
//! | Seam | Trait | Builder Method |
//! |------|-------|----------------|
//! | Compatibility rules | [`IntoCompatibilityRule`] | `builder.compatibility::<T>(url)` |
//! | Disambiguation rules | [`IntoDisambiguationRule`] | `builder.disambiguation::<T>(url)` |
//! | Failure describers | [`IntoFailureDescriber`] | `builder.describer::<T>(url)` |
//!
//! # Example
//!
//! ```ignore
//! let registry = vmatch::register_core_rules(RuleRegistryBuilder::new())
//!     .compatibility::<JvmVersionRule>("acme.jvm.v1.JvmVersionRule")
//!     .build();
//!
//! let config: SchemaConfig = serde_yaml::from_str(yaml)?;
//! let schema = registry.load_schema(config)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{SchemaConfig, TypedConfig};
use crate::{
    Attribute, AttributesSchema, CompatibilityRule, DisambiguationRule, FailureDescriber,
    SchemaError,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Compatibility rules that can be constructed from configuration.
///
/// Each rule type knows its own config shape via the associated `Config` type.
/// The attribute is passed along so value-carrying configs can be typed.
///
/// # Example
///
/// ```ignore
/// impl IntoCompatibilityRule for ExactMatch {
///     type Config = UnitConfig;
///     fn from_config(_: &Attribute, _: Self::Config) -> Result<Arc<dyn CompatibilityRule>, SchemaError> {
///         Ok(Arc::new(ExactMatch))
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be built from configuration as a compatibility rule",
    note = "implement `IntoCompatibilityRule` with a `Config` type deserialized from the rule's `config`"
)]
pub trait IntoCompatibilityRule: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct the rule for `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidConfig`] or [`SchemaError::ValueTypeMismatch`]
    /// if the config is semantically invalid for `attribute`.
    fn from_config(
        attribute: &Attribute,
        config: Self::Config,
    ) -> Result<Arc<dyn CompatibilityRule>, SchemaError>;
}

/// Disambiguation rules that can be constructed from configuration.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be built from configuration as a disambiguation rule",
    note = "implement `IntoDisambiguationRule` with a `Config` type deserialized from the rule's `config`"
)]
pub trait IntoDisambiguationRule: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct the rule for `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidConfig`] or [`SchemaError::ValueTypeMismatch`]
    /// if the config is semantically invalid for `attribute`.
    fn from_config(
        attribute: &Attribute,
        config: Self::Config,
    ) -> Result<Arc<dyn DisambiguationRule>, SchemaError>;
}

/// Failure describers that can be constructed from configuration.
///
/// Unlike the rule traits, describers are not tied to an attribute.
pub trait IntoFailureDescriber: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct the describer.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidConfig`] if the config is semantically invalid.
    fn from_config(config: Self::Config) -> Result<Arc<dyn FailureDescriber>, SchemaError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Type-erased factories
// ═══════════════════════════════════════════════════════════════════════════════

type BoxedCompatibilityFactory = Box<
    dyn Fn(&Attribute, &serde_json::Value) -> Result<Arc<dyn CompatibilityRule>, SchemaError>
        + Send
        + Sync,
>;

type BoxedDisambiguationFactory = Box<
    dyn Fn(&Attribute, &serde_json::Value) -> Result<Arc<dyn DisambiguationRule>, SchemaError>
        + Send
        + Sync,
>;

type BoxedDescriberFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn FailureDescriber>, SchemaError> + Send + Sync>;

fn parse_config<C: DeserializeOwned>(
    type_url: &str,
    value: &serde_json::Value,
) -> Result<C, SchemaError> {
    serde_json::from_value(value.clone()).map_err(|e| SchemaError::InvalidConfig {
        message: format!("{type_url}: {e}"),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for constructing a [`RuleRegistry`].
///
/// Register rule and describer types with their type URLs, then call
/// [`build()`](Self::build) to produce an immutable `RuleRegistry`.
#[derive(Default)]
pub struct RuleRegistryBuilder {
    compatibility: HashMap<String, BoxedCompatibilityFactory>,
    disambiguation: HashMap<String, BoxedDisambiguationFactory>,
    describers: HashMap<String, BoxedDescriberFactory>,
}

impl RuleRegistryBuilder {
    /// Create a new empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compatibility rule type under `type_url`.
    #[must_use]
    pub fn compatibility<T: IntoCompatibilityRule>(mut self, type_url: &str) -> Self {
        let url = type_url.to_owned();
        self.compatibility.insert(
            type_url.to_owned(),
            Box::new(move |attribute: &Attribute, value: &serde_json::Value| {
                T::from_config(attribute, parse_config(&url, value)?)
            }),
        );
        self
    }

    /// Register a disambiguation rule type under `type_url`.
    #[must_use]
    pub fn disambiguation<T: IntoDisambiguationRule>(mut self, type_url: &str) -> Self {
        let url = type_url.to_owned();
        self.disambiguation.insert(
            type_url.to_owned(),
            Box::new(move |attribute: &Attribute, value: &serde_json::Value| {
                T::from_config(attribute, parse_config(&url, value)?)
            }),
        );
        self
    }

    /// Register a failure describer type under `type_url`.
    #[must_use]
    pub fn describer<T: IntoFailureDescriber>(mut self, type_url: &str) -> Self {
        let url = type_url.to_owned();
        self.describers.insert(
            type_url.to_owned(),
            Box::new(move |value: &serde_json::Value| T::from_config(parse_config(&url, value)?)),
        );
        self
    }

    /// Freeze the registry. No further registration is possible.
    #[must_use]
    pub fn build(self) -> RuleRegistry {
        RuleRegistry {
            compatibility: self.compatibility,
            disambiguation: self.disambiguation,
            describers: self.describers,
        }
    }
}

/// Register the built-in rules and describers under `vmatch.core.v1.*`.
///
/// # Example
///
/// ```ignore
/// pub fn register(builder: RuleRegistryBuilder) -> RuleRegistryBuilder {
///     vmatch::register_core_rules(builder)
///         .compatibility::<JvmVersionRule>("acme.jvm.v1.JvmVersionRule")
/// }
/// ```
#[must_use]
pub fn register_core_rules(builder: RuleRegistryBuilder) -> RuleRegistryBuilder {
    use crate::{
        AtMostRequested, CompatibleValues, ExactMatch, GenericFailureDescriber, PreferHighest,
        PreferLowest, PreferOrder, PreferRequested, PreferValue, TemplateDescriber,
    };
    builder
        .compatibility::<ExactMatch>("vmatch.core.v1.ExactMatch")
        .compatibility::<CompatibleValues>("vmatch.core.v1.CompatibleValues")
        .compatibility::<AtMostRequested>("vmatch.core.v1.AtMostRequested")
        .disambiguation::<PreferValue>("vmatch.core.v1.PreferValue")
        .disambiguation::<PreferOrder>("vmatch.core.v1.PreferOrder")
        .disambiguation::<PreferRequested>("vmatch.core.v1.PreferRequested")
        .disambiguation::<PreferHighest>("vmatch.core.v1.PreferHighest")
        .disambiguation::<PreferLowest>("vmatch.core.v1.PreferLowest")
        .describer::<GenericFailureDescriber>("vmatch.core.v1.GenericFailureDescriber")
        .describer::<TemplateDescriber>("vmatch.core.v1.TemplateDescriber")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable registry of rule and describer factories.
///
/// Constructed via [`RuleRegistryBuilder`]. Use [`load_schema()`](Self::load_schema)
/// to turn a [`SchemaConfig`] into an [`AttributesSchema`].
pub struct RuleRegistry {
    compatibility: HashMap<String, BoxedCompatibilityFactory>,
    disambiguation: HashMap<String, BoxedDisambiguationFactory>,
    describers: HashMap<String, BoxedDescriberFactory>,
}

impl RuleRegistry {
    /// Build a new schema from `config`.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::DuplicateAttribute`]: an attribute is declared twice with different types
    /// - [`SchemaError::UnknownTypeUrl`]: a rule or describer `type_url` is not registered
    /// - [`SchemaError::InvalidConfig`]: a rule names an undeclared attribute, or its
    ///   config does not deserialize
    /// - [`SchemaError::ValueTypeMismatch`]: a rule's value does not fit its attribute
    pub fn load_schema(&self, config: SchemaConfig) -> Result<AttributesSchema, SchemaError> {
        let mut schema = AttributesSchema::new();
        self.apply(&mut schema, config)?;
        Ok(schema)
    }

    /// Apply `config` on top of an existing schema.
    ///
    /// Everything in `config` is appended after what `schema` already holds.
    /// On error, `schema` may hold part of `config`.
    ///
    /// # Errors
    ///
    /// Same as [`load_schema()`](Self::load_schema).
    pub fn apply(&self, schema: &mut AttributesSchema, config: SchemaConfig) -> Result<(), SchemaError> {
        for attribute in &config.attributes {
            schema.declare(&attribute.attribute())?;
        }
        for rule in &config.compatibility {
            let attribute = declared(schema, &rule.attribute)?;
            let factory = lookup(&self.compatibility, &rule.rule, "compatibility")?;
            schema.push_compatibility_rule(&attribute, factory(&attribute, &rule.rule.config)?)?;
        }
        for rule in &config.disambiguation {
            let attribute = declared(schema, &rule.attribute)?;
            let factory = lookup(&self.disambiguation, &rule.rule, "disambiguation")?;
            schema.push_disambiguation_rule(&attribute, factory(&attribute, &rule.rule.config)?)?;
        }
        for entry in &config.describers {
            let factory = lookup(&self.describers, &entry.describer, "describer")?;
            schema.push_failure_describer(entry.failure, factory(&entry.describer.config)?);
        }
        debug!(
            attributes = config.attributes.len(),
            compatibility = config.compatibility.len(),
            disambiguation = config.disambiguation.len(),
            describers = config.describers.len(),
            "loaded schema config"
        );
        Ok(())
    }

    /// Returns `true` if a compatibility rule is registered under `type_url`.
    #[must_use]
    pub fn contains_compatibility(&self, type_url: &str) -> bool {
        self.compatibility.contains_key(type_url)
    }

    /// Returns `true` if a disambiguation rule is registered under `type_url`.
    #[must_use]
    pub fn contains_disambiguation(&self, type_url: &str) -> bool {
        self.disambiguation.contains_key(type_url)
    }

    /// Returns `true` if a describer is registered under `type_url`.
    #[must_use]
    pub fn contains_describer(&self, type_url: &str) -> bool {
        self.describers.contains_key(type_url)
    }

    /// Registered compatibility rule type URLs, sorted.
    #[must_use]
    pub fn compatibility_type_urls(&self) -> Vec<&str> {
        sorted_keys(&self.compatibility)
    }

    /// Registered disambiguation rule type URLs, sorted.
    #[must_use]
    pub fn disambiguation_type_urls(&self) -> Vec<&str> {
        sorted_keys(&self.disambiguation)
    }

    /// Registered describer type URLs, sorted.
    #[must_use]
    pub fn describer_type_urls(&self) -> Vec<&str> {
        sorted_keys(&self.describers)
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compatibility.is_empty() && self.disambiguation.is_empty() && self.describers.is_empty()
    }
}

fn declared(schema: &AttributesSchema, name: &str) -> Result<Attribute, SchemaError> {
    schema
        .attribute_by_name(name)
        .cloned()
        .ok_or_else(|| SchemaError::InvalidConfig {
            message: format!("attribute '{name}' is not declared"),
        })
}

fn lookup<'a, F>(
    factories: &'a HashMap<String, F>,
    config: &TypedConfig,
    registry: &'static str,
) -> Result<&'a F, SchemaError> {
    factories
        .get(&config.type_url)
        .ok_or_else(|| SchemaError::UnknownTypeUrl {
            type_url: config.type_url.clone(),
            registry,
            available: sorted_keys(factories).into_iter().map(str::to_owned).collect(),
        })
}

fn sorted_keys<F>(factories: &HashMap<String, F>) -> Vec<&str> {
    let mut urls: Vec<&str> = factories.keys().map(String::as_str).collect();
    urls.sort_unstable();
    urls
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("compatibility", &self.compatibility_type_urls())
            .field("disambiguation", &self.disambiguation_type_urls())
            .field("describers", &self.describer_type_urls())
            .finish()
    }
}
