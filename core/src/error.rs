//! Error types for schema configuration and candidate matching.
//!
//! Configuration errors ([`SchemaError`]) are raised while attributes and rules
//! are registered and are fatal for that configuration. Matching errors
//! ([`MatchError`]) are raised while a matcher evaluates candidates; they
//! indicate a defective rule or an inconsistent attribute declaration and are
//! never folded into a "no match" result.

use thiserror::Error;

use crate::{Attribute, AttributeValue, ValueType};

/// Errors raised while declaring attributes, registering rules or loading config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// An attribute name was declared again with a different value type.
    #[error(
        "attribute '{name}' is already declared with type {existing}, cannot redeclare it as {requested}"
    )]
    DuplicateAttribute {
        /// The attribute name.
        name: String,
        /// Type of the existing declaration.
        existing: ValueType,
        /// Type of the rejected declaration.
        requested: ValueType,
    },

    /// A value does not have the type its attribute declares.
    #[error("attribute '{attribute}' expects a value of type {expected}, found {found}")]
    ValueTypeMismatch {
        /// The attribute name.
        attribute: String,
        /// The declared type.
        expected: ValueType,
        /// The type of the offered value.
        found: ValueType,
    },

    /// Configuration deserialization or construction failed.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// The underlying error message.
        message: String,
    },

    /// A type URL was not found in the rule registry.
    #[error("unknown {registry} type URL \"{type_url}\"{}", format_available(.available))]
    UnknownTypeUrl {
        /// The unregistered type URL.
        type_url: String,
        /// Which registry was searched (`"compatibility"`, `"disambiguation"` or `"describer"`).
        registry: &'static str,
        /// Type URLs that are registered, for self-correcting messages.
        available: Vec<String>,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        " (nothing registered)".to_string()
    } else {
        format!(" (registered: {})", available.join(", "))
    }
}

/// Failure reported by a compatibility or disambiguation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuleError {
    message: String,
}

impl RuleError {
    /// Create a rule error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while evaluating candidates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// A rule failed while evaluating an attribute.
    #[error("rule for attribute '{attribute}' failed: {source}")]
    RuleEvaluation {
        /// The attribute whose chain was running.
        attribute: String,
        /// What the rule reported.
        #[source]
        source: RuleError,
    },

    /// A candidate value could not be converted to the requested attribute type.
    #[error("value '{value}' of attribute '{attribute}' has type {found} and cannot be read as {expected}")]
    UncoercibleValue {
        /// The attribute name.
        attribute: String,
        /// Type declared by the request.
        expected: ValueType,
        /// Type of the candidate value.
        found: ValueType,
        /// Rendering of the candidate value.
        value: String,
    },
}

/// Two attribute sets disagree on the value of a shared attribute.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot merge attribute '{attribute}': value '{first}' conflicts with '{second}'")]
pub struct AttributeMergeConflict {
    /// The attribute both sides define.
    pub attribute: Attribute,
    /// Value held by the first set.
    pub first: AttributeValue,
    /// Value held by the second set.
    pub second: AttributeValue,
}

/// Failure returned by a [`FailureDescriber`](crate::FailureDescriber).
///
/// Describer errors never escape [`FailureDescriberRegistry::describe`](crate::FailureDescriberRegistry::describe);
/// the describer is treated as having declined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DescriberError {
    message: String,
}

impl DescriberError {
    /// Create a describer error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
