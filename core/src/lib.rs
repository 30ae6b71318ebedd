//! vmatch - variant attribute matching engine
//!
//! Selects the best variant of a component for a consumer request, where
//! producer variants and the request both carry typed attributes.
//!
//! # Architecture
//!
//! - [`Attribute`] / [`AttributeValue`]: Typed, named selection axis and its value
//! - [`AttributeContainer`]: Attribute set of one variant or request
//! - [`AttributesSchema`]: Mutable registry: attributes, rule chains, describers
//! - [`CompatibilityRule`] / [`DisambiguationRule`]: Ordered per-attribute chains
//! - [`AttributeMatcher`]: Immutable consumer + producer snapshot that selects
//! - [`FailureDescriberRegistry`]: Turns classified failures into text
//!
//! # Key Design Insights
//!
//! 1. **Two phases**: compatibility is a hard filter, disambiguation a soft
//!    preference that never empties the candidate set.
//!
//! 2. **Absence is not incompatibility**: a candidate that does not carry a
//!    requested attribute is never ruled out because of it.
//!
//! 3. **Snapshots are cheap**: the matcher shares schema state behind `Arc`;
//!    later schema mutations never leak into an existing matcher.
//!
//! # Example
//!
//! ```
//! use vmatch::prelude::*;
//!
//! let mut schema = AttributesSchema::new();
//! let usage = schema.add_attribute("usage", ValueType::String)?;
//! let debuggable = schema.add_attribute("debuggable", ValueType::Bool)?;
//! schema.add_compatibility_rule(&usage, ExactMatch)?;
//! schema.add_disambiguation_rule(&debuggable, PreferValue::new(false))?;
//!
//! let candidates = vec![
//!     AttributeContainer::new().with(&usage, "runtime")?,
//!     AttributeContainer::new().with(&usage, "api")?.with(&debuggable, true)?,
//!     AttributeContainer::new().with(&usage, "api")?.with(&debuggable, false)?,
//! ];
//! let request = AttributeContainer::new().with(&usage, "api")?;
//!
//! let matcher = schema.matcher();
//! let selected = matcher.select_one(&candidates, &request)?;
//! assert_eq!(selected, &candidates[2]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`FailureKind`]
//! - `registry`: config types and the type-URL [`RuleRegistry`]

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod attribute;
mod describer;
mod error;
mod failure;
mod matcher;
mod rule;
mod rules;
mod schema;
mod trace;
mod value;

#[cfg(feature = "registry")]
mod config;
#[cfg(feature = "registry")]
mod registry;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Core types
pub use attribute::{Attribute, AttributeContainer, HasAttributes};
pub use matcher::AttributeMatcher;
pub use schema::AttributesSchema;
pub use value::{AttributeValue, CustomAttributeValue, ValueType};

// Rules
pub use rule::{
    compatibility_fn, disambiguation_fn, CandidateValues, Compatibility, CompatibilityCheck,
    CompatibilityRule, Decision, DisambiguationRule, FnRule,
};
pub use rules::{
    AtMostRequested, CompatibleValues, ExactMatch, PreferHighest, PreferLowest, PreferOrder,
    PreferRequested, PreferValue,
};

// Failures and diagnostics
pub use describer::{
    describer_fn, FailureDescriber, FailureDescriberRegistry, FnDescriber,
    GenericFailureDescriber, TemplateDescriber,
};
pub use failure::{FailureDetail, FailureKind, FailureReport, ResolutionFailure, SelectionError};

// Errors
pub use error::{AttributeMergeConflict, DescriberError, MatchError, RuleError, SchemaError};

// Registry (feature-gated)
#[cfg(feature = "registry")]
pub use config::{
    typed_value, AttributeConfig, ContainerConfig, DescriberConfig, RuleConfig, SchemaConfig,
    TypedConfig, UnitConfig, ValueTypeConfig,
};
#[cfg(feature = "registry")]
pub use registry::{
    register_core_rules, IntoCompatibilityRule, IntoDisambiguationRule, IntoFailureDescriber,
    RuleRegistry, RuleRegistryBuilder,
};

// Trace types
pub use trace::{AttributeCheck, CandidateTrace, DisambiguationStep, MatchTrace};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use vmatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Rule helpers
        compatibility_fn,
        describer_fn,
        disambiguation_fn,
        // Core types
        Attribute,
        AttributeContainer,
        AttributeMatcher,
        AttributeValue,
        AttributesSchema,
        // Traits
        Compatibility,
        CompatibilityRule,
        DisambiguationRule,
        // Built-in rules
        ExactMatch,
        FailureDescriber,
        // Failures
        FailureKind,
        FailureReport,
        HasAttributes,
        // Errors
        MatchError,
        // Trace types
        MatchTrace,
        PreferValue,
        ResolutionFailure,
        SchemaError,
        SelectionError,
        ValueType,
    };
}
