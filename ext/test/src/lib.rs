//! vmatch-test: Test domain for conformance testing
//!
//! Provides a simple named variant type and a few test-only rules for
//! exercising the matcher. This is the reference extension that demonstrates
//! how to build vmatch extensions.
//!
//! # Example
//!
//! ```
//! use vmatch_test::prelude::*;
//!
//! let usage = Attribute::string("usage");
//! let jar = TestVariant::new("api-jar").with(&usage, "api")?;
//!
//! assert_eq!(jar.name(), "api-jar");
//! assert_eq!(jar.attributes().get(&usage), Some(&AttributeValue::from("api")));
//! # Ok::<(), vmatch::SchemaError>(())
//! ```

use vmatch::prelude::*;
use vmatch::{CompatibilityCheck, RuleError};

#[cfg(feature = "fixtures")]
pub mod fixture;

/// A named variant: what a producer offers in conformance tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestVariant {
    name: String,
    attributes: AttributeContainer,
}

impl TestVariant {
    /// Create a variant with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: AttributeContainer::new(),
        }
    }

    /// Create a variant from an existing attribute set.
    #[must_use]
    pub fn from_attributes(name: impl Into<String>, attributes: AttributeContainer) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Add an attribute value (builder pattern).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ValueTypeMismatch`] if the value does not fit the attribute.
    pub fn with(
        mut self,
        attribute: &Attribute,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, SchemaError> {
        self.attributes.insert(attribute, value)?;
        Ok(self)
    }

    /// Variant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl HasAttributes for TestVariant {
    fn attributes(&self) -> &AttributeContainer {
        &self.attributes
    }
}

/// Compatible when the candidate string starts with the requested string
/// (`"jdk-17"` satisfies `"jdk"`). Abstains for non-strings or absent values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixCompatible;

impl CompatibilityRule for PrefixCompatible {
    fn check(&self, check: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> {
        let (Some(requested), Some(candidate)) = (
            check.requested.and_then(AttributeValue::as_str),
            check.candidate.and_then(AttributeValue::as_str),
        ) else {
            return Ok(Compatibility::NoOpinion);
        };
        Ok(if candidate.starts_with(requested) {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        })
    }
}

/// A rule that always fails. Used to check error propagation.
#[derive(Debug, Clone)]
pub struct FailingRule {
    message: String,
}

impl FailingRule {
    /// Create a rule failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl CompatibilityRule for FailingRule {
    fn check(&self, _: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> {
        Err(RuleError::new(self.message.clone()))
    }
}

impl DisambiguationRule for FailingRule {
    fn prefer(
        &self,
        _: &vmatch::CandidateValues<'_>,
    ) -> Result<Vec<AttributeValue>, RuleError> {
        Err(RuleError::new(self.message.clone()))
    }
}

/// A describer that never has anything to say.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecliningDescriber;

impl FailureDescriber for DecliningDescriber {
    fn describe(
        &self,
        _: &ResolutionFailure,
    ) -> Result<Option<String>, vmatch::DescriberError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "declining"
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{DecliningDescriber, FailingRule, PrefixCompatible, TestVariant};
    pub use vmatch::prelude::*;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry support (feature = "registry")
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "registry")]
mod registry_impls {
    use std::sync::Arc;

    use vmatch::{
        Attribute, CompatibilityRule, DisambiguationRule, FailureDescriber, IntoCompatibilityRule,
        IntoDisambiguationRule, IntoFailureDescriber, SchemaError, UnitConfig,
    };

    use super::{DecliningDescriber, FailingRule, PrefixCompatible};

    impl IntoCompatibilityRule for PrefixCompatible {
        type Config = UnitConfig;

        fn from_config(
            _: &Attribute,
            _: Self::Config,
        ) -> Result<Arc<dyn CompatibilityRule>, SchemaError> {
            Ok(Arc::new(PrefixCompatible))
        }
    }

    /// Configuration for [`FailingRule`].
    #[derive(Debug, serde::Deserialize)]
    pub struct FailingRuleConfig {
        /// The error message.
        #[serde(default = "default_message")]
        pub message: String,
    }

    fn default_message() -> String {
        "rule failed".to_string()
    }

    impl IntoCompatibilityRule for FailingRule {
        type Config = FailingRuleConfig;

        fn from_config(
            _: &Attribute,
            config: Self::Config,
        ) -> Result<Arc<dyn CompatibilityRule>, SchemaError> {
            Ok(Arc::new(FailingRule::new(config.message)))
        }
    }

    impl IntoDisambiguationRule for FailingRule {
        type Config = FailingRuleConfig;

        fn from_config(
            _: &Attribute,
            config: Self::Config,
        ) -> Result<Arc<dyn DisambiguationRule>, SchemaError> {
            Ok(Arc::new(FailingRule::new(config.message)))
        }
    }

    impl IntoFailureDescriber for DecliningDescriber {
        type Config = UnitConfig;

        fn from_config(_: Self::Config) -> Result<Arc<dyn FailureDescriber>, SchemaError> {
            Ok(Arc::new(DecliningDescriber))
        }
    }
}

/// Register all vmatch-test types with the given builder.
///
/// Registers the core rules plus:
/// - `vmatch.test.v1.PrefixCompatible` → [`PrefixCompatible`]
/// - `vmatch.test.v1.FailingRule` → [`FailingRule`] (both chains)
/// - `vmatch.test.v1.DecliningDescriber` → [`DecliningDescriber`]
#[cfg(feature = "registry")]
#[must_use]
pub fn register(builder: vmatch::RuleRegistryBuilder) -> vmatch::RuleRegistryBuilder {
    vmatch::register_core_rules(builder)
        .compatibility::<PrefixCompatible>("vmatch.test.v1.PrefixCompatible")
        .compatibility::<FailingRule>("vmatch.test.v1.FailingRule")
        .disambiguation::<FailingRule>("vmatch.test.v1.FailingRule")
        .describer::<DecliningDescriber>("vmatch.test.v1.DecliningDescriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmatch::{MatchError, PreferValue};

    #[test]
    fn test_variant_builder() {
        let usage = Attribute::string("usage");
        let debuggable = Attribute::bool("debuggable");
        let variant = TestVariant::new("debug-api")
            .with(&usage, "api")
            .and_then(|v| v.with(&debuggable, true))
            .unwrap();

        assert_eq!(variant.name(), "debug-api");
        assert_eq!(variant.attributes().len(), 2);
        assert!(TestVariant::new("bad").with(&debuggable, "yes").is_err());
    }

    #[test]
    fn test_select_variants() {
        let mut schema = AttributesSchema::new();
        let usage = schema.add_attribute("usage", ValueType::String).unwrap();
        let debuggable = schema.add_attribute("debuggable", ValueType::Bool).unwrap();
        schema.add_compatibility_rule(&usage, ExactMatch).unwrap();
        schema
            .add_disambiguation_rule(&debuggable, PreferValue::new(false))
            .unwrap();

        let variants = vec![
            TestVariant::new("runtime").with(&usage, "runtime").unwrap(),
            TestVariant::new("debug")
                .with(&usage, "api")
                .and_then(|v| v.with(&debuggable, true))
                .unwrap(),
            TestVariant::new("release")
                .with(&usage, "api")
                .and_then(|v| v.with(&debuggable, false))
                .unwrap(),
        ];
        let request = AttributeContainer::new().with(&usage, "api").unwrap();

        let selected = schema.matcher().select_one(&variants, &request).unwrap();
        assert_eq!(selected.name(), "release");
    }

    #[test]
    fn test_prefix_compatible() {
        let mut schema = AttributesSchema::new();
        let jdk = schema.add_attribute("jdk", ValueType::String).unwrap();
        schema.add_compatibility_rule(&jdk, PrefixCompatible).unwrap();
        let request = AttributeContainer::new().with(&jdk, "jdk").unwrap();
        let matcher = schema.matcher();

        let jdk17 = TestVariant::new("17").with(&jdk, "jdk-17").unwrap();
        let jre = TestVariant::new("jre").with(&jdk, "jre-17").unwrap();
        assert!(matcher.is_matching(&jdk17, &request).unwrap());
        assert!(!matcher.is_matching(&jre, &request).unwrap());
    }

    #[test]
    fn test_failing_rule_propagates() {
        let mut schema = AttributesSchema::new();
        let usage = schema.add_attribute("usage", ValueType::String).unwrap();
        schema
            .add_compatibility_rule(&usage, FailingRule::new("boom"))
            .unwrap();
        let variant = TestVariant::new("api").with(&usage, "api").unwrap();
        let request = AttributeContainer::new().with(&usage, "api").unwrap();

        let err = schema.matcher().is_matching(&variant, &request).unwrap_err();
        assert!(matches!(err, MatchError::RuleEvaluation { ref attribute, .. } if attribute == "usage"));
    }
}
