//! Built-in compatibility and disambiguation rules
//!
//! # Compatibility
//!
//! - [`ExactMatch`]: equal values are compatible, different values are not
//! - [`CompatibleValues`]: a requested value also accepts a fixed set of candidate values
//! - [`AtMostRequested`]: integer candidates up to the requested value are compatible
//!
//! # Disambiguation
//!
//! - [`PreferValue`]: prefer one specific value
//! - [`PreferOrder`]: prefer the earliest value of an ordered list
//! - [`PreferRequested`]: prefer the value the consumer asked for
//! - [`PreferHighest`] / [`PreferLowest`]: integer extremes

use crate::{
    AttributeValue, CandidateValues, Compatibility, CompatibilityCheck, CompatibilityRule,
    DisambiguationRule, RuleError,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Compatibility rules
// ═══════════════════════════════════════════════════════════════════════════════

/// Exact equality.
///
/// Abstains when either side is absent, so it never eliminates a candidate
/// that simply does not carry the attribute.
///
/// ```
/// use vmatch::{Attribute, AttributeValue, Compatibility, CompatibilityCheck, CompatibilityRule, ExactMatch};
///
/// let usage = Attribute::string("usage");
/// let (api, runtime) = (AttributeValue::from("api"), AttributeValue::from("runtime"));
/// let check = CompatibilityCheck { attribute: &usage, requested: Some(&api), candidate: Some(&runtime) };
/// assert_eq!(ExactMatch.check(&check), Ok(Compatibility::Incompatible));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl CompatibilityRule for ExactMatch {
    fn check(&self, check: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> {
        Ok(match (check.requested, check.candidate) {
            (Some(requested), Some(candidate)) if requested == candidate => {
                Compatibility::Compatible
            }
            (Some(_), Some(_)) => Compatibility::Incompatible,
            _ => Compatibility::NoOpinion,
        })
    }
}

/// Declares that a request for `requested` is also satisfied by any of `accepts`.
///
/// Abstains for every other combination, so it is usually registered ahead of
/// an [`ExactMatch`] or relies on the default equality check.
#[derive(Debug, Clone)]
pub struct CompatibleValues {
    requested: AttributeValue,
    accepts: Vec<AttributeValue>,
}

impl CompatibleValues {
    /// Create a rule accepting `accepts` for requests of `requested`.
    pub fn new(
        requested: impl Into<AttributeValue>,
        accepts: impl IntoIterator<Item = AttributeValue>,
    ) -> Self {
        Self {
            requested: requested.into(),
            accepts: accepts.into_iter().collect(),
        }
    }
}

impl CompatibilityRule for CompatibleValues {
    fn check(&self, check: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> {
        match (check.requested, check.candidate) {
            (Some(requested), Some(candidate))
                if requested == &self.requested && self.accepts.contains(candidate) =>
            {
                Ok(Compatibility::Compatible)
            }
            _ => Ok(Compatibility::NoOpinion),
        }
    }
}

/// Integer candidates are compatible when they do not exceed the request
/// (a library built for level 8 runs on a level 11 consumer).
///
/// Non-integer values are a rule error: the attribute was declared with the
/// wrong type for this rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtMostRequested;

impl CompatibilityRule for AtMostRequested {
    fn check(&self, check: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> {
        let (Some(requested), Some(candidate)) = (check.requested, check.candidate) else {
            return Ok(Compatibility::NoOpinion);
        };
        let (Some(requested), Some(candidate)) = (requested.as_int(), candidate.as_int()) else {
            return Err(RuleError::new(format!(
                "AtMostRequested needs integer values for attribute '{}'",
                check.attribute
            )));
        };
        Ok(if candidate <= requested {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Disambiguation rules
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefer one specific value when it is among the candidates.
#[derive(Debug, Clone)]
pub struct PreferValue {
    value: AttributeValue,
}

impl PreferValue {
    /// Create a rule preferring `value`.
    pub fn new(value: impl Into<AttributeValue>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl DisambiguationRule for PreferValue {
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> {
        Ok(values
            .candidates
            .iter()
            .filter(|v| **v == self.value)
            .cloned()
            .collect())
    }
}

/// Prefer the first value of `order` present among the candidates.
///
/// ```
/// use vmatch::{Attribute, AttributeValue, CandidateValues, DisambiguationRule, PreferOrder};
///
/// let usage = Attribute::string("usage");
/// let rule = PreferOrder::new(["runtime", "api"].map(AttributeValue::from));
/// let values = ["api", "runtime"].map(AttributeValue::from);
/// let input = CandidateValues { attribute: &usage, requested: None, candidates: &values };
/// assert_eq!(rule.prefer(&input), Ok(vec![AttributeValue::from("runtime")]));
/// ```
#[derive(Debug, Clone)]
pub struct PreferOrder {
    order: Vec<AttributeValue>,
}

impl PreferOrder {
    /// Create a rule preferring earlier entries of `order`.
    pub fn new(order: impl IntoIterator<Item = AttributeValue>) -> Self {
        Self {
            order: order.into_iter().collect(),
        }
    }
}

impl DisambiguationRule for PreferOrder {
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> {
        Ok(self
            .order
            .iter()
            .find(|v| values.candidates.contains(v))
            .cloned()
            .into_iter()
            .collect())
    }
}

/// Prefer candidates carrying exactly the requested value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferRequested;

impl DisambiguationRule for PreferRequested {
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> {
        Ok(values
            .requested
            .filter(|requested| values.candidates.contains(requested))
            .cloned()
            .into_iter()
            .collect())
    }
}

/// Prefer the highest integer value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferHighest;

impl DisambiguationRule for PreferHighest {
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> {
        int_extreme(values, "PreferHighest", Iterator::max)
    }
}

/// Prefer the lowest integer value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferLowest;

impl DisambiguationRule for PreferLowest {
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> {
        int_extreme(values, "PreferLowest", Iterator::min)
    }
}

fn int_extreme(
    values: &CandidateValues<'_>,
    rule: &str,
    pick: fn(std::vec::IntoIter<i64>) -> Option<i64>,
) -> Result<Vec<AttributeValue>, RuleError> {
    let ints = values
        .candidates
        .iter()
        .map(|v| {
            v.as_int().ok_or_else(|| {
                RuleError::new(format!(
                    "{rule} needs integer values for attribute '{}', found '{v}'",
                    values.attribute
                ))
            })
        })
        .collect::<Result<Vec<i64>, RuleError>>()?;
    Ok(pick(ints.into_iter())
        .map(AttributeValue::Int)
        .into_iter()
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry constructors (feature = "registry")
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "registry")]
mod into_rule {
    use std::sync::Arc;

    use serde::Deserialize;

    use super::{
        AtMostRequested, CompatibleValues, ExactMatch, PreferHighest, PreferLowest, PreferOrder,
        PreferRequested, PreferValue,
    };
    use crate::config::{typed_value, UnitConfig};
    use crate::registry::{IntoCompatibilityRule, IntoDisambiguationRule};
    use crate::{Attribute, AttributeValue, CompatibilityRule, DisambiguationRule, SchemaError};

    fn typed_values(
        attribute: &Attribute,
        raw: &[serde_json::Value],
    ) -> Result<Vec<AttributeValue>, SchemaError> {
        raw.iter().map(|v| typed_value(attribute, v)).collect()
    }

    // ── Compatibility ────────────────────────────────────────────────────────

    impl IntoCompatibilityRule for ExactMatch {
        type Config = UnitConfig;

        fn from_config(
            _: &Attribute,
            _: Self::Config,
        ) -> Result<Arc<dyn CompatibilityRule>, SchemaError> {
            Ok(Arc::new(ExactMatch))
        }
    }

    /// Configuration for [`CompatibleValues`].
    ///
    /// ```json
    /// { "requested": "api", "accepts": ["runtime"] }
    /// ```
    #[derive(Debug, Clone, Deserialize)]
    pub struct CompatibleValuesConfig {
        /// The requested value this rule applies to.
        pub requested: serde_json::Value,
        /// Candidate values also accepted for it.
        pub accepts: Vec<serde_json::Value>,
    }

    impl IntoCompatibilityRule for CompatibleValues {
        type Config = CompatibleValuesConfig;

        fn from_config(
            attribute: &Attribute,
            config: Self::Config,
        ) -> Result<Arc<dyn CompatibilityRule>, SchemaError> {
            Ok(Arc::new(CompatibleValues::new(
                typed_value(attribute, &config.requested)?,
                typed_values(attribute, &config.accepts)?,
            )))
        }
    }

    impl IntoCompatibilityRule for AtMostRequested {
        type Config = UnitConfig;

        fn from_config(
            _: &Attribute,
            _: Self::Config,
        ) -> Result<Arc<dyn CompatibilityRule>, SchemaError> {
            Ok(Arc::new(AtMostRequested))
        }
    }

    // ── Disambiguation ───────────────────────────────────────────────────────

    /// Configuration for [`PreferValue`].
    #[derive(Debug, Clone, Deserialize)]
    pub struct PreferValueConfig {
        /// The preferred value.
        pub value: serde_json::Value,
    }

    impl IntoDisambiguationRule for PreferValue {
        type Config = PreferValueConfig;

        fn from_config(
            attribute: &Attribute,
            config: Self::Config,
        ) -> Result<Arc<dyn DisambiguationRule>, SchemaError> {
            Ok(Arc::new(PreferValue::new(typed_value(
                attribute,
                &config.value,
            )?)))
        }
    }

    /// Configuration for [`PreferOrder`].
    #[derive(Debug, Clone, Deserialize)]
    pub struct PreferOrderConfig {
        /// Values from most to least preferred.
        pub order: Vec<serde_json::Value>,
    }

    impl IntoDisambiguationRule for PreferOrder {
        type Config = PreferOrderConfig;

        fn from_config(
            attribute: &Attribute,
            config: Self::Config,
        ) -> Result<Arc<dyn DisambiguationRule>, SchemaError> {
            if config.order.is_empty() {
                return Err(SchemaError::InvalidConfig {
                    message: format!("PreferOrder for '{attribute}': order must not be empty"),
                });
            }
            Ok(Arc::new(PreferOrder::new(typed_values(
                attribute,
                &config.order,
            )?)))
        }
    }

    macro_rules! unit_disambiguation {
        ($($rule:ident),+) => {$(
            impl IntoDisambiguationRule for $rule {
                type Config = UnitConfig;

                fn from_config(
                    _: &Attribute,
                    _: Self::Config,
                ) -> Result<Arc<dyn DisambiguationRule>, SchemaError> {
                    Ok(Arc::new($rule))
                }
            }
        )+};
    }

    unit_disambiguation!(PreferRequested, PreferHighest, PreferLowest);
}
