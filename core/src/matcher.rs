//! `AttributeMatcher`: immutable snapshot that selects variants
//!
//! Selection runs in two phases:
//!
//! 1. **Compatibility** (hard constraint): every attribute of the request is
//!    checked against the candidate through the consumer's compatibility
//!    chain. One incompatible attribute rules the candidate out.
//! 2. **Disambiguation** (soft preference): while more than one candidate is
//!    left, attributes are visited in a fixed order and each chain narrows
//!    the survivors to those carrying a preferred value.
//!
//! The snapshot holds the consumer's and producer's schema state behind `Arc`,
//! is `Send + Sync`, and can be shared by any number of resolution workers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::rule::{evaluate_compatibility, evaluate_disambiguation};
use crate::schema::SchemaState;
use crate::{
    Attribute, AttributeCheck, AttributeContainer, AttributeValue, CandidateTrace,
    CandidateValues, CompatibilityCheck, DisambiguationStep, FailureReport, HasAttributes,
    MatchError, MatchTrace, ResolutionFailure, SelectionError,
};

/// Read-only view over a consumer schema and a producer schema.
///
/// Built by [`AttributesSchema::with_producer`](crate::AttributesSchema::with_producer)
/// or [`AttributesSchema::matcher`](crate::AttributesSchema::matcher).
///
/// # INV: Consumer rules only
///
/// Compatibility and disambiguation chains always come from the consumer.
/// The producer only contributes attribute declarations the consumer lacks.
#[derive(Clone)]
pub struct AttributeMatcher {
    consumer: Arc<SchemaState>,
    producer: Arc<SchemaState>,
}

impl AttributeMatcher {
    pub(crate) fn new(consumer: Arc<SchemaState>, producer: Arc<SchemaState>) -> Self {
        Self { consumer, producer }
    }

    /// Look up an attribute, consumer first, then producer.
    #[must_use]
    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.consumer
            .attribute_by_name(name)
            .or_else(|| self.producer.attribute_by_name(name))
    }

    /// Returns `true` if `candidate` is compatible with every attribute of `request`.
    ///
    /// Attributes the candidate carries but the request does not mention never
    /// make it incompatible.
    ///
    /// # Errors
    ///
    /// - [`MatchError::RuleEvaluation`]: a rule failed
    /// - [`MatchError::UncoercibleValue`]: the candidate's value cannot be read
    ///   as the requested type
    pub fn is_matching<C>(&self, candidate: &C, request: &AttributeContainer) -> Result<bool, MatchError>
    where
        C: HasAttributes + ?Sized,
    {
        self.check_candidate(candidate.attributes(), request, None)
    }

    /// Select the best candidates for `request`.
    ///
    /// Returns the survivors in input order: empty means no match, several
    /// means ambiguous. The result is always a subset of `candidates`, and
    /// is never empty when at least one candidate is compatible.
    ///
    /// # Errors
    ///
    /// Rule failures and uncoercible values propagate immediately; see
    /// [`is_matching`](Self::is_matching). During disambiguation a value
    /// that cannot be read as another survivor's type is only an error when
    /// the attribute has disambiguation rules.
    pub fn select_matches<'a, C>(
        &self,
        candidates: &'a [C],
        request: &AttributeContainer,
    ) -> Result<Vec<&'a C>, MatchError>
    where
        C: HasAttributes,
    {
        let selected = self.select(candidates, request, None)?;
        Ok(selected.into_iter().map(|i| &candidates[i]).collect())
    }

    /// Select exactly one candidate, classifying anything else as a failure.
    ///
    /// # Errors
    ///
    /// - [`SelectionError::Failure`] with `NoMatchingCandidates` (listing every
    ///   candidate) or `AmbiguousCandidates` (listing the survivors)
    /// - [`SelectionError::Match`] when a rule fails
    pub fn select_one<'a, C>(
        &self,
        candidates: &'a [C],
        request: &AttributeContainer,
    ) -> Result<&'a C, SelectionError>
    where
        C: HasAttributes,
    {
        let selected = self.select_matches(candidates, request)?;
        match selected.as_slice() {
            [one] => Ok(*one),
            [] => Err(ResolutionFailure::no_matching_candidates(
                request.clone(),
                candidates.iter().map(|c| c.attributes().clone()).collect(),
            )
            .into()),
            survivors => Err(ResolutionFailure::ambiguous_candidates(
                request.clone(),
                survivors.iter().map(|c| c.attributes().clone()).collect(),
            )
            .into()),
        }
    }

    /// Same as [`select_matches`](Self::select_matches), with a full record of
    /// both phases.
    ///
    /// # Errors
    ///
    /// Same as [`select_matches`](Self::select_matches).
    pub fn select_with_trace<C>(
        &self,
        candidates: &[C],
        request: &AttributeContainer,
    ) -> Result<MatchTrace, MatchError>
    where
        C: HasAttributes,
    {
        let mut trace = MatchTrace {
            result: Vec::new(),
            candidates: Vec::with_capacity(candidates.len()),
            disambiguation: Vec::new(),
        };
        trace.result = self.select(candidates, request, Some(&mut trace))?;
        Ok(trace)
    }

    /// Merge two requests, failing on the first conflicting attribute.
    ///
    /// # Errors
    ///
    /// Returns an `IncompatibleAttributes` [`ResolutionFailure`].
    pub fn merge_requests(
        &self,
        first: &AttributeContainer,
        second: &AttributeContainer,
    ) -> Result<AttributeContainer, ResolutionFailure> {
        first.safe_concat(second).map_err(|conflict| {
            ResolutionFailure::incompatible_attributes(first.clone(), second.clone(), conflict)
        })
    }

    /// Explain `failure` with the consumer's describers.
    #[must_use]
    pub fn describe(&self, failure: &ResolutionFailure) -> FailureReport {
        self.consumer.describers.describe(failure)
    }

    fn select<C>(
        &self,
        candidates: &[C],
        request: &AttributeContainer,
        mut trace: Option<&mut MatchTrace>,
    ) -> Result<Vec<usize>, MatchError>
    where
        C: HasAttributes,
    {
        let mut matching = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let mut checks = trace.as_ref().map(|_| Vec::new());
            let matched = self.check_candidate(candidate.attributes(), request, checks.as_mut())?;
            trace!(index, matched, "checked candidate");
            if matched {
                matching.push(index);
            }
            if let (Some(trace), Some(checks)) = (trace.as_deref_mut(), checks) {
                trace.candidates.push(CandidateTrace {
                    index,
                    matched,
                    checks,
                });
            }
        }

        let selected = if matching.len() > 1 {
            self.disambiguate(candidates, request, matching.clone(), trace)?
        } else {
            matching.clone()
        };

        debug!(
            candidates = candidates.len(),
            matching = matching.len(),
            selected = selected.len(),
            "selected variants"
        );
        Ok(selected)
    }

    fn check_candidate(
        &self,
        candidate: &AttributeContainer,
        request: &AttributeContainer,
        mut checks: Option<&mut Vec<AttributeCheck>>,
    ) -> Result<bool, MatchError> {
        for (attribute, requested) in request.iter() {
            let offered = match candidate.get_by_name(attribute.name()) {
                Some((_, value)) => Some(coerce(attribute, value)?),
                None => None,
            };
            let chain = self.consumer.compatibility_chain(attribute.name());
            let (compatible, decided_by) = evaluate_compatibility(
                chain,
                &CompatibilityCheck {
                    attribute,
                    requested: Some(requested),
                    candidate: offered.as_ref(),
                },
            )
            .map_err(|source| MatchError::RuleEvaluation {
                attribute: attribute.name().to_string(),
                source,
            })?;

            if let Some(checks) = checks.as_deref_mut() {
                checks.push(AttributeCheck {
                    attribute: attribute.name().to_string(),
                    requested: requested.clone(),
                    candidate: offered,
                    compatible,
                    decided_by,
                });
            }
            if !compatible {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn disambiguate<C>(
        &self,
        candidates: &[C],
        request: &AttributeContainer,
        mut survivors: Vec<usize>,
        mut trace: Option<&mut MatchTrace>,
    ) -> Result<Vec<usize>, MatchError>
    where
        C: HasAttributes,
    {
        for attribute in self.disambiguation_order(candidates, &survivors) {
            if survivors.len() <= 1 {
                break;
            }

            let chain = self.consumer.disambiguation_chain(attribute.name());
            let mut values: Vec<AttributeValue> = Vec::new();
            let mut carried: Vec<(usize, Option<AttributeValue>)> =
                Vec::with_capacity(survivors.len());
            let mut uncoercible = None;
            for &index in &survivors {
                let value = match candidates[index]
                    .attributes()
                    .get_by_name(attribute.name())
                {
                    Some((_, value)) => match coerce(&attribute, value) {
                        Ok(value) => Some(value),
                        Err(error) => {
                            uncoercible = Some(error);
                            break;
                        }
                    },
                    None => None,
                };
                if let Some(value) = &value {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                carried.push((index, value));
            }
            if let Some(error) = uncoercible {
                // Without rules every value is equally preferred.
                if chain.is_empty() {
                    trace!(attribute = attribute.name(), "mixed value types, no rules, skipped");
                    continue;
                }
                return Err(error);
            }
            if values.len() < 2 {
                continue;
            }

            let requested = match request.get_by_name(attribute.name()) {
                Some((_, value)) => Some(coerce(&attribute, value)?),
                None => None,
            };
            let (preferred, decided_by) = evaluate_disambiguation(
                chain,
                &CandidateValues {
                    attribute: &attribute,
                    requested: requested.as_ref(),
                    candidates: &values,
                },
            )
            .map_err(|source| MatchError::RuleEvaluation {
                attribute: attribute.name().to_string(),
                source,
            })?;

            survivors = carried
                .into_iter()
                .filter(|(_, value)| value.as_ref().map_or(true, |v| preferred.contains(v)))
                .map(|(index, _)| index)
                .collect();
            trace!(attribute = attribute.name(), remaining = survivors.len(), "disambiguated");

            if let Some(trace) = trace.as_deref_mut() {
                trace.disambiguation.push(DisambiguationStep {
                    attribute: attribute.name().to_string(),
                    values,
                    preferred,
                    decided_by,
                    remaining: survivors.clone(),
                });
            }
        }
        Ok(survivors)
    }

    /// Consumer declarations, then producer-only declarations, then attributes
    /// neither schema knows (by name). Only attributes some survivor carries.
    fn disambiguation_order<C>(&self, candidates: &[C], survivors: &[usize]) -> Vec<Attribute>
    where
        C: HasAttributes,
    {
        let mut present: BTreeMap<&str, &Attribute> = BTreeMap::new();
        for &index in survivors {
            for attribute in candidates[index].attributes().attributes() {
                present.entry(attribute.name()).or_insert(attribute);
            }
        }

        let mut order = Vec::with_capacity(present.len());
        let declared = self.consumer.attributes.iter().chain(
            self.producer
                .attributes
                .iter()
                .filter(|a| self.consumer.attribute_by_name(a.name()).is_none()),
        );
        for attribute in declared {
            if present.remove(attribute.name()).is_some() {
                order.push(attribute.clone());
            }
        }
        order.extend(present.into_values().cloned());
        order
    }
}

/// Read `value` as `attribute`'s type.
fn coerce(attribute: &Attribute, value: &AttributeValue) -> Result<AttributeValue, MatchError> {
    value
        .coerce(attribute.value_type())
        .ok_or_else(|| MatchError::UncoercibleValue {
            attribute: attribute.name().to_string(),
            expected: attribute.value_type(),
            found: value.value_type(),
            value: value.to_string(),
        })
}

impl fmt::Debug for AttributeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeMatcher")
            .field("consumer_attributes", &self.consumer.attributes.len())
            .field("producer_attributes", &self.producer.attributes.len())
            .field("shared", &Arc::ptr_eq(&self.consumer, &self.producer))
            .finish()
    }
}
