//! Rule traits and chain evaluation
//!
//! Every attribute owns two ordered chains:
//!
//! - a **compatibility chain** deciding whether a candidate value satisfies a
//!   requested value ([`CompatibilityRule`]);
//! - a **disambiguation chain** picking preferred values among several
//!   compatible candidates ([`DisambiguationRule`]).
//!
//! Rules are pure values behind `Arc`, shared between a schema and every
//! matcher snapshot taken from it. Closures become rules through
//! [`compatibility_fn`] and [`disambiguation_fn`].

use std::fmt;
use std::sync::Arc;

use crate::{Attribute, AttributeValue, RuleError};

/// Verdict of a single compatibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compatibility {
    /// The candidate value satisfies the request.
    Compatible,
    /// The candidate value rules the candidate out.
    Incompatible,
    /// This rule has nothing to say; the next rule in the chain decides.
    NoOpinion,
}

/// Input of a compatibility rule.
///
/// `None` means the side does not carry the attribute.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityCheck<'a> {
    /// The attribute being checked.
    pub attribute: &'a Attribute,
    /// The consumer's requested value.
    pub requested: Option<&'a AttributeValue>,
    /// The candidate's offered value.
    pub candidate: Option<&'a AttributeValue>,
}

/// Input of a disambiguation rule.
#[derive(Debug, Clone, Copy)]
pub struct CandidateValues<'a> {
    /// The attribute being disambiguated.
    pub attribute: &'a Attribute,
    /// The consumer's requested value, if the request carries the attribute.
    pub requested: Option<&'a AttributeValue>,
    /// Distinct values across the currently matching candidates, first-seen order.
    pub candidates: &'a [AttributeValue],
}

/// Decides whether a candidate value is compatible with a requested value.
///
/// Implementations must be deterministic and free of side effects: the same
/// input always yields the same verdict. Returning `Err` marks the rule as
/// broken; the error reaches the caller of the matcher.
pub trait CompatibilityRule: Send + Sync {
    /// Judge one attribute of one candidate.
    fn check(&self, check: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError>;
}

/// Picks the preferred values among several compatible candidates.
///
/// An empty result means "no opinion". Values that are not in
/// [`CandidateValues::candidates`] are ignored by the matcher, so a rule can
/// never eliminate every candidate.
pub trait DisambiguationRule: Send + Sync {
    /// Return the preferred subset of `values.candidates`.
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError>;
}

/// A rule built from a closure. See [`compatibility_fn`] and [`disambiguation_fn`].
pub struct FnRule<F>(F);

impl<F> fmt::Debug for FnRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnRule")
    }
}

/// Wrap a closure as a [`CompatibilityRule`].
///
/// ```
/// use vmatch::{compatibility_fn, Compatibility};
///
/// // "runtime" variants also satisfy "api" requests.
/// let rule = compatibility_fn(|check| {
///     Ok(match (check.requested.and_then(|v| v.as_str()), check.candidate.and_then(|v| v.as_str())) {
///         (Some("api"), Some("runtime")) => Compatibility::Compatible,
///         _ => Compatibility::NoOpinion,
///     })
/// });
/// # let _ = rule;
/// ```
pub fn compatibility_fn<F>(f: F) -> FnRule<F>
where
    F: Fn(&CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> + Send + Sync,
{
    FnRule(f)
}

/// Wrap a closure as a [`DisambiguationRule`].
pub fn disambiguation_fn<F>(f: F) -> FnRule<F>
where
    F: Fn(&CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> + Send + Sync,
{
    FnRule(f)
}

impl<F> CompatibilityRule for FnRule<F>
where
    F: Fn(&CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> + Send + Sync,
{
    fn check(&self, check: &CompatibilityCheck<'_>) -> Result<Compatibility, RuleError> {
        (self.0)(check)
    }
}

impl<F> DisambiguationRule for FnRule<F>
where
    F: Fn(&CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> + Send + Sync,
{
    fn prefer(&self, values: &CandidateValues<'_>) -> Result<Vec<AttributeValue>, RuleError> {
        (self.0)(values)
    }
}

pub(crate) type CompatibilityChain = Vec<Arc<dyn CompatibilityRule>>;
pub(crate) type DisambiguationChain = Vec<Arc<dyn DisambiguationRule>>;

/// Which link of a chain produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The rule at this index (registration order) decided.
    Rule(usize),
    /// No rule had an opinion; the built-in default applied.
    Default,
}

/// Run a compatibility chain. First definite opinion wins.
///
/// Default when every rule abstains: compatible if the values are equal or
/// either side is absent.
pub(crate) fn evaluate_compatibility(
    chain: &[Arc<dyn CompatibilityRule>],
    check: &CompatibilityCheck<'_>,
) -> Result<(bool, Decision), RuleError> {
    for (index, rule) in chain.iter().enumerate() {
        match rule.check(check)? {
            Compatibility::Compatible => return Ok((true, Decision::Rule(index))),
            Compatibility::Incompatible => return Ok((false, Decision::Rule(index))),
            Compatibility::NoOpinion => {}
        }
    }
    let compatible = match (check.requested, check.candidate) {
        (Some(requested), Some(candidate)) => requested == candidate,
        _ => true,
    };
    Ok((compatible, Decision::Default))
}

/// Run a disambiguation chain. The first rule whose answer keeps at least one
/// of the input values wins; otherwise every value is preferred.
///
/// The returned subset preserves the input order.
pub(crate) fn evaluate_disambiguation(
    chain: &[Arc<dyn DisambiguationRule>],
    values: &CandidateValues<'_>,
) -> Result<(Vec<AttributeValue>, Decision), RuleError> {
    for (index, rule) in chain.iter().enumerate() {
        let answer = rule.prefer(values)?;
        let preferred: Vec<AttributeValue> = values
            .candidates
            .iter()
            .filter(|v| answer.contains(v))
            .cloned()
            .collect();
        if !preferred.is_empty() {
            return Ok((preferred, Decision::Rule(index)));
        }
    }
    Ok((values.candidates.to_vec(), Decision::Default))
}
