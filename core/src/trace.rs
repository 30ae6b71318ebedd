//! Selection trace types for debugging matcher behavior.
//!
//! Trace types mirror the two phases of [`AttributeMatcher`](crate::AttributeMatcher)
//! selection but capture outcomes instead of inputs. Use
//! `select_with_trace()` to see which rule decided each attribute and how
//! disambiguation narrowed the candidates.
//!
//! # Two Levels of Trace
//!
//! - [`CandidateTrace`]: Per candidate: which attributes were checked, which rule decided?
//! - [`DisambiguationStep`]: Per attribute: which values competed, which were preferred?
//!
//! # Example
//!
//! ```ignore
//! let trace = matcher.select_with_trace(&candidates, &request)?;
//! println!("Selected: {:?}", trace.result);
//! for step in &trace.disambiguation {
//!     println!("  {}: {:?} -> {:?}", step.attribute, step.values, step.preferred);
//! }
//! ```

use std::fmt;

use crate::{AttributeValue, Decision};

/// Full record of one selection.
///
/// # INV: `result` == `select_matches()` result
///
/// `result` holds the indices of exactly the candidates
/// [`select_matches()`](crate::AttributeMatcher::select_matches) returns for
/// the same input, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchTrace {
    /// Indices of the selected candidates.
    pub result: Vec<usize>,
    /// Compatibility phase, one entry per candidate in input order.
    pub candidates: Vec<CandidateTrace>,
    /// Disambiguation phase, one entry per attribute that had competing values.
    pub disambiguation: Vec<DisambiguationStep>,
}

impl MatchTrace {
    /// Indices of the candidates that passed the compatibility phase.
    #[must_use]
    pub fn matching(&self) -> Vec<usize> {
        self.candidates
            .iter()
            .filter(|c| c.matched)
            .map(|c| c.index)
            .collect()
    }
}

/// Compatibility phase for one candidate.
///
/// Checks stop at the first incompatible attribute, like `is_matching()`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTrace {
    /// Index in the candidate slice.
    pub index: usize,
    /// Did the candidate pass every check?
    pub matched: bool,
    /// One entry per requested attribute evaluated.
    pub checks: Vec<AttributeCheck>,
}

/// One requested attribute checked against one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCheck {
    /// Attribute name.
    pub attribute: String,
    /// The requested value.
    pub requested: AttributeValue,
    /// The candidate value after coercion, if the candidate carries the attribute.
    pub candidate: Option<AttributeValue>,
    /// The verdict.
    pub compatible: bool,
    /// Which rule produced the verdict.
    pub decided_by: Decision,
}

/// One attribute's narrowing step.
#[derive(Debug, Clone, PartialEq)]
pub struct DisambiguationStep {
    /// Attribute name.
    pub attribute: String,
    /// Distinct values among the candidates still in play.
    pub values: Vec<AttributeValue>,
    /// Values the chain preferred.
    pub preferred: Vec<AttributeValue>,
    /// Which rule produced the preference.
    pub decided_by: Decision,
    /// Candidate indices left after this step.
    pub remaining: Vec<usize>,
}

impl fmt::Display for MatchTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for candidate in &self.candidates {
            let verdict = if candidate.matched { "compatible" } else { "incompatible" };
            writeln!(f, "candidate {}: {verdict}", candidate.index)?;
            for check in &candidate.checks {
                let found = check
                    .candidate
                    .as_ref()
                    .map_or_else(|| "<absent>".to_string(), ToString::to_string);
                writeln!(
                    f,
                    "  {}: requested '{}', found '{found}' -> {} ({})",
                    check.attribute,
                    check.requested,
                    if check.compatible { "ok" } else { "rejected" },
                    describe_decision(check.decided_by),
                )?;
            }
        }
        for step in &self.disambiguation {
            writeln!(
                f,
                "disambiguate {}: [{}] -> [{}] ({}), remaining {:?}",
                step.attribute,
                join(&step.values),
                join(&step.preferred),
                describe_decision(step.decided_by),
                step.remaining,
            )?;
        }
        write!(f, "selected {:?}", self.result)
    }
}

fn describe_decision(decision: Decision) -> String {
    match decision {
        Decision::Rule(index) => format!("rule #{index}"),
        Decision::Default => "default".to_string(),
    }
}

fn join(values: &[AttributeValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
