//! Classified resolution failures
//!
//! The matcher never explains anything itself: it classifies. A
//! [`ResolutionFailure`] records what was asked for, what was considered and
//! which [`FailureKind`] applies. Turning it into text is the job of the
//! [`FailureDescriberRegistry`](crate::FailureDescriberRegistry).

use std::fmt;

use thiserror::Error;

use crate::{Attribute, AttributeContainer, AttributeMergeConflict, AttributeValue, MatchError};

/// Failure category. Describers are registered against exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureKind {
    /// No candidate is compatible with the request.
    NoMatchingCandidates,
    /// Several candidates survived disambiguation.
    AmbiguousCandidates,
    /// Two attribute sets disagree on a shared attribute while being merged.
    IncompatibleAttributes,
}

impl FailureKind {
    /// Every kind, in declaration order.
    pub const ALL: [FailureKind; 3] = [
        Self::NoMatchingCandidates,
        Self::AmbiguousCandidates,
        Self::IncompatibleAttributes,
    ];

    /// Stable `snake_case` name used in configs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoMatchingCandidates => "no_matching_candidates",
            Self::AmbiguousCandidates => "ambiguous_candidates",
            Self::IncompatibleAttributes => "incompatible_attributes",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific payload of a [`ResolutionFailure`].
#[derive(Debug, Clone, PartialEq)]
pub enum FailureDetail {
    /// No candidate is compatible with the request.
    NoMatchingCandidates,
    /// Several candidates remain after disambiguation.
    AmbiguousCandidates,
    /// `attribute` holds `first` on one side and `second` on the other.
    IncompatibleAttributes {
        /// The shared attribute.
        attribute: Attribute,
        /// Value on the first side.
        first: AttributeValue,
        /// Value on the second side.
        second: AttributeValue,
    },
}

/// A classified resolution failure.
///
/// - `NoMatchingCandidates`: `candidates` holds every candidate considered.
/// - `AmbiguousCandidates`: `candidates` holds the candidates left after
///   disambiguation.
/// - `IncompatibleAttributes`: `request` is the first attribute set,
///   `candidates` holds the second.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", summary(.detail, .request, .candidates))]
pub struct ResolutionFailure {
    /// What happened.
    pub detail: FailureDetail,
    /// The consumer's request.
    pub request: AttributeContainer,
    /// The attribute sets relevant to this failure.
    pub candidates: Vec<AttributeContainer>,
}

fn summary(
    detail: &FailureDetail,
    request: &AttributeContainer,
    candidates: &[AttributeContainer],
) -> String {
    match detail {
        FailureDetail::NoMatchingCandidates => format!(
            "no variant matches {request} ({} candidates considered)",
            candidates.len()
        ),
        FailureDetail::AmbiguousCandidates => format!(
            "{} variants match {request} and none is preferred",
            candidates.len()
        ),
        FailureDetail::IncompatibleAttributes {
            attribute,
            first,
            second,
        } => format!("attribute '{attribute}' has conflicting values '{first}' and '{second}'"),
    }
}

impl ResolutionFailure {
    /// No candidate satisfied `request`.
    #[must_use]
    pub fn no_matching_candidates(
        request: AttributeContainer,
        candidates: Vec<AttributeContainer>,
    ) -> Self {
        Self {
            detail: FailureDetail::NoMatchingCandidates,
            request,
            candidates,
        }
    }

    /// More than one candidate survived disambiguation.
    #[must_use]
    pub fn ambiguous_candidates(
        request: AttributeContainer,
        survivors: Vec<AttributeContainer>,
    ) -> Self {
        Self {
            detail: FailureDetail::AmbiguousCandidates,
            request,
            candidates: survivors,
        }
    }

    /// Merging `first` and `second` hit `conflict`.
    #[must_use]
    pub fn incompatible_attributes(
        first: AttributeContainer,
        second: AttributeContainer,
        conflict: AttributeMergeConflict,
    ) -> Self {
        Self {
            detail: FailureDetail::IncompatibleAttributes {
                attribute: conflict.attribute,
                first: conflict.first,
                second: conflict.second,
            },
            request: first,
            candidates: vec![second],
        }
    }

    /// The failure kind used for describer lookup.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self.detail {
            FailureDetail::NoMatchingCandidates => FailureKind::NoMatchingCandidates,
            FailureDetail::AmbiguousCandidates => FailureKind::AmbiguousCandidates,
            FailureDetail::IncompatibleAttributes { .. } => FailureKind::IncompatibleAttributes,
        }
    }
}

/// Outcome of [`AttributeMatcher::select_one`](crate::AttributeMatcher::select_one)
/// when it cannot return a single candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    /// Zero or several candidates survived; recoverable by the caller.
    #[error(transparent)]
    Failure(#[from] ResolutionFailure),
    /// A rule or attribute declaration is broken.
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// User-facing explanation of a [`ResolutionFailure`].
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// The failure kind.
    pub kind: FailureKind,
    /// The consumer's request.
    pub request: AttributeContainer,
    /// The attribute sets relevant to the failure.
    pub candidates: Vec<AttributeContainer>,
    /// The explanation; never empty.
    pub text: String,
    /// Name of the describer that produced `text`.
    pub describer: String,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
