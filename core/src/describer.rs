//! Failure describers: pluggable diagnostics for resolution failures
//!
//! Describers are registered per [`FailureKind`]. Lookup is exact (no kind
//! hierarchy) and most-recent-first. Describing a failure tries each
//! registered describer until one produces text; declines, empty text and
//! describer errors all move on to the next one, and
//! [`GenericFailureDescriber`] answers when nobody else does.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::schema::same_arc;
use crate::{
    AttributeContainer, DescriberError, FailureDetail, FailureKind, FailureReport,
    ResolutionFailure,
};

/// Produces a human-readable explanation for a failure, or declines.
///
/// Describers must be pure: no I/O, no shared mutable state. They run on
/// whichever resolution worker hit the failure.
pub trait FailureDescriber: Send + Sync {
    /// Explain `failure`. `Ok(None)` declines.
    fn describe(&self, failure: &ResolutionFailure) -> Result<Option<String>, DescriberError>;

    /// Name recorded in [`FailureReport::describer`].
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A describer built from a closure. See [`describer_fn`].
pub struct FnDescriber<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named [`FailureDescriber`].
///
/// ```
/// use vmatch::{describer_fn, FailureDetail};
///
/// let describer = describer_fn("usage-hint", |failure| {
///     Ok(matches!(failure.detail, FailureDetail::NoMatchingCandidates)
///         .then(|| "Did you mean to request a runtime variant?".to_string()))
/// });
/// # let _ = describer;
/// ```
pub fn describer_fn<F>(name: impl Into<String>, f: F) -> FnDescriber<F>
where
    F: Fn(&ResolutionFailure) -> Result<Option<String>, DescriberError> + Send + Sync,
{
    FnDescriber {
        name: name.into(),
        f,
    }
}

impl<F> FailureDescriber for FnDescriber<F>
where
    F: Fn(&ResolutionFailure) -> Result<Option<String>, DescriberError> + Send + Sync,
{
    fn describe(&self, failure: &ResolutionFailure) -> Result<Option<String>, DescriberError> {
        (self.f)(failure)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered describers per failure kind.
#[derive(Clone, Default)]
pub struct FailureDescriberRegistry {
    describers: HashMap<FailureKind, Vec<Arc<dyn FailureDescriber>>>,
}

impl FailureDescriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `describer` for `kind`. It is tried before every describer
    /// registered earlier for the same kind.
    pub fn add(&mut self, kind: FailureKind, describer: Arc<dyn FailureDescriber>) {
        self.describers.entry(kind).or_default().insert(0, describer);
    }

    /// Describers registered for exactly `kind`, most recent first.
    #[must_use]
    pub fn describers(&self, kind: FailureKind) -> &[Arc<dyn FailureDescriber>] {
        self.describers.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Total number of registered describers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.describers.values().map(Vec::len).sum()
    }

    /// Returns `true` if no describer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `base`'s describers behind the ones already registered,
    /// skipping describers this registry already holds.
    pub(crate) fn inherit(&mut self, base: &FailureDescriberRegistry) {
        for (kind, inherited) in &base.describers {
            let held = self.describers.entry(*kind).or_default();
            for describer in inherited {
                if !held.iter().any(|d| same_arc(d, describer)) {
                    held.push(Arc::clone(describer));
                }
            }
        }
    }

    /// Explain `failure` with the first describer that answers.
    ///
    /// Falls back to [`GenericFailureDescriber`]; the resulting text is never
    /// empty.
    #[must_use]
    pub fn describe(&self, failure: &ResolutionFailure) -> FailureReport {
        let kind = failure.kind();
        for describer in self.describers(kind) {
            match describer.describe(failure) {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    return report(failure, text, describer.name());
                }
                Ok(_) => debug!(describer = describer.name(), %kind, "describer declined"),
                Err(error) => {
                    warn!(describer = describer.name(), %kind, %error, "describer failed, skipping");
                }
            }
        }
        let generic = GenericFailureDescriber;
        report(failure, generic.render(failure), generic.name())
    }
}

impl std::fmt::Debug for FailureDescriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(FailureKind, usize)> =
            self.describers.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort();
        f.debug_struct("FailureDescriberRegistry")
            .field("describers", &counts)
            .finish()
    }
}

fn report(failure: &ResolutionFailure, text: String, describer: &str) -> FailureReport {
    FailureReport {
        kind: failure.kind(),
        request: failure.request.clone(),
        candidates: failure.candidates.clone(),
        text,
        describer: describer.to_string(),
    }
}

/// Fallback describer: lists requested and offered values side by side.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericFailureDescriber;

impl GenericFailureDescriber {
    /// Render `failure`. Always non-empty.
    #[must_use]
    pub fn render(&self, failure: &ResolutionFailure) -> String {
        let mut out = String::new();
        match &failure.detail {
            FailureDetail::NoMatchingCandidates => {
                if failure.candidates.is_empty() {
                    let _ = write!(out, "No variant matches {}: no candidates were offered.", failure.request);
                    return out;
                }
                let _ = write!(
                    out,
                    "No variant matches {}. {} candidate(s) were considered:",
                    failure.request,
                    failure.candidates.len()
                );
            }
            FailureDetail::AmbiguousCandidates => {
                let _ = write!(
                    out,
                    "Cannot choose between {} variants matching {}:",
                    failure.candidates.len(),
                    failure.request
                );
            }
            FailureDetail::IncompatibleAttributes {
                attribute,
                first,
                second,
            } => {
                let _ = write!(
                    out,
                    "Cannot merge attribute sets {} and {}: attribute '{attribute}' is '{first}' on one side and '{second}' on the other.",
                    failure.request,
                    failure
                        .candidates
                        .first()
                        .map_or_else(String::new, ToString::to_string),
                );
                return out;
            }
        }
        for (index, candidate) in failure.candidates.iter().enumerate() {
            let _ = write!(out, "\n  - candidate {}:", index + 1);
            compare(&mut out, &failure.request, candidate);
        }
        out
    }
}

impl FailureDescriber for GenericFailureDescriber {
    fn describe(&self, failure: &ResolutionFailure) -> Result<Option<String>, DescriberError> {
        Ok(Some(self.render(failure)))
    }

    fn name(&self) -> &str {
        "generic"
    }
}

/// Fixed text with `{request}`, `{count}` and `{kind}` placeholders.
///
/// ```
/// use vmatch::{AttributeContainer, FailureDescriber, ResolutionFailure, TemplateDescriber};
///
/// let describer = TemplateDescriber::new("{count} variants fit {request}");
/// let failure = ResolutionFailure::ambiguous_candidates(AttributeContainer::new(), vec![]);
/// assert_eq!(describer.describe(&failure).unwrap().as_deref(), Some("0 variants fit {}"));
/// ```
#[derive(Debug, Clone)]
pub struct TemplateDescriber {
    template: String,
}

impl TemplateDescriber {
    /// Create a describer rendering `template`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl FailureDescriber for TemplateDescriber {
    fn describe(&self, failure: &ResolutionFailure) -> Result<Option<String>, DescriberError> {
        if self.template.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(
            self.template
                .replace("{request}", &failure.request.to_string())
                .replace("{count}", &failure.candidates.len().to_string())
                .replace("{kind}", failure.kind().name()),
        ))
    }

    fn name(&self) -> &str {
        "template"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IntoFailureDescriber impls (feature = "registry")
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "registry")]
mod into_failure_describer {
    use std::sync::Arc;

    use serde::Deserialize;

    use super::{FailureDescriber, GenericFailureDescriber, TemplateDescriber};
    use crate::config::UnitConfig;
    use crate::registry::IntoFailureDescriber;
    use crate::SchemaError;

    impl IntoFailureDescriber for GenericFailureDescriber {
        type Config = UnitConfig;

        fn from_config(_: Self::Config) -> Result<Arc<dyn FailureDescriber>, SchemaError> {
            Ok(Arc::new(GenericFailureDescriber))
        }
    }

    /// Configuration for a [`TemplateDescriber`].
    ///
    /// ```json
    /// { "template": "no {kind} variant for {request}" }
    /// ```
    #[derive(Debug, Clone, Deserialize)]
    pub struct TemplateDescriberConfig {
        /// Text with `{request}`, `{count}` and `{kind}` placeholders.
        pub template: String,
    }

    impl IntoFailureDescriber for TemplateDescriber {
        type Config = TemplateDescriberConfig;

        fn from_config(config: Self::Config) -> Result<Arc<dyn FailureDescriber>, SchemaError> {
            if config.template.trim().is_empty() {
                return Err(SchemaError::InvalidConfig {
                    message: "TemplateDescriber: template must not be empty".into(),
                });
            }
            Ok(Arc::new(TemplateDescriber::new(config.template)))
        }
    }
}

/// One line per attribute: requested attributes first, then extras.
fn compare(out: &mut String, request: &AttributeContainer, candidate: &AttributeContainer) {
    if request.is_empty() && candidate.is_empty() {
        out.push_str("\n      (no attributes)");
        return;
    }
    for (attribute, requested) in request.iter() {
        match candidate.get_by_name(attribute.name()) {
            Some((_, found)) => {
                let _ = write!(
                    out,
                    "\n      - {attribute}: requested '{requested}', found '{found}'"
                );
            }
            None => {
                let _ = write!(
                    out,
                    "\n      - {attribute}: requested '{requested}', not provided"
                );
            }
        }
    }
    for (attribute, found) in candidate.iter() {
        if request.get_by_name(attribute.name()).is_none() {
            let _ = write!(out, "\n      - {attribute}: found '{found}' (not requested)");
        }
    }
}
