//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the vmatch engine.
//!
//! ```yaml
//! name: exact usage
//! description: only the api variant satisfies an api request
//! schema:
//!   attributes: [{ name: usage }]
//!   compatibility:
//!     - attribute: usage
//!       rule: { type_url: vmatch.core.v1.ExactMatch }
//! candidates:
//!   - { name: api, attributes: { usage: api } }
//!   - { name: runtime, attributes: { usage: runtime } }
//! cases:
//!   - name: api request
//!     request: { usage: api }
//!     expect: [api]
//! ```

use serde::Deserialize;
use vmatch::prelude::*;
use vmatch::{ContainerConfig, RuleRegistry, RuleRegistryBuilder, SchemaConfig};

use crate::TestVariant;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Schema the consumer schema extends before its own config is applied.
    #[serde(default)]
    pub base_schema: Option<SchemaConfig>,
    /// The consumer schema.
    #[serde(default)]
    pub schema: SchemaConfig,
    /// The producer schema; the consumer schema doubles as producer when absent.
    #[serde(default)]
    pub producer_schema: Option<SchemaConfig>,
    /// Expected schema error kind (`duplicate_attribute`, `unknown_type_url`, ...).
    #[serde(default)]
    pub schema_error: Option<String>,
    #[serde(default)]
    pub candidates: Vec<CandidateConfig>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// One named candidate variant
#[derive(Debug, Deserialize)]
pub struct CandidateConfig {
    pub name: String,
    #[serde(default)]
    pub attributes: ContainerConfig,
}

/// Test case
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub request: ContainerConfig,
    /// Names of the selected candidates, in input order.
    #[serde(default)]
    pub expect: Vec<String>,
    /// Expected resolution error kind (`rule_evaluation`, `uncoercible_value`).
    #[serde(default)]
    pub error: Option<String>,
    /// Expected `select_one` failure classification.
    #[serde(default)]
    pub failure: Option<FailureKind>,
    /// Substring the failure description must contain.
    #[serde(default)]
    pub describe: Option<String>,
    /// Expected name of the describer that explained the failure.
    #[serde(default)]
    pub describer: Option<String>,
}

/// What a case produced (or was expected to produce)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Names of the selected candidates
    Selected(Vec<String>),
    /// Error kind
    Error(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder: Convert config to vmatch types
// ═══════════════════════════════════════════════════════════════════════════════

/// Registry with the core rules and the test-domain rules.
#[must_use]
pub fn registry() -> RuleRegistry {
    crate::register(RuleRegistryBuilder::new()).build()
}

/// Stable `snake_case` name of a schema error.
#[must_use]
pub fn schema_error_kind(error: &SchemaError) -> &'static str {
    match error {
        SchemaError::DuplicateAttribute { .. } => "duplicate_attribute",
        SchemaError::ValueTypeMismatch { .. } => "value_type_mismatch",
        SchemaError::InvalidConfig { .. } => "invalid_config",
        SchemaError::UnknownTypeUrl { .. } => "unknown_type_url",
    }
}

/// Stable `snake_case` name of a resolution error.
#[must_use]
pub fn match_error_kind(error: &MatchError) -> &'static str {
    match error {
        MatchError::RuleEvaluation { .. } => "rule_evaluation",
        MatchError::UncoercibleValue { .. } => "uncoercible_value",
    }
}

impl Fixture {
    /// Build the matcher snapshot described by the schema sections.
    ///
    /// # Errors
    ///
    /// Any [`SchemaError`] raised while loading the schemas.
    pub fn build_matcher(&self, registry: &RuleRegistry) -> Result<AttributeMatcher, SchemaError> {
        let mut consumer = AttributesSchema::new();
        if let Some(base) = &self.base_schema {
            consumer.extend(&registry.load_schema(base.clone())?)?;
        }
        registry.apply(&mut consumer, self.schema.clone())?;
        match &self.producer_schema {
            Some(producer) => Ok(consumer.with_producer(&registry.load_schema(producer.clone())?)),
            None => Ok(consumer.matcher()),
        }
    }

    /// Build the candidate variants, typed through `matcher`.
    ///
    /// # Errors
    ///
    /// Any [`SchemaError`] raised while typing candidate values.
    pub fn build_candidates(&self, matcher: &AttributeMatcher) -> Result<Vec<TestVariant>, SchemaError> {
        self.candidates
            .iter()
            .map(|c| -> Result<TestVariant, SchemaError> {
                Ok(TestVariant::from_attributes(c.name.as_str(), c.attributes.load(matcher)?))
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: Outcome,
    pub actual: Outcome,
    /// Mismatches beyond the outcome itself (classification, description, trace).
    pub notes: Vec<String>,
}

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run all test cases and return results
    ///
    /// When the fixture expects a schema error, the single result is named
    /// `schema`.
    ///
    /// # Errors
    ///
    /// An unexpected [`SchemaError`] while building the schemas, candidates or
    /// requests.
    pub fn run(&self) -> Result<Vec<CaseResult>, SchemaError> {
        let registry = registry();
        let matcher = match (self.build_matcher(&registry), &self.schema_error) {
            (Ok(matcher), None) => matcher,
            (Err(error), None) => return Err(error),
            (built, Some(expected)) => {
                let actual = match built {
                    Ok(_) => Outcome::Selected(Vec::new()),
                    Err(error) => Outcome::Error(schema_error_kind(&error).to_string()),
                };
                let expected = Outcome::Error(expected.clone());
                return Ok(vec![CaseResult {
                    case_name: "schema".to_string(),
                    passed: actual == expected,
                    expected,
                    actual,
                    notes: Vec::new(),
                }]);
            }
        };

        let candidates = self.build_candidates(&matcher)?;
        self.cases
            .iter()
            .map(|case| -> Result<CaseResult, SchemaError> {
                let request = case.request.load(&matcher)?;
                Ok(run_case(&matcher, &candidates, &request, case))
            })
            .collect()
    }

    /// Run all test cases and panic on first failure
    pub fn run_and_assert(&self) {
        let results = self
            .run()
            .unwrap_or_else(|e| panic!("Fixture '{}' failed to build: {e}", self.name));
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?}, got {:?} {:?}",
                self.name, result.case_name, result.expected, result.actual, result.notes
            );
        }
    }
}

fn run_case(
    matcher: &AttributeMatcher,
    candidates: &[TestVariant],
    request: &AttributeContainer,
    case: &TestCase,
) -> CaseResult {
    let expected = match &case.error {
        Some(kind) => Outcome::Error(kind.clone()),
        None => Outcome::Selected(case.expect.clone()),
    };
    let actual = match matcher.select_matches(candidates, request) {
        Ok(selected) => Outcome::Selected(selected.iter().map(|v| v.name().to_string()).collect()),
        Err(error) => Outcome::Error(match_error_kind(&error).to_string()),
    };

    let mut notes = Vec::new();
    if let Outcome::Selected(names) = &actual {
        match matcher.select_with_trace(candidates, request) {
            Ok(trace) => {
                let traced: Vec<&str> = trace.result.iter().map(|&i| candidates[i].name()).collect();
                if traced != *names {
                    notes.push(format!("trace selected {traced:?}"));
                }
            }
            Err(error) => notes.push(format!("trace failed: {error}")),
        }
    }

    if case.failure.is_some() || case.describe.is_some() || case.describer.is_some() {
        match matcher.select_one(candidates, request) {
            Err(SelectionError::Failure(failure)) => {
                if case.failure.is_some_and(|kind| kind != failure.kind()) {
                    notes.push(format!("classified as {}", failure.kind()));
                }
                let report = matcher.describe(&failure);
                if report.text.trim().is_empty() {
                    notes.push("empty description".to_string());
                }
                if let Some(needle) = &case.describe {
                    if !report.text.contains(needle.as_str()) {
                        notes.push(format!("description {:?}", report.text));
                    }
                }
                if let Some(describer) = &case.describer {
                    if report.describer != *describer {
                        notes.push(format!("described by {}", report.describer));
                    }
                }
            }
            Err(SelectionError::Match(error)) => notes.push(format!("select_one failed: {error}")),
            Ok(variant) => notes.push(format!("select_one returned {}", variant.name())),
        }
    }

    CaseResult {
        case_name: case.name.clone(),
        passed: actual == expected && notes.is_empty(),
        expected,
        actual,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r"
name: exact usage
schema:
  attributes: [{ name: usage }]
  compatibility:
    - attribute: usage
      rule: { type_url: vmatch.core.v1.ExactMatch }
candidates:
  - { name: api, attributes: { usage: api } }
  - { name: runtime, attributes: { usage: runtime } }
cases:
  - name: api request
    request: { usage: api }
    expect: [api]
  - name: docs request
    request: { usage: docs }
    failure: no_matching_candidates
    describe: found 'runtime'
";

    #[test]
    fn parses_and_runs() {
        let fixture = Fixture::from_yaml(SCENARIO).unwrap();
        assert_eq!(fixture.candidates.len(), 2);
        let results = fixture.run().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }

    #[test]
    fn mismatch_is_reported() {
        let yaml = SCENARIO.replace("expect: [api]", "expect: [runtime]");
        let results = Fixture::from_yaml(&yaml).unwrap().run().unwrap();
        assert!(!results[0].passed);
        assert_eq!(results[0].actual, Outcome::Selected(vec!["api".into()]));
    }

    #[test]
    fn multi_document() {
        let yaml = format!("{SCENARIO}---\n{SCENARIO}");
        assert_eq!(Fixture::from_yaml_multi(&yaml).unwrap().len(), 2);
    }

    #[test]
    fn expected_schema_error() {
        let fixture = Fixture::from_yaml(
            r"
name: conflicting declarations
schema:
  attributes: [{ name: usage }, { name: usage, type: int }]
schema_error: duplicate_attribute
",
        )
        .unwrap();
        let results = fixture.run().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "{results:?}");
    }
}
