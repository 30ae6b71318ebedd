//! Selection benchmarks: the hot path.
//!
//! Measures: compatibility filtering over growing candidate sets, disambiguation
//! across several attributes, closure rules vs built-ins, and trace overhead.

use vmatch::prelude::*;
use vmatch::{PreferHighest, PreferOrder};

fn main() {
    divan::main();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════════════════════════════════════════

const USAGES: [&str; 4] = ["api", "runtime", "docs", "sources"];

struct Fixture {
    schema: AttributesSchema,
    usage: Attribute,
    debuggable: Attribute,
    level: Attribute,
}

fn fixture() -> Fixture {
    let mut schema = AttributesSchema::new();
    let usage = schema.add_attribute("usage", ValueType::String).unwrap();
    let debuggable = schema.add_attribute("debuggable", ValueType::Bool).unwrap();
    let level = schema.add_attribute("level", ValueType::Int).unwrap();
    schema.add_compatibility_rule(&usage, ExactMatch).unwrap();
    schema
        .add_disambiguation_rule(&debuggable, PreferValue::new(false))
        .unwrap();
    schema.add_disambiguation_rule(&level, PreferHighest).unwrap();
    Fixture {
        schema,
        usage,
        debuggable,
        level,
    }
}

/// `n` variants cycling through every usage, debuggable flag and level.
fn candidates(f: &Fixture, n: usize) -> Vec<AttributeContainer> {
    (0..n)
        .map(|i| {
            AttributeContainer::new()
                .with(&f.usage, USAGES[i % USAGES.len()])
                .and_then(|c| c.with(&f.debuggable, i % 2 == 0))
                .and_then(|c| c.with(&f.level, (i % 7) as i64))
                .unwrap()
        })
        .collect()
}

fn api_request(f: &Fixture) -> AttributeContainer {
    AttributeContainer::new().with(&f.usage, "api").unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Compatibility
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench]
fn is_matching_hit(bencher: divan::Bencher) {
    let f = fixture();
    let matcher = f.schema.matcher();
    let candidate = candidates(&f, 1).remove(0);
    let request = api_request(&f);

    bencher.bench_local(|| matcher.is_matching(&candidate, &request));
}

#[divan::bench(args = [1, 10, 50, 100, 500])]
fn select_no_match(bencher: divan::Bencher, n: usize) {
    let f = fixture();
    let matcher = f.schema.matcher();
    let candidates = candidates(&f, n);
    let request = AttributeContainer::new().with(&f.usage, "unknown").unwrap();

    bencher.bench_local(|| matcher.select_matches(&candidates, &request));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Disambiguation
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench(args = [1, 10, 50, 100, 500])]
fn select_disambiguated(bencher: divan::Bencher, n: usize) {
    let f = fixture();
    let matcher = f.schema.matcher();
    let candidates = candidates(&f, n);
    let request = api_request(&f);

    bencher.bench_local(|| matcher.select_matches(&candidates, &request));
}

#[divan::bench(args = [10, 100])]
fn select_empty_request(bencher: divan::Bencher, n: usize) {
    let f = fixture();
    let matcher = f.schema.matcher();
    let candidates = candidates(&f, n);
    let request = AttributeContainer::new();

    bencher.bench_local(|| matcher.select_matches(&candidates, &request));
}

#[divan::bench(args = [1, 4, 16])]
fn long_disambiguation_chain(bencher: divan::Bencher, rules: usize) {
    let mut f = fixture();
    for _ in 0..rules {
        f.schema
            .add_disambiguation_rule(&f.usage, PreferOrder::new([AttributeValue::from("none")]))
            .unwrap();
    }
    let matcher = f.schema.matcher();
    let candidates = candidates(&f, 100);

    bencher.bench_local(|| matcher.select_matches(&candidates, &AttributeContainer::new()));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rule forms and tracing
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench]
fn closure_rule(bencher: divan::Bencher) {
    let mut schema = AttributesSchema::new();
    let usage = schema.add_attribute("usage", ValueType::String).unwrap();
    schema
        .add_compatibility_rule(
            &usage,
            compatibility_fn(|check| {
                Ok(match (check.requested, check.candidate) {
                    (Some(r), Some(c)) if r == c => Compatibility::Compatible,
                    (Some(_), Some(_)) => Compatibility::Incompatible,
                    _ => Compatibility::NoOpinion,
                })
            }),
        )
        .unwrap();
    let matcher = schema.matcher();
    let candidates: Vec<AttributeContainer> = USAGES
        .iter()
        .map(|u| AttributeContainer::new().with(&usage, *u).unwrap())
        .collect();
    let request = AttributeContainer::new().with(&usage, "api").unwrap();

    bencher.bench_local(|| matcher.select_matches(&candidates, &request));
}

#[divan::bench(args = [10, 100])]
fn select_with_trace(bencher: divan::Bencher, n: usize) {
    let f = fixture();
    let matcher = f.schema.matcher();
    let candidates = candidates(&f, n);
    let request = api_request(&f);

    bencher.bench_local(|| matcher.select_with_trace(&candidates, &request));
}

#[divan::bench]
fn snapshot(bencher: divan::Bencher) {
    let f = fixture();

    bencher.bench_local(|| f.schema.matcher());
}
