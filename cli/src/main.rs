//! vmatch CLI: driving adapter for the vmatch selection engine.
//!
//! Subcommands:
//! - `select <scenario> [--trace]`: run every case of a scenario and print the selection
//! - `check <schema>`: validate a schema config loads without errors
//! - `info`: print registered type URLs

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;
use vmatch::{FailureKind, RuleRegistry, SchemaConfig, SelectionError};
use vmatch_test::fixture::Fixture;

#[derive(Parser)]
#[command(name = "vmatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Attribute-based variant selection", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cases of a scenario file and print what each one selects
    Select {
        /// Scenario file (YAML, or JSON by extension)
        scenario: PathBuf,

        /// Print the compatibility and disambiguation steps of every case
        #[arg(long)]
        trace: bool,
    },

    /// Validate a schema config
    Check {
        /// Schema file (YAML, or JSON by extension)
        schema: PathBuf,
    },

    /// Print registered type URLs
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { Level::DEBUG } else { Level::WARN });

    let registry = build_registry();
    let output = match cli.command {
        Commands::Select { scenario, trace } => cmd_select(&registry, &scenario, trace)?,
        Commands::Check { schema } => cmd_check(&registry, &schema)?,
        Commands::Info => cmd_info(&registry),
    };
    print!("{output}");
    Ok(())
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_select(registry: &RuleRegistry, path: &Path, trace: bool) -> Result<String> {
    let fixtures = load_scenarios(path)?;
    let mut out = String::new();
    for fixture in &fixtures {
        run_scenario(registry, fixture, trace, &mut out)
            .with_context(|| format!("scenario \"{}\"", fixture.name))?;
    }
    Ok(out)
}

fn run_scenario(registry: &RuleRegistry, fixture: &Fixture, trace: bool, out: &mut String) -> Result<()> {
    let matcher = fixture
        .build_matcher(registry)
        .context("schema load failed")?;
    let candidates = fixture
        .build_candidates(&matcher)
        .context("invalid candidate attributes")?;
    debug!(
        scenario = %fixture.name,
        candidates = candidates.len(),
        cases = fixture.cases.len(),
        "running scenario"
    );

    writeln!(out, "{}", fixture.name)?;
    for case in &fixture.cases {
        let request = case
            .request
            .load(&matcher)
            .with_context(|| format!("invalid request in case \"{}\"", case.name))?;

        match matcher.select_one(&candidates, &request) {
            Ok(variant) => writeln!(out, "  {}: {}", case.name, variant.name())?,
            Err(SelectionError::Failure(failure)) => {
                let report = matcher.describe(&failure);
                writeln!(out, "  {}: {} ({})", case.name, failure.kind(), report.describer)?;
                for line in report.text.lines() {
                    writeln!(out, "    {line}")?;
                }
            }
            Err(SelectionError::Match(e)) => writeln!(out, "  {}: error: {e}", case.name)?,
        }

        if trace {
            match matcher.select_with_trace(&candidates, &request) {
                Ok(steps) => {
                    for line in steps.to_string().lines() {
                        writeln!(out, "    | {line}")?;
                    }
                }
                Err(e) => writeln!(out, "    | trace failed: {e}")?,
            }
        }
    }
    Ok(())
}

fn cmd_check(registry: &RuleRegistry, path: &Path) -> Result<String> {
    let config: SchemaConfig = load_config(path)?;
    let schema = registry.load_schema(config).context("schema invalid")?;

    let attributes = schema.attributes();
    let compatibility: usize = attributes
        .iter()
        .map(|a| schema.compatibility_rule_count(a))
        .sum();
    let disambiguation: usize = attributes
        .iter()
        .map(|a| schema.disambiguation_rule_count(a))
        .sum();
    let describers: usize = FailureKind::ALL
        .iter()
        .map(|&kind| schema.failure_describers(kind).len())
        .sum();

    Ok(format!(
        "Schema valid: {} attributes, {compatibility} compatibility rules, \
         {disambiguation} disambiguation rules, {describers} describers\n",
        attributes.len()
    ))
}

fn cmd_info(registry: &RuleRegistry) -> String {
    let mut out = String::new();
    let sections = [
        ("compatibility rules", registry.compatibility_type_urls()),
        ("disambiguation rules", registry.disambiguation_type_urls()),
        ("failure describers", registry.describer_type_urls()),
    ];
    for (i, (title, urls)) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("Registered {title}:\n"));
        for url in urls {
            out.push_str(&format!("  {url}\n"));
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry assembly (composition root)
// ═══════════════════════════════════════════════════════════════════════════════

fn build_registry() -> RuleRegistry {
    vmatch_test::register(vmatch::RuleRegistryBuilder::new()).build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Config loading
// ═══════════════════════════════════════════════════════════════════════════════

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read \"{}\"", path.display()))
}

fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read(path)?;
    if is_json(path) {
        serde_json::from_str(&content).context("JSON parse error")
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).context("YAML parse error")
    }
}

/// A JSON scenario holds one fixture; a YAML file may hold several `---` documents.
fn load_scenarios(path: &Path) -> Result<Vec<Fixture>> {
    if is_json(path) {
        return Ok(vec![load_config(path)?]);
    }
    let content = read(path)?;
    Fixture::from_yaml_multi(&content).context("YAML parse error")
}
