//! verdict — generate / parse / verify pipeline CLI
//!
//! Drives the verdict engines against the deterministic mock providers.
//! Rule, method, pipeline, and benchmark definitions load from JSON files,
//! or TOML when the file extension is `.toml`. Results print as pretty
//! JSON to stdout or to `--output`.
//!
//! Usage:
//!   cargo run -p cli -- generate --system-prompt "..." --user-prompt "..."
//!   cargo run -p cli -- parse --text "a1 b22" --rules rules.json
//!   cargo run -p cli -- verify --text "..." --methods methods.json \
//!       --required-confirmed 2 --required-review 1
//!   cargo run -p cli -- pipeline --config pipeline.json --input "..."
//!   cargo run -p cli -- benchmark --config benchmark.toml

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use verdict_bench::BenchmarkRunner;
use verdict_contracts::{
    bench::{BenchmarkConfig, BenchmarkEntry},
    error::{VerdictError, VerdictResult},
    generation::{GenerationBatch, GenerationRequest},
    parse::ParseRule,
    pipeline::PipelineConfig,
    verify::VerificationMethod,
};
use verdict_core::traits::{Generator as _, Parser as _, Verifier as _};
use verdict_core::PipelineOrchestrator;
use verdict_mock::{ScriptedGenerator, TokenOverlapScorer};
use verdict_parse::{validate_rules, RuleParser};
use verdict_verify::MethodVerifier;

// ── CLI definition ────────────────────────────────────────────────────────────

/// verdict — rule-based parsing and multi-method verification of generated
/// text, backed by deterministic mock providers.
#[derive(Parser)]
#[command(name = "verdict", about = "Generate, parse, and verify text")]
struct Cli {
    /// Write the JSON result to this file instead of stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Seed the mock generator with these responses, cycled in order.
    #[arg(long = "script", global = true)]
    script: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce text from the mock generation provider.
    Generate {
        #[arg(long)]
        system_prompt: String,
        #[arg(long)]
        user_prompt: String,
        #[arg(long, default_value_t = 1)]
        num_sequences: u32,
        #[arg(long, default_value_t = 100)]
        max_tokens: u32,
        #[arg(long, default_value_t = 1.0)]
        temperature: f64,
    },
    /// Apply a rule file to a text and print the extraction result.
    Parse {
        #[arg(long)]
        text: String,
        /// Rule definitions, JSON or TOML: { "rules": [...] }.
        #[arg(long)]
        rules: PathBuf,
    },
    /// Run verification methods against a text.
    Verify {
        #[arg(long)]
        text: String,
        /// Method definitions, JSON or TOML: { "methods": [...] }.
        #[arg(long)]
        methods: PathBuf,
        #[arg(long, default_value_t = 1)]
        required_confirmed: u32,
        #[arg(long, default_value_t = 0)]
        required_review: u32,
    },
    /// Execute a full generate/parse/verify pipeline.
    Pipeline {
        /// Pipeline stage configuration, JSON or TOML.
        #[arg(long)]
        config: PathBuf,
        /// Initial input handed to the first stage.
        #[arg(long)]
        input: String,
    },
    /// Verify a labelled entry set and report accuracy metrics.
    Benchmark {
        /// Benchmark definition (methods, thresholds, entries), JSON or TOML.
        #[arg(long)]
        config: PathBuf,
    },
}

/// Shape of a `--rules` file.
#[derive(Deserialize)]
struct RulesFile {
    rules: Vec<ParseRule>,
}

/// Shape of a `--methods` file.
#[derive(Deserialize)]
struct MethodsFile {
    methods: Vec<VerificationMethod>,
}

/// Shape of a `benchmark --config` file.
#[derive(Deserialize)]
struct BenchmarkFile {
    #[serde(flatten)]
    config: BenchmarkConfig,
    entries: Vec<BenchmarkEntry>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    // Set RUST_LOG for finer-grained control than --debug.
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(cli) {
        eprintln!("verdict error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> VerdictResult<()> {
    let generator = || Box::new(ScriptedGenerator::new(cli.script.clone()));

    let rendered = match &cli.command {
        Command::Generate {
            system_prompt,
            user_prompt,
            num_sequences,
            max_tokens,
            temperature,
        } => {
            let request = GenerationRequest {
                system_prompt: system_prompt.clone(),
                user_prompt: user_prompt.clone(),
                num_sequences: *num_sequences,
                max_tokens: *max_tokens,
                temperature: *temperature,
                stop_sequences: None,
            };
            request.validate()?;
            run_generate(generator(), &request)?
        }
        Command::Parse { text, rules } => {
            let file: RulesFile = load_config(rules)?;
            validate_rules(&file.rules)?;
            let parser = RuleParser::new();
            to_json(&parser.parse(text, &file.rules))?
        }
        Command::Verify {
            text,
            methods,
            required_confirmed,
            required_review,
        } => {
            let file: MethodsFile = load_config(methods)?;
            let verifier = build_verifier(generator());
            let summary =
                verifier.verify(text, &file.methods, *required_confirmed, *required_review)?;
            to_json(&summary)?
        }
        Command::Pipeline { config, input } => {
            let pipeline: PipelineConfig = load_config(config)?;
            let orchestrator = PipelineOrchestrator::new(
                generator(),
                Box::new(RuleParser::new()),
                Box::new(build_verifier(generator())),
            );
            let result =
                orchestrator.execute(&pipeline, serde_json::Value::String(input.clone()));
            to_json(&result)?
        }
        Command::Benchmark { config } => {
            let file: BenchmarkFile = load_config(config)?;
            let verifier = build_verifier(generator());
            let runner = BenchmarkRunner::new();
            let report = runner.run(&verifier, &file.config, &file.entries)?;
            to_json(&report)?
        }
    };

    emit(cli.output.as_deref(), &rendered)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn run_generate(
    generator: Box<ScriptedGenerator>,
    request: &GenerationRequest,
) -> VerdictResult<String> {
    use std::time::Instant;

    let started = Instant::now();
    let texts = generator.generate(request)?;
    let batch = GenerationBatch {
        total_tokens: texts.iter().map(|t| t.tokens_used).sum(),
        model_name: texts
            .first()
            .map(|t| t.model_name.clone())
            .unwrap_or_default(),
        generation_time: started.elapsed().as_secs_f64(),
        texts,
    };
    to_json(&batch)
}

/// The standard verifier wiring: mock providers plus the built-in
/// predicates usable from method files.
fn build_verifier(generator: Box<ScriptedGenerator>) -> MethodVerifier {
    let mut verifier = MethodVerifier::new(generator, Box::new(TokenOverlapScorer::new()));
    verifier.register_predicate(
        "non_empty",
        Box::new(|text: &str| (!text.trim().is_empty(), None)),
    );
    verifier.register_predicate("ascii_only", Box::new(|text: &str| (text.is_ascii(), None)));
    verifier.register_predicate(
        "single_line",
        Box::new(|text: &str| (!text.contains('\n'), None)),
    );
    verifier
}

/// Load a config file, parsing TOML when the extension says so and JSON
/// otherwise.
fn load_config<T: DeserializeOwned>(path: &Path) -> VerdictResult<T> {
    let raw = fs::read_to_string(path)
        .map_err(|e| VerdictError::config(format!("cannot read {}: {e}", path.display())))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&raw)
            .map_err(|e| VerdictError::config(format!("invalid TOML in {}: {e}", path.display())))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| VerdictError::config(format!("invalid JSON in {}: {e}", path.display())))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> VerdictResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| VerdictError::execution(format!("cannot serialize result: {e}")))
}

fn emit(output: Option<&Path>, rendered: &str) -> VerdictResult<()> {
    match output {
        Some(path) => fs::write(path, format!("{rendered}\n"))
            .map_err(|e| VerdictError::execution(format!("cannot write {}: {e}", path.display()))),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
