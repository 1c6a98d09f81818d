use clap::{Parser, Subcommand};
use colored::*;
use rule_analyzer::{Analyzer, ChangeType, CompareResult, Platform, ResultType, RuleSource, Value};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rule-analyzer", version, about = "Classifies compare-result diffs against a catalog of security-analysis rules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file of compare results against a rule file
    Analyze {
        /// Path to a JSON array of compare results
        #[arg(short, long)]
        input: PathBuf,
        /// Path to a rule file; falls back to the embedded default ruleset
        #[arg(short, long)]
        rules: Option<PathBuf>,
        /// Host platform the compare results were collected on
        #[arg(short, long, value_enum, default_value_t = PlatformArg::Linux)]
        platform: PlatformArg,
    },
    /// Validate a rule file without analyzing anything
    Validate {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PlatformArg {
    Windows,
    Linux,
    Macos,
}

impl From<PlatformArg> for Platform {
    fn from(p: PlatformArg) -> Self {
        match p {
            PlatformArg::Windows => Platform::Windows,
            PlatformArg::Linux => Platform::Linux,
            PlatformArg::Macos => Platform::MacOs,
        }
    }
}

/// The on-disk shape of one compare result fed to the CLI. Snapshot
/// collection and diffing are out of scope (spec.md §1) — this is just the
/// serialization DTO for results produced by an external collector.
#[derive(Deserialize)]
struct CompareResultInput {
    result_type: String,
    change_type: ChangeType,
    #[serde(default)]
    base: Option<Value>,
    #[serde(default)]
    compare: Option<Value>,
}

impl From<CompareResultInput> for CompareResult {
    fn from(input: CompareResultInput) -> Self {
        CompareResult::new(
            ResultType(input.result_type),
            input.change_type,
            input.base,
            input.compare,
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze { input, rules, platform } => run_analyze(input, rules, platform.into()),
        Commands::Validate { rules } => run_validate(rules),
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_analyzer(platform: Platform, rules: Option<PathBuf>) -> Analyzer {
    match &rules {
        Some(path) => Analyzer::new(platform, RuleSource::Path(path)),
        None => Analyzer::new(platform, RuleSource::Embedded(rule_analyzer::EMBEDDED_DEFAULT_RULES)),
    }
}

fn run_analyze(input: PathBuf, rules: Option<PathBuf>, platform: Platform) -> ExitCode {
    let analyzer = load_analyzer(platform, rules);

    let content = match std::fs::read_to_string(&input) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("{} could not read {}: {}", "error:".red().bold(), input.display(), err);
            return ExitCode::FAILURE;
        }
    };
    let inputs: Vec<CompareResultInput> = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("{} could not parse {}: {}", "error:".red().bold(), input.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut any_matched = false;
    for compare_result_input in inputs {
        let mut result: CompareResult = compare_result_input.into();
        let matched = analyzer.analyze(&mut result).expect("analyze is infallible for non-null arguments");
        if !matched.is_empty() {
            any_matched = true;
            // The engine itself never combines matched rules' verdicts into
            // one (spec.md §3) — report each matched rule alongside its own
            // verdict instead of a single summary level.
            let rendered = matched
                .iter()
                .map(|m| format!("{}({:?})", m.rule_name, m.verdict))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{} {:?}/{:?} -> {}",
                result.result_type.0.bold(),
                result.change_type,
                result.analysis,
                rendered
            );
        }
    }

    if any_matched {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_validate(rules: Option<PathBuf>) -> ExitCode {
    let analyzer = load_analyzer(Platform::Linux, rules);
    let violations = analyzer.verify_rules();
    if violations.is_empty() {
        println!("{}", "all rules passed validation".green());
        ExitCode::SUCCESS
    } else {
        for violation in &violations {
            println!("{} {}", "violation:".red().bold(), violation);
        }
        println!("{} violation(s)", violations.len());
        ExitCode::FAILURE
    }
}
