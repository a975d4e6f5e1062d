//! Audit CLI
//!
//! One subcommand per validation family, plus `all`. Exit code 0 when every
//! requested family succeeds, 1 otherwise.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use protocol_audit::contract::{ContractSchemaRegistry, ContractValidator};
use protocol_audit::rules::{
    ArchitectureChecker, NamingChecker, PatternChecker, RuleChecker, Severity, UnionUsageChecker,
    ValidationResult,
};
use protocol_audit::scan::{Deadline, ScanEngine, ScanReport};
use protocol_audit::{AuditConfig, AuditError};

#[derive(Parser)]
#[command(name = "audit")]
#[command(about = "Static compliance checks for protocol-centric codebases")]
struct Cli {
    /// Path to a config file (audit.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Wall-clock budget for the whole invocation, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FamilyArgs {
    /// Directories to scan (defaults to ./src)
    paths: Vec<PathBuf>,

    /// Fail on findings at or above the severity threshold
    #[arg(long)]
    strict: bool,

    /// Severity threshold (info | warning | error | critical)
    #[arg(long, default_value = "warning")]
    threshold: Severity,

    /// Fail when a family reports more findings than this
    #[arg(long)]
    max_violations: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// One-protocol-per-file structure checks
    Architecture {
        #[command(flatten)]
        family: FamilyArgs,
    },

    /// Union-annotation width and budget checks
    UnionUsage {
        #[command(flatten)]
        family: FamilyArgs,

        /// Maximum union annotations allowed across the tree
        #[arg(long)]
        max_unions: Option<usize>,
    },

    /// Naming and anti-pattern checks
    Patterns {
        #[command(flatten)]
        family: FamilyArgs,
    },

    /// Validate contract documents (JSON)
    Contracts {
        /// Contract files or directories
        paths: Vec<PathBuf>,

        /// Expected kind when documents do not declare one
        #[arg(long)]
        kind: Option<String>,
    },

    /// Run every validation family
    All {
        #[command(flatten)]
        family: FamilyArgs,

        #[arg(long)]
        max_unions: Option<usize>,
    },

    /// Write a default config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "audit.toml")]
        output: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = AuditConfig::load_from(cli.config.as_deref())?;
    let timeout = cli.timeout_secs.unwrap_or(config.scan.timeout_secs);
    let deadline = Deadline::after_secs(timeout);
    let engine = ScanEngine::new(config);

    match cli.command {
        Commands::Architecture { family } => {
            let report = scan(&engine, &family, &deadline)?;
            let mut result = engine.validate_family(
                &report,
                &ArchitectureChecker::new(),
                family.threshold,
                family.strict,
            );
            apply_violation_budget(&family, &mut result);
            print_result("architecture", &result);
            Ok(result.success)
        }

        Commands::UnionUsage { family, max_unions } => {
            let report = scan(&engine, &family, &deadline)?;
            let mut result = engine.validate_family(
                &report,
                &UnionUsageChecker::new(&engine.config().unions),
                family.threshold,
                family.strict,
            );
            apply_union_budget(&engine, &report, max_unions, &mut result);
            apply_violation_budget(&family, &mut result);
            print_result("union-usage", &result);
            Ok(result.success)
        }

        Commands::Patterns { family } => {
            let report = scan(&engine, &family, &deadline)?;
            let mut naming = engine.validate_family(
                &report,
                &NamingChecker::new(&engine.config().naming),
                family.threshold,
                family.strict,
            );
            let mut patterns = engine.validate_family(
                &report,
                &PatternChecker::new(&engine.config().patterns),
                family.threshold,
                family.strict,
            );
            apply_violation_budget(&family, &mut naming);
            apply_violation_budget(&family, &mut patterns);
            print_result("naming", &naming);
            print_result("patterns", &patterns);
            Ok(naming.success && patterns.success)
        }

        Commands::Contracts { paths, kind } => run_contracts(&engine, paths, kind.as_deref()),

        Commands::Init { output } => {
            AuditConfig::default().save(&output)?;
            println!("✅ Created config file: {}", output);
            Ok(true)
        }

        Commands::All { family, max_unions } => {
            let report = scan(&engine, &family, &deadline)?;
            let config = engine.config().clone();
            let checkers: Vec<Box<dyn RuleChecker>> = vec![
                Box::new(NamingChecker::new(&config.naming)),
                Box::new(PatternChecker::new(&config.patterns)),
                Box::new(ArchitectureChecker::new()),
                Box::new(UnionUsageChecker::new(&config.unions)),
            ];

            let mut ok = true;
            for checker in &checkers {
                let mut result = engine.validate_family(
                    &report,
                    checker.as_ref(),
                    family.threshold,
                    family.strict,
                );
                if checker.name() == "union-usage" {
                    apply_union_budget(&engine, &report, max_unions, &mut result);
                }
                apply_violation_budget(&family, &mut result);
                print_result(checker.name(), &result);
                ok &= result.success;
            }
            Ok(ok)
        }
    }
}

fn scan(engine: &ScanEngine, family: &FamilyArgs, deadline: &Deadline) -> anyhow::Result<ScanReport> {
    let roots = if family.paths.is_empty() {
        vec![PathBuf::from("src")]
    } else {
        family.paths.clone()
    };
    match engine.scan(&roots, deadline) {
        Ok(report) => Ok(report),
        Err(e @ AuditError::Timeout { .. }) => {
            println!("⏱  {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn apply_violation_budget(family: &FamilyArgs, result: &mut ValidationResult) {
    if let Some(max) = family.max_violations {
        if result.findings.len() > max {
            result.success = false;
        }
    }
}

fn apply_union_budget(
    engine: &ScanEngine,
    report: &ScanReport,
    max_unions: Option<usize>,
    result: &mut ValidationResult,
) {
    if let Some(finding) = engine.union_budget_finding(report, max_unions) {
        result.success = false;
        result.findings.push(finding);
    }
}

fn print_result(family: &str, result: &ValidationResult) {
    let marker = if result.success { "✅" } else { "❌" };
    println!(
        "{} {} — {} files checked, {} with violations, {} findings",
        marker,
        family,
        result.files_checked,
        result.files_with_violations,
        result.findings.len()
    );
    for finding in &result.findings {
        println!(
            "   [{}] {} {}:{} — {}",
            finding.severity,
            finding.rule_id,
            finding.file.display(),
            finding.line,
            finding.message
        );
    }
}

fn run_contracts(
    engine: &ScanEngine,
    paths: Vec<PathBuf>,
    kind: Option<&str>,
) -> anyhow::Result<bool> {
    let registry = ContractSchemaRegistry::builtin();
    let validator = ContractValidator::new(&registry, &engine.config().contracts);

    let roots = if paths.is_empty() {
        vec![PathBuf::from("contracts")]
    } else {
        paths
    };

    let mut documents = Vec::new();
    for root in &roots {
        if root.is_file() {
            documents.push(root.clone());
        } else if root.is_dir() {
            for entry in walkdir::WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
            {
                documents.push(entry.into_path());
            }
        } else {
            anyhow::bail!("no such contract path: {}", root.display());
        }
    }
    documents.sort();

    let mut all_valid = true;
    for doc in &documents {
        let score = validator.validate_file(doc, kind)?;
        let marker = if score.is_valid { "✅" } else { "❌" };
        println!(
            "{} {} [{} v{}] — score {:.2}",
            marker,
            doc.display(),
            score.kind,
            score.schema_version,
            score.score
        );
        for v in &score.violations {
            println!("   violation: {}", v);
        }
        for w in &score.warnings {
            println!("   warning: {}", w);
        }
        all_valid &= score.is_valid;
    }

    println!();
    if all_valid {
        println!("✅ {} contract(s) valid", documents.len());
    } else {
        println!("❌ contract violations detected");
    }
    Ok(all_valid)
}
