//! Migration CLI
//!
//! Plans and executes protocol migration between two codebases. Execution
//! is gated on zero name conflicts; a failed real run is rolled back
//! best-effort before reporting.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use protocol_audit::duplication::DuplicationAnalyzer;
use protocol_audit::migration::{MigrationExecutor, MigrationPlan, MigrationPlanner};
use protocol_audit::scan::{Deadline, ScanEngine};
use protocol_audit::AuditConfig;

#[derive(Parser)]
#[command(name = "protocol-migrate")]
#[command(about = "Plan and execute protocol migration into a shared repository")]
struct Cli {
    /// Source codebase root
    #[arg(short, long)]
    source: PathBuf,

    /// Target codebase root (receives the shared repository)
    #[arg(short, long)]
    target: PathBuf,

    /// Path to a config file (audit.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print the migration plan
    Plan {
        /// Restrict to the named protocols
        #[arg(long = "protocol")]
        protocols: Vec<String>,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute the migration plan
    Run {
        /// Restrict to the named protocols
        #[arg(long = "protocol")]
        protocols: Vec<String>,

        /// Compute the file and import lists without touching anything
        #[arg(long)]
        dry_run: bool,
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

fn build_plan(
    engine: &ScanEngine,
    source: &PathBuf,
    target: &PathBuf,
    protocols: &[String],
) -> anyhow::Result<MigrationPlan> {
    let deadline = Deadline::after_secs(engine.config().scan.timeout_secs);
    let source_report = engine.scan(std::slice::from_ref(source), &deadline)?;
    let target_report = engine.scan(std::slice::from_ref(target), &deadline)?;

    let source_sigs = engine.extract_signatures(&source_report);
    let target_sigs = engine.extract_signatures(&target_report);
    println!(
        "🔍 {} source protocol(s), {} target protocol(s)",
        source_sigs.len(),
        target_sigs.len()
    );

    let report = DuplicationAnalyzer::new().analyze(&source_sigs, &target_sigs);
    let planner = MigrationPlanner::new(&engine.config().migration);
    let subset = (!protocols.is_empty()).then_some(protocols);
    Ok(planner.plan(&report, target, subset))
}

fn print_plan(plan: &MigrationPlan) {
    println!(
        "📋 {} candidate(s), {} conflict(s), estimated {} minutes",
        plan.candidates.len(),
        plan.conflicts.len(),
        plan.estimated_minutes
    );
    for step in &plan.steps {
        println!("   [{:?}] {} ({}m)", step.phase, step.description, step.estimated_minutes);
    }
    for rec in &plan.recommendations {
        println!("   💡 {}", rec);
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = AuditConfig::load_from(cli.config.as_deref())?;
    let engine = ScanEngine::new(config);

    match cli.command {
        Commands::Plan { protocols, json } => {
            let plan = build_plan(&engine, &cli.source, &cli.target, &protocols)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
            Ok(plan.can_proceed())
        }

        Commands::Run { protocols, dry_run } => {
            let plan = build_plan(&engine, &cli.source, &cli.target, &protocols)?;
            print_plan(&plan);

            if !plan.can_proceed() {
                println!("❌ migration blocked: resolve conflicts first");
                return Ok(false);
            }

            let mut executor = MigrationExecutor::new(&engine.config().migration);
            executor.check_destinations(&plan, &cli.target)?;

            match executor.execute(&plan, dry_run) {
                Ok(result) => {
                    let marker = if result.success { "✅" } else { "❌" };
                    println!(
                        "{} migrated {} protocol(s): {} file(s) created, {} deleted, {} import(s) updated{}",
                        marker,
                        result.migrated_count,
                        result.files_created.len(),
                        result.files_deleted.len(),
                        result.imports_updated,
                        if dry_run { " (dry run)" } else { "" }
                    );
                    Ok(result.success)
                }
                Err(e) => {
                    eprintln!("❌ migration failed: {}", e);
                    if !dry_run {
                        match executor.rollback() {
                            Ok(n) => eprintln!("↩️  rolled back {} created file(s)", n),
                            Err(re) => eprintln!("rollback unavailable: {}", re),
                        }
                    }
                    Ok(false)
                }
            }
        }
    }
}
