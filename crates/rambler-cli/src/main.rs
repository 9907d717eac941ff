//! rambler CLI - ordered SQL schema migrations.

use clap::{Parser, Subcommand};
use rambler::{
    Config, DriverCatalog, Engine, Limit, MigrateError, MigrationState, Outcome, RunReport,
    StatusReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "rambler")]
#[command(about = "Apply and reverse ordered SQL schema migrations")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "rambler.yaml")]
    config: PathBuf,

    /// Environment to use from the configuration file
    #[arg(short, long, default_value = "default")]
    environment: String,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations in order
    Apply {
        /// Apply at most this many migrations
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Reverse the most recently applied migrations
    Reverse {
        /// Number of migrations to reverse [default: 1]
        #[arg(long, conflicts_with = "all")]
        count: Option<usize>,

        /// Reverse every applied migration
        #[arg(long)]
        all: bool,
    },

    /// Show pending, applied and orphaned migrations
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let env = config.environment(&cli.environment)?;
    info!("Using environment '{}' ({})", env.name, env.driver);

    // Fails on unknown drivers and bad trust material before any network I/O.
    let conn = DriverCatalog::with_builtins().connect_env(&env)?;
    let migrations = rambler::source::load_dir(&env.directory)?;
    let engine = Engine::new(conn, migrations)?;

    match cli.command {
        Commands::Apply { limit } => {
            let report = engine.apply(Limit::from(limit)).await?;
            finish(report, cli.output_json)
        }

        Commands::Reverse { count, all } => {
            let count = if all {
                Limit::All
            } else {
                Limit::Count(count.unwrap_or(1))
            };
            let report = engine.reverse(count).await?;
            finish(report, cli.output_json)
        }

        Commands::Status => {
            let status = engine.status().await?;
            if cli.output_json {
                println!("{}", status.to_json()?);
            } else {
                print_status(&status);
            }
            Ok(())
        }
    }
}

/// Print a run report and turn its failure, if any, into the process error.
fn finish(mut report: RunReport, output_json: bool) -> Result<(), MigrateError> {
    if output_json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render_report(&report));
    }

    match report.failure.take() {
        Some(failure) => Err(failure.error),
        None => Ok(()),
    }
}

fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let label = match outcome.outcome {
            Outcome::Skipped => continue,
            Outcome::Applied => "applied",
            Outcome::Reversed => "reversed",
            Outcome::Failed => "FAILED",
        };
        out.push_str(&format!("  {:<8} {}\n", label, outcome.migration));
    }
    out.push_str(&format!(
        "\n{} applied, {} reversed in {:.2}s\n",
        report.applied().len(),
        report.reversed().len(),
        report.duration_seconds
    ));
    if report.truncated {
        out.push_str("  Fewer migrations were applied than the reversal requested\n");
    }
    if !report.orphaned.is_empty() {
        out.push_str(&format!("  Orphaned ledger entries: {:?}\n", report.orphaned));
    }
    out
}

fn print_status(status: &StatusReport) {
    if !status.ledger_exists {
        println!("Ledger table does not exist yet");
    }
    for entry in &status.entries {
        let marker = match entry.state {
            MigrationState::Applied => "[x]",
            MigrationState::Pending => "[ ]",
            MigrationState::Orphaned => "[?]",
        };
        println!("  {} {}", marker, entry.migration);
    }
    println!(
        "\n{} applied, {} pending, {} orphaned",
        status.applied().len(),
        status.pending().len(),
        status.orphaned().len()
    );
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so that --output-json stays parseable.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rambler::{MigrationOutcome, Operation};

    fn reverse_report(truncated: bool) -> RunReport {
        RunReport {
            operation: Operation::Reverse,
            outcomes: vec![MigrationOutcome {
                migration: "001_init.sql".to_string(),
                outcome: Outcome::Reversed,
            }],
            failure: None,
            orphaned: Vec::new(),
            truncated,
            duration_seconds: 0.5,
        }
    }

    #[test]
    fn test_render_truncated_reversal() {
        let text = render_report(&reverse_report(true));
        assert!(text.contains("reversed 001_init.sql"));
        assert!(text.contains("0 applied, 1 reversed in 0.50s"));
        assert!(text.contains("Fewer migrations were applied than the reversal requested"));
    }

    #[test]
    fn test_render_full_reversal_has_no_truncation_note() {
        let text = render_report(&reverse_report(false));
        assert!(!text.contains("Fewer migrations"));
    }
}
