//! sobject-migrate CLI - compile migration jobs into resolved query plans.

use clap::{Parser, Subcommand};
use sobject_migrate::{
    Describers, FileDescriber, JobConfig, JobPlan, MigrateError, MigrationJob, StaticDescriber,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "sobject-migrate")]
#[command(about = "Compile record migration jobs into resolved query plans")]
#[command(version)]
struct Cli {
    /// Path to job configuration file (YAML, or JSON with a .json extension)
    #[arg(short, long, default_value = "job.yaml")]
    config: PathBuf,

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
    /// Resolve every query without fetching metadata
    Check,

    /// Resolve queries and expand them against object metadata
    Plan {
        /// Directory of source describe documents (<Object>.json)
        #[arg(long)]
        source_metadata: PathBuf,

        /// Directory of target describe documents; defaults to the source directory
        #[arg(long)]
        target_metadata: Option<PathBuf>,

        /// Also write the plan as JSON to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::InvalidConfig)?;

    let config = JobConfig::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let plan = match cli.command {
        Commands::Check => {
            // setup never touches the describers
            let none = Arc::new(StaticDescriber::new("none"));
            let mut job = MigrationJob::new(config, Describers::new(none.clone(), none))?;
            job.setup_all();
            JobPlan::from_job(&job)
        }
        Commands::Plan {
            source_metadata,
            target_metadata,
            save,
        } => {
            let target_metadata = target_metadata.unwrap_or_else(|| source_metadata.clone());
            let describers = Describers::new(
                Arc::new(FileDescriber::new(&source_metadata)),
                Arc::new(FileDescriber::new(&target_metadata)),
            );
            let mut job = MigrationJob::new(config, describers)?;
            job.prepare().await;

            let plan = JobPlan::from_job(&job);
            if let Some(path) = save {
                plan.save(&path)?;
                info!("Plan written to {:?}", path);
            }
            plan
        }
    };

    if cli.output_json {
        println!("{}", plan.to_json()?);
    } else {
        print_plan(&plan);
    }

    Ok(match plan.failures.first() {
        Some(failure) => ExitCode::from(failure.exit_code),
        None => ExitCode::SUCCESS,
    })
}

fn print_plan(plan: &JobPlan) {
    println!("Plan {}", plan.plan_id);
    for task in &plan.tasks {
        println!(
            "\n  {} ({}, external id {})",
            task.object, task.operation, task.external_id
        );
        println!("    query:  {}", task.query);
        if let Some(ref delete) = task.delete_query {
            println!("    delete: {}", delete);
        }
        if !task.relationships.parent_lookup_objects.is_empty() {
            println!(
                "    lookups: {}",
                task.relationships.parent_lookup_objects.join(", ")
            );
        }
        if !task.relationships.parent_master_detail_objects.is_empty() {
            println!(
                "    master-detail: {}",
                task.relationships.parent_master_detail_objects.join(", ")
            );
        }
        for warning in &task.warnings {
            println!("    warning: {}", warning);
        }
    }

    println!(
        "\n  Tasks: {} planned, {} failed, {} warning(s)",
        plan.tasks.len(),
        plan.failures.len(),
        plan.warning_count()
    );
    for failure in &plan.failures {
        println!("  Failed {}: {}", failure.object, failure.error);
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
