//! CoreTask CLI - admin surface over the storage engine

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use coretask_core::models::Audit;
use coretask_core::storage::{Snapshot, Storage};
use tracing::info;

#[derive(Parser)]
#[command(name = "coretask")]
#[command(author, version, about = "Local-first project and task storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database file
    #[arg(long, global = true, default_value = "coretask.db")]
    db: PathBuf,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show collection counts and breakdowns
    Stats,

    /// Export the store to a JSON snapshot
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON snapshot, replacing the collections it contains
    Import {
        /// Snapshot file to read
        file: PathBuf,
    },

    /// Wipe the store back to the seeded defaults
    Reset {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },

    /// Run a persistence health check
    Health,

    /// Show recent activity entries
    Log {
        /// Number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coretask=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stats => cmd_stats(&cli.db, cli.format),
        Commands::Export { output } => cmd_export(&cli.db, output.as_deref(), cli.quiet),
        Commands::Import { file } => cmd_import(&cli.db, &file, cli.quiet),
        Commands::Reset { yes } => cmd_reset(&cli.db, yes, cli.quiet),
        Commands::Health => cmd_health(&cli.db, cli.quiet),
        Commands::Log { limit } => cmd_log(&cli.db, limit, cli.format),
    }
}

fn open(db: &Path) -> anyhow::Result<Storage> {
    Storage::open(db).with_context(|| format!("opening database at {}", db.display()))
}

fn cli_audit(description: &str) -> Audit {
    // the CLI acts as the seeded admin account
    Audit::new(1, description)
}

fn cmd_stats(db: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let storage = open(db)?;
    let stats = storage.stats()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("Users:    {}", stats.counts.users);
            println!("Projects: {}", stats.counts.projects);
            println!("Tasks:    {}", stats.counts.tasks);
            println!("Logs:     {}", stats.counts.logs);
            println!();
            println!(
                "Tasks by status:   todo {} / in progress {} / review {} / done {}",
                stats.tasks_by_status.todo,
                stats.tasks_by_status.in_progress,
                stats.tasks_by_status.review,
                stats.tasks_by_status.done,
            );
            println!(
                "Tasks by priority: low {} / medium {} / high {} / critical {}",
                stats.tasks_by_priority.low,
                stats.tasks_by_priority.medium,
                stats.tasks_by_priority.high,
                stats.tasks_by_priority.critical,
            );
            println!(
                "Users by role:     admin {} / manager {} / user {}",
                stats.users_by_role.admin, stats.users_by_role.manager, stats.users_by_role.user,
            );
        }
    }
    Ok(())
}

fn cmd_export(db: &Path, output: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let mut storage = open(db)?;
    let snapshot = storage.export(Some(&cli_audit("exported store from the CLI")))?;
    let text = serde_json::to_string_pretty(&snapshot)?;

    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            if !quiet {
                println!("Exported to {}", path.display());
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_import(db: &Path, file: &Path, quiet: bool) -> anyhow::Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let snapshot = Snapshot::from_str(&text)?;

    let mut storage = open(db)?;
    storage.import(&snapshot, Some(&cli_audit("imported snapshot from the CLI")))?;
    info!(file = %file.display(), "snapshot imported");

    if !quiet {
        println!("Imported snapshot (version {})", snapshot.version);
    }
    Ok(())
}

fn cmd_reset(db: &Path, yes: bool, quiet: bool) -> anyhow::Result<()> {
    anyhow::ensure!(yes, "refusing to reset without --yes");

    let mut storage = open(db)?;
    storage.reset(Some(&cli_audit("reset store from the CLI")))?;

    if !quiet {
        println!("Store reset to defaults.");
    }
    Ok(())
}

fn cmd_health(db: &Path, quiet: bool) -> anyhow::Result<()> {
    let mut storage = open(db)?;
    let healthy = storage.health_check()?;
    if healthy {
        if !quiet {
            println!("ok");
        }
        Ok(())
    } else {
        anyhow::bail!("persistence probe failed")
    }
}

fn cmd_log(db: &Path, limit: usize, format: OutputFormat) -> anyhow::Result<()> {
    let storage = open(db)?;
    let entries = storage.recent_activity(limit)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No activity recorded.");
            }
            for entry in entries {
                println!(
                    "{}  user {}  {:?} {:?}  {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.user_id,
                    entry.action,
                    entry.entity,
                    entry.description,
                );
            }
        }
    }
    Ok(())
}
