use anyhow::Context;
use clap::{Parser, Subcommand};
use polite::{
    Polite, RobotsRecord,
    batch::{AbstractStore, MemoryStore},
    records::cached_robots,
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "polite", version, about = "Politeness scheduling for web probes")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, default_value = "polite.yml")]
    config: PathBuf,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the worker batches for a task list.
    Plan {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print per-task report skeletons in dispatch order.
    Report {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Check which hosts have a cached robots.txt in a JSON-lines dump.
    Lookup {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        records: PathBuf,
    },
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let app = Polite::from_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Plan { input } => {
            let tasks = app.load_tasks(&input)?;
            print_json(&app.plan(tasks))?;
        }
        Command::Report { input } => {
            let tasks = app.load_tasks(&input)?;
            let plan = app.plan(tasks);
            print_json(&app.task_reports(&plan))?;
        }
        Command::Lookup { input, records } => {
            let tasks = app.load_tasks(&input)?;
            let records: Vec<RobotsRecord> = app.load_records(&records)?;
            let store: AbstractStore<RobotsRecord> = Arc::new(MemoryStore::with_records(
                app.settings().batch.key_field.clone(),
                records,
            ));

            let runtime = app.spawn_lookups(store);
            let hosts = cached_robots(&runtime.reader, &tasks).await?;
            let stats_rx = runtime.stats.clone();
            runtime.shutdown().await;
            let stats = stats_rx.borrow().clone();

            info!(
                hosts = hosts.len(),
                fetches = stats.fetches,
                requests = stats.requests,
                "lookup finished"
            );
            print_json(&hosts)?;
        }
    }

    Ok(())
}
