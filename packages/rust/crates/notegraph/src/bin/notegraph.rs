#![allow(missing_docs)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use notegraph::{KeyedEdge, NoteGraph, NoteGraphSettings, NoteId, SettingsSources};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "notegraph",
    about = "Scan a markdown note tree into a backlink graph and keep links intact across renames",
    arg_required_else_help = true
)]
struct Cli {
    /// Config home holding `workspace.json`, `notegraph.yaml` and the index database.
    #[arg(long = "config-home", value_name = "DIR", global = true)]
    config_home: Option<PathBuf>,

    /// Explicit settings file used instead of `<config-home>/notegraph.yaml`.
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the workspace descriptor pointing at a note tree.
    Init {
        #[arg(long, value_name = "DIR")]
        storage: PathBuf,
    },
    /// Rebuild the graph index from the note tree.
    Scan,
    /// Rewrite links after a note was renamed.
    Rename { old_id: String, new_id: String },
    /// List indexed notes.
    Notes,
    /// List edges, optionally filtered by endpoint.
    Links {
        #[arg(long, value_name = "ID")]
        source: Option<String>,
        #[arg(long, value_name = "ID")]
        target: Option<String>,
    },
    /// List edges pointing at a note.
    Backlinks { note_id: String },
    /// Return graph index stats.
    Stats,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn not_initialized(engine: &NoteGraph) -> serde_json::Value {
    json!({
        "status": "not_initialized",
        "descriptor": engine.descriptor_file().path().display().to_string(),
    })
}

async fn execute(cli: &Cli, engine: &NoteGraph) -> Result<()> {
    let store = engine.store();
    match &cli.command {
        Command::Init { storage } => {
            let storage = std::path::absolute(storage)
                .with_context(|| format!("cannot resolve storage path {}", storage.display()))?;
            let descriptor = engine
                .initialize(storage)
                .await
                .context("failed to write workspace descriptor")?;
            emit(&descriptor, cli.output)
        }
        Command::Scan => match engine.run_full_scan().await.context("full scan failed")? {
            Some(report) => emit(&report, cli.output),
            None => emit(&not_initialized(engine), cli.output),
        },
        Command::Rename { old_id, new_id } => {
            let outcome = engine
                .rename_note(&NoteId::new(old_id), &NoteId::new(new_id))
                .await
                .context("rename reconciliation failed")?;
            match outcome {
                Some(report) => emit(&report, cli.output),
                None => emit(&not_initialized(engine), cli.output),
            }
        }
        Command::Notes => emit(&store.list_notes().await?, cli.output),
        Command::Links { source, target } => {
            let edges: Vec<KeyedEdge> = match (source, target) {
                (Some(source), Some(target)) => store
                    .outlinks(&NoteId::new(source))
                    .await?
                    .into_iter()
                    .filter(|keyed| keyed.edge.target.as_str() == target)
                    .collect(),
                (Some(source), None) => store.outlinks(&NoteId::new(source)).await?,
                (None, Some(target)) => store.backlinks(&NoteId::new(target)).await?,
                (None, None) => store.list_edges().await?,
            };
            emit(&edges, cli.output)
        }
        Command::Backlinks { note_id } => {
            let note_id = NoteId::new(note_id);
            let edges = store.backlinks(&note_id).await?;
            emit(&json!({"note_id": note_id, "backlinks": edges}), cli.output)
        }
        Command::Stats => emit(&store.stats().await?, cli.output),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; stdout carries only command output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notegraph=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = NoteGraphSettings::load(&SettingsSources {
        config_home: cli.config_home.clone(),
        config_file: cli.config_file.clone(),
    })
    .context("failed to load notegraph settings")?;
    tracing::debug!(
        event = "settings.loaded",
        config_home = %settings.config_home.display(),
        backend = settings.store.backend_name(),
        "settings loaded"
    );
    let engine = NoteGraph::from_settings(&settings).context("failed to open graph index")?;
    execute(&cli, &engine).await
}
