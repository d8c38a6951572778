mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use standings_core::{Manager, legacy};
use standings_engine::Engine;
use standings_storage::SqliteStorage;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "standings", version, about = "League standings store administration")]
struct Cli {
    /// SQLite database file; without one, reads are empty and writes are refused
    #[arg(long, env = "STANDINGS_DB", global = true)]
    db: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "STANDINGS_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble the league document and print or save it as JSON
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load a league document (current or legacy shape) into the store
    Import { file: PathBuf },
    /// Rename a manager and every row that refers to the old name
    Rename {
        #[arg(long)]
        id: String,
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Replace one matchday with the games of a single block JSON file
    ReplaceMatchday { file: PathBuf },
    AddManager {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    DeleteManager {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_tracing(&cli.log)?;

    let engine = open_engine(cli.db.as_deref())?;

    match cli.command {
        Command::Export { out } => {
            let doc = engine.load_document().await;
            let text = serde_json::to_string_pretty(&doc)?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, text)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), matchdays = doc.matches.len(), "document exported");
                }
                None => println!("{text}"),
            }
        }
        Command::Import { file } => {
            let root = read_json(&file).await?;
            let report = engine.import_value(&root).await?;
            if report.error_count > 0 {
                warn!(errors = report.error_count, "some matchday blocks were not imported");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Rename { id, old, new } => {
            let outcome = engine.rename_manager(&id, &old, &new).await?;
            for (target, rows) in &outcome.updated {
                println!("{target}: {rows}");
            }
            info!(rows = outcome.total(), "rename complete");
        }
        Command::ReplaceMatchday { file } => {
            let raw = read_json(&file).await?;
            let block = legacy::parse_block(&raw)
                .with_context(|| format!("parsing matchday block in {}", file.display()))?;
            let written = engine
                .replace_matchday(&block.coords(), block.exempt.as_deref(), &block.games)
                .await?;
            println!("{}: {} games", block.coords(), written.len());
        }
        Command::AddManager { id, name } => {
            engine.save_manager(&Manager { id, name }).await?;
        }
        Command::DeleteManager { id } => {
            let deleted = engine.delete_manager(&id).await?;
            if deleted == 0 {
                warn!(%id, "no such manager");
            }
        }
    }

    Ok(())
}

fn open_engine(db: Option<&Path>) -> Result<Engine<SqliteStorage>> {
    let store = match db {
        Some(path) => Some(
            SqliteStorage::open(&path.to_string_lossy())
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => {
            warn!("no database configured (set --db or STANDINGS_DB)");
            None
        }
    };
    Ok(Engine::new(store))
}

async fn read_json(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
