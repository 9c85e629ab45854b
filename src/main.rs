//! filedeck - headless driver for the file operation engine.
//!
//! Usage:
//!   filedeck remove PATH...            Confirm, then trash or delete
//!   filedeck trash PATH...             Move to the trash
//!   filedeck delete PATH...            Delete permanently
//!   filedeck copy SRC... --to DIR      Copy into a directory
//!   filedeck move SRC... --to DIR      Move into a directory
//!   filedeck extract ARCHIVE           Extract next to the archive
//!   filedeck compress PATH             Zip next to the source
//!   filedeck rename PATH NAME          Rename in place
//!   filedeck create DIR NAME           Create a file, or a directory if NAME ends in '/'
//!
//! Every bus message is printed to stdout as it arrives.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Context, Result};
use tracing_subscriber::EnvFilter;

use filedeck_core::{EngineConfig, Message, MessagePayload, Panel, Process, ProcessState};
use filedeck_ops::{BatchHandle, Engine, MessageReceiver};

#[derive(Parser)]
#[command(
    name = "filedeck",
    version,
    about = "File operations with progress reporting",
    long_about = "filedeck runs one file operation and prints the progress messages \
                  the engine announces.\n\n\
                  Set FILEDECK_LOG (e.g. `debug`) to control log output on stderr."
)]
struct Cli {
    /// Freedesktop trash directory to use instead of the platform default
    #[arg(long, global = true)]
    trash_root: Option<PathBuf>,

    /// Capacity of the progress message queue
    #[arg(long, global = true)]
    bus_capacity: Option<usize>,

    /// Print messages as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask for confirmation, then trash (or permanently delete on external volumes)
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Answer the confirmation with yes
        #[arg(short, long)]
        yes: bool,
    },

    /// Move items to the trash
    Trash {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Permanently delete items
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy items into a directory
    Copy {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        to: PathBuf,
    },

    /// Move items into a directory
    Move {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short, long)]
        to: PathBuf,
    },

    /// Extract an archive into a directory beside it
    Extract { archive: PathBuf },

    /// Compress a file or directory into a zip beside it
    Compress { path: PathBuf },

    /// Rename a file or directory
    Rename { path: PathBuf, name: String },

    /// Create a file (or a directory when NAME ends in '/')
    Create { dir: PathBuf, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let (engine, rx) = Engine::new(config).context("Failed to start engine")?;
    let printer = tokio::spawn(print_messages(rx, cli.json));

    let outcome = run(engine, cli.command).await;
    // The engine is dropped by now, which closes the bus.
    printer.await.context("Message printer failed")??;

    match outcome? {
        Some(process) if process.state == ProcessState::Failure => {
            bail!("{} failed ({}/{})", process.name, process.done, process.total)
        }
        _ => Ok(()),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("FILEDECK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let mut builder = EngineConfig::builder();
    if let Some(root) = &cli.trash_root {
        builder.trash_root(root.clone()).use_native_trash(false);
    }
    if let Some(capacity) = cli.bus_capacity {
        builder.bus_capacity(capacity);
    }
    builder.build().wrap_err("Invalid configuration")
}

async fn run(mut engine: Engine, command: Command) -> Result<Option<Process>> {
    let handle = match command {
        Command::Remove { paths, yes } => {
            let mut panel = selection_panel(&paths)?;
            let Some(request) = engine.request_delete(&panel) else {
                return Ok(None);
            };
            if !yes {
                eprintln!("Not confirmed; pass --yes to proceed.");
                return Ok(None);
            }
            engine.confirm(request.action, &mut panel)
        }
        Command::Trash { paths } => engine.trash_items(&mut selection_panel(&paths)?),
        Command::Delete { paths } => engine.delete_items(&mut selection_panel(&paths)?),
        Command::Copy { sources, to } => {
            engine.copy_items(&selection_panel(&sources)?);
            engine.paste_items(&Panel::new(absolute(&to)?))
        }
        Command::Move { sources, to } => {
            engine.cut_items(&selection_panel(&sources)?);
            engine.paste_items(&Panel::new(absolute(&to)?))
        }
        Command::Extract { archive } => {
            let panel = cursor_panel(&archive)?;
            let handle = engine.extract_under_cursor(&panel);
            if handle.is_none() {
                bail!("Unsupported archive format: {}", archive.display());
            }
            handle
        }
        Command::Compress { path } => engine.compress_under_cursor(&cursor_panel(&path)?),
        Command::Rename { path, name } => {
            let mut panel = cursor_panel(&path)?;
            return Ok(engine.rename_item(&mut panel, &name).await?);
        }
        Command::Create { dir, name } => {
            let panel = Panel::new(absolute(&dir)?);
            return Ok(Some(engine.create_item(&panel, &name).await?));
        }
    };

    wait(handle).await
}

async fn wait(handle: Option<BatchHandle>) -> Result<Option<Process>> {
    match handle {
        Some(handle) => Ok(Some(handle.wait().await?)),
        None => Ok(None),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path: {}", path.display()))
}

/// Panel over the first path's directory with all paths selected.
fn selection_panel(paths: &[PathBuf]) -> Result<Panel> {
    let paths = paths.iter().map(|p| absolute(p)).collect::<Result<Vec<_>>>()?;
    let location = paths
        .first()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .ok_or_else(|| eyre!("No parent directory"))?;

    let mut panel = Panel::read_dir(&location)
        .with_context(|| format!("Cannot list {}", location.display()))?;
    panel.selected = paths;
    Ok(panel)
}

/// Panel over the path's directory with the cursor on the path.
fn cursor_panel(path: &Path) -> Result<Panel> {
    let mut panel = selection_panel(&[path.to_path_buf()])?;
    let target = panel.selected.remove(0);
    panel.cursor = panel
        .position(&target)
        .ok_or_else(|| eyre!("Not found: {}", target.display()))?;
    Ok(panel)
}

async fn print_messages(mut rx: MessageReceiver, json: bool) -> Result<()> {
    while let Some(message) = rx.recv().await {
        if json {
            println!("{}", serde_json::to_string(&message)?);
        } else {
            println!("{}", describe(&message));
        }
    }
    Ok(())
}

fn describe(message: &Message) -> String {
    match &message.payload {
        MessagePayload::Process(p) => format!(
            "{} {:<12} {:>5.1}% {}/{} {}",
            p.id,
            p.state,
            p.percentage(),
            p.done,
            p.total,
            p.name
        ),
        MessagePayload::Confirmation(c) => format!("{} {}\n    {}", message.id, c.title, c.body),
    }
}
