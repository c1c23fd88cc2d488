//! Command line front-end for the offline HTML viewer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use offline_html_viewer::asset_paths::normalize_path;
use offline_html_viewer::ingest::CollectOptions;
use offline_html_viewer::{
    Ingested, PLACEHOLDER_HTML, RenderedDocument, ResourceIndex, ViewerConfig, ViewerSession,
    collect_files, rewrite,
};

#[derive(Debug, Parser)]
#[command(
    name = "offline-viewer",
    version,
    about = "Store local HTML files and render them offline"
)]
struct Cli {
    /// Configuration file to use instead of discovering one in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store location, overriding the configured one.
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save HTML files or whole folders (with their assets).
    Add {
        /// Files or folders to store.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List stored documents.
    List,
    /// Render a stored document with its assets inlined.
    Open {
        /// Document id; defaults to the active document.
        id: Option<String>,
        /// Write the HTML to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Remove a stored document.
    Remove {
        /// Document id.
        id: String,
    },
    /// Forget every stored document and resource.
    Clear,
    /// Rewrite a document inside a folder without touching the store.
    Rewrite {
        /// Folder holding the document and its assets.
        folder: PathBuf,
        /// Document path relative to the folder.
        #[arg(long, default_value = "index.html")]
        entry: String,
        /// Write the HTML to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::from_path(path)
            .ok_or_else(|| anyhow!("failed to load config from {}", path.display()))?,
        None => ViewerConfig::discover(&cwd),
    };
    if let Some(storage) = &cli.storage {
        config.storage_file = storage.to_string_lossy().into_owned();
    }

    match cli.command {
        Command::Add { paths } => add(&config, &cwd, &paths),
        Command::List => list(&config, &cwd),
        Command::Open { id, out } => open(&config, &cwd, id.as_deref(), out.as_deref()),
        Command::Remove { id } => {
            let mut session = ViewerSession::open(&config, &cwd);
            let removed = session.remove(&id)?;
            println!("removed {} ({})", removed.name, removed.id);
            Ok(())
        }
        Command::Clear => {
            let mut session = ViewerSession::open(&config, &cwd);
            if !session.clear() {
                return Err(anyhow!("failed to clear the store"));
            }
            println!("cleared stored documents and resources");
            Ok(())
        }
        Command::Rewrite { folder, entry, out } => {
            rewrite_folder(&config, &folder, &entry, out.as_deref())
        }
    }
}

fn add(config: &ViewerConfig, cwd: &Path, paths: &[PathBuf]) -> Result<()> {
    let files = collect_files(paths, &config.collect_options(cwd))?;
    if files.is_empty() {
        return Err(anyhow!("no files found in the given paths"));
    }

    let classifier = config.classifier();
    let mut session = ViewerSession::open(config, cwd);
    let outcome = session.add_files(files.into_iter().map(|file| classifier.ingest(file)));

    println!(
        "stored {} new and {} updated document(s), {} resource(s)",
        outcome.added.len(),
        outcome.replaced.len(),
        outcome.resources
    );
    if !outcome.persisted {
        eprintln!("warning: files are only kept for this run, the store could not be written");
    }
    Ok(())
}

fn list(config: &ViewerConfig, cwd: &Path) -> Result<()> {
    let session = ViewerSession::open(config, cwd);
    if session.documents().is_empty() {
        println!("no saved documents yet");
        return Ok(());
    }

    for document in session.documents() {
        let marker = if session.active_id() == Some(document.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {id}  {path}  ({added})",
            id = document.id,
            path = document.path,
            added = document.added_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("{} resource(s) stored", session.resources().len());
    Ok(())
}

fn open(config: &ViewerConfig, cwd: &Path, id: Option<&str>, out: Option<&Path>) -> Result<()> {
    let mut session = ViewerSession::open(config, cwd);
    let rendered = match id {
        Some(id) => {
            session.select(id)?;
            Some(session.render(id)?)
        }
        None => session.render_active(),
    };

    match rendered {
        Some(rendered) => emit_rendered(&rendered, out),
        None => emit(PLACEHOLDER_HTML, out),
    }
}

fn rewrite_folder(
    config: &ViewerConfig,
    folder: &Path,
    entry: &str,
    out: Option<&Path>,
) -> Result<()> {
    let options = CollectOptions {
        include_hidden: config.include_hidden,
        exclude: None,
    };
    let files = collect_files(&[folder.to_path_buf()], &options)?;
    let folder_name = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no folder name", folder.display()))?;
    let entry_path = normalize_path(&format!("{folder_name}/{entry}"));

    let classifier = config.classifier();
    let mut resources = ResourceIndex::default();
    let mut document = None;
    for file in files {
        match classifier.ingest(file) {
            Ingested::Document(candidate) if candidate.path == entry_path => {
                document = Some(candidate)
            }
            Ingested::Document(_) => {}
            Ingested::Resource(resource) => {
                resources.insert(resource);
            }
        }
    }

    let document = document.ok_or_else(|| anyhow!("{entry} not found in {}", folder.display()))?;
    let output = rewrite(&document.content, &document.path, &resources)
        .with_context(|| format!("failed to rewrite {}", document.path))?;
    report_missing(&output.missing);
    emit(&output.html, out)
}

fn emit_rendered(rendered: &RenderedDocument, out: Option<&Path>) -> Result<()> {
    if rendered.fell_back {
        eprintln!("warning: showing {} without resolving its assets", rendered.name);
    }
    report_missing(&rendered.missing);
    emit(&rendered.html, out)
}

fn report_missing(missing: &[String]) {
    for reference in missing {
        eprintln!("missing: {reference}");
    }
}

fn emit(html: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{html}");
            Ok(())
        }
    }
}
