//! Command-line entry point: manage stored datasets and route their edges.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use flowkit_core::{Dataset, EdgeId, Editor, EditorConfig, FileStorage, LoadOutcome, Route, Storage};
use kurbo::Point;
use serde_json::{Value, json};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dataset directory (defaults to the user data directory)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Editor configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored datasets
    List,
    /// Validate a dataset file and add it to the store
    Import {
        file: PathBuf,
        /// Dataset id (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,
    },
    /// Route every edge of a stored dataset
    Route {
        id: String,
        /// Write the routes as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a stored dataset
    Export { id: String },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let storage = match &args.store {
        Some(path) => FileStorage::new(path.clone())?,
        None => FileStorage::default_location()?,
    };
    log::debug!("Dataset store at {}", storage.base_path().display());

    let config = match &args.config {
        Some(path) => EditorConfig::from_file(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?,
        None => EditorConfig::default(),
    };

    match args.command {
        Command::List => {
            let mut ids = pollster::block_on(storage.list())?;
            ids.sort();
            for id in ids {
                println!("{id}");
            }
        }
        Command::Import { file, id } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let dataset = Dataset::from_json(&json)
                .with_context(|| format!("{} is not a valid dataset", file.display()))?;
            let id = match id {
                Some(id) => id,
                None => file
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
                    .context("Cannot derive a dataset id from the file name")?,
            };
            pollster::block_on(storage.save(&id, &dataset))?;
            println!(
                "Imported {id}: {} nodes, {} edges",
                dataset.nodes.len(),
                dataset.edges.len()
            );
        }
        Command::Route { id, output } => {
            let editor = open(config, &storage, &id)?;
            let routes = editor.route_all();
            let mut report = Vec::with_capacity(routes.len());
            for (edge_id, route) in &routes {
                println!(
                    "{edge_id}: {} segments, length {:.1}{}",
                    route.segment_count(),
                    route.length(),
                    if route.fallback { " (through obstacles)" } else { "" }
                );
                report.push(route_json(&editor, edge_id, route));
            }
            let fallbacks = routes.iter().filter(|(_, route)| route.fallback).count();
            println!("Routed {} edges, {fallbacks} through obstacles", routes.len());

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&Value::Array(report))?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
        Command::Export { id } => {
            let editor = open(config, &storage, &id)?;
            println!("{}", editor.export_json()?);
        }
    }

    Ok(())
}

/// Create a flowchart editor and load a stored dataset into it.
fn open(config: EditorConfig, storage: &dyn Storage, id: &str) -> Result<Editor> {
    let mut editor = Editor::flowchart(config)?;
    match pollster::block_on(editor.load_from(storage, id)) {
        LoadOutcome::Applied => Ok(editor),
        LoadOutcome::Failed(err) => {
            Err(err).with_context(|| format!("Failed to load dataset {id}"))
        }
        LoadOutcome::Superseded => bail!("Load of dataset {id} was superseded"),
    }
}

fn route_json(editor: &Editor, edge: &EdgeId, route: &Route) -> Value {
    let labels: Vec<Value> = editor
        .edge_labels(edge)
        .into_iter()
        .map(|(text, at)| json!({ "text": text, "at": coords(at) }))
        .collect();
    json!({
        "edge": edge.as_str(),
        "points": route.points.iter().copied().map(coords).collect::<Vec<_>>(),
        "labels": labels,
        "fallback": route.fallback,
    })
}

fn coords(point: Point) -> [f64; 2] {
    [point.x, point.y]
}
