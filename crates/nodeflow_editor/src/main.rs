// SPDX-License-Identifier: MIT OR Apache-2.0
//! `NodeFlow` command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nodeflow_editor::{starter_document, DispatchTarget, EditorSession, EditorSettings};
use nodeflow_graph::ops::create_default_registry;
use nodeflow_graph::{EvaluationStatus, GraphDocument};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// NodeFlow - build table-processing graphs and run them through a command engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file path
    #[arg(short, long, default_value = "nodeflow.ron")]
    config: PathBuf,

    /// Log level, used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered operations grouped by class
    Operations,
    /// Write a starter graph document
    New {
        /// Document to create
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the evaluation order and node hashes
    Order {
        /// Graph document
        path: PathBuf,
    },
    /// Evaluate from the sink and dispatch the commands
    Evaluate {
        /// Graph document
        path: PathBuf,
        /// Print the commands instead of dispatching them
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = EditorSettings::load_or_default(&args.config)
        .with_context(|| format!("Failed to load settings from {:?}", args.config))?;

    let level = args.log_level.as_deref().unwrap_or(&settings.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("nodeflow_graph={level},nodeflow_editor={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("NodeFlow v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Operations => list_operations(),
        Command::New { path, force } => new_document(path, force),
        Command::Order { path } => print_order(path),
        Command::Evaluate { path, dry_run } => evaluate(&settings, path, dry_run),
    }
}

fn list_operations() -> Result<()> {
    let registry = create_default_registry();
    for class_name in registry.class_names() {
        println!("{class_name}");
        for op in registry.types_in_menu(class_name) {
            let d = &op.descriptor;
            println!("  {:<12} {} ({} inputs)", d.name, d.description, d.max_inputs);
        }
    }
    Ok(())
}

fn new_document(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", path);
    }
    let document = starter_document(&create_default_registry())?;
    document
        .save(&path)
        .with_context(|| format!("Failed to write {:?}", path))?;
    println!("Created {}", path.display());
    Ok(())
}

fn print_order(path: PathBuf) -> Result<()> {
    let document = GraphDocument::load(&path)
        .with_context(|| format!("Failed to load graph from {:?}", path))?;
    let graph = nodeflow_graph::Graph::from_document(&document, &create_default_registry())?;
    let Some(sink) = graph.sink() else {
        bail!("Graph '{}' has no viewer set", graph.name);
    };

    for (index, id) in graph.upstream_order(sink).into_iter().enumerate() {
        let Some(node) = graph.node(id) else { continue };
        let hash = graph.node_hash(id).unwrap_or_default();
        let state = if node.is_disabled() { " (disabled)" } else { "" };
        println!("{:>3}  {:<16} _{}{}", index + 1, node.name, hash, state);
    }
    Ok(())
}

fn evaluate(settings: &EditorSettings, path: PathBuf, dry_run: bool) -> Result<()> {
    let target = if dry_run {
        DispatchTarget::DryRun
    } else {
        settings.dispatch.clone()
    };
    let engine = target
        .open_engine()
        .with_context(|| format!("Failed to open {}", target.display_name()))?;

    let mut session = EditorSession::new(settings, engine);
    session
        .open(&path)
        .with_context(|| format!("Failed to load graph from {:?}", path))?;
    let report = session.evaluate();

    match report.status {
        EvaluationStatus::NoSink => bail!("Graph has no viewer set"),
        EvaluationStatus::SinkUnconnected => {
            tracing::warn!("Viewer has no input; nothing to evaluate");
            return Ok(());
        }
        EvaluationStatus::Completed => {}
    }

    if dry_run {
        for text in report.command_texts() {
            println!("{text}");
        }
    }
    for failure in &report.failures {
        tracing::error!("{}: {}", failure.command, failure.error);
    }
    tracing::info!(
        "{} commands via {}, {} failed",
        report.commands.len(),
        target.display_name(),
        report.failures.len()
    );
    if !report.is_success() {
        bail!("{} of {} commands failed", report.failures.len(), report.commands.len());
    }
    Ok(())
}
