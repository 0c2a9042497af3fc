// SPDX-License-Identifier: MIT OR Apache-2.0
//! `mxgen` - shader generation for `OrdoPlay` material documents
//!
//! Loads a material document, merges the standard library and any named
//! libraries into it, and generates OSL, MDL or GLSL source (or a wrapped
//! GLSL fragment) for one node graph or top-level node.

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Parser;
use ordoplay_materialx_core::library::{load_libraries, SEARCH_PATH_ENV};
use ordoplay_materialx_core::{stdlib, Document, FileSearchPath};
use ordoplay_materialx_gen::fragment::FragmentGenerator;
use ordoplay_materialx_gen::{generate_from_node, generate_from_node_graph, generators, GenContext, GenOptions};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "mxgen")]
#[command(about = "Generate shader source from an OrdoPlay material document")]
struct Cli {
    /// Material document (RON)
    document: PathBuf,

    /// Node graph or top-level node to generate
    element: String,

    /// Target language: osl, mdl or glsl
    #[arg(short, long, default_value = "osl")]
    language: String,

    /// Generation options (RON)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Libraries to load, resolved through the search path
    #[arg(long, value_delimiter = ',')]
    libraries: Vec<String>,

    /// Additional search path roots
    #[arg(long = "search-path")]
    search_path: Vec<PathBuf>,

    /// Emit a wrapped GLSL fragment and log its parameter bindings
    #[arg(long)]
    fragment: bool,

    /// Output file; standard output when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("ordoplay_materialx_core=info".parse()?)
        .add_directive("ordoplay_materialx_gen=info".parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(Cli::parse())
}

fn load_document(cli: &Cli, search_path: &FileSearchPath) -> Result<Document> {
    let mut document = Document::load(&cli.document)
        .with_context(|| format!("Failed to load document {}", cli.document.display()))?;

    for conflict in document.import_library(&stdlib::standard_library()) {
        tracing::debug!("Document overrides standard library {}", conflict);
    }

    let names: Vec<&str> = cli.libraries.iter().map(String::as_str).collect();
    let report = load_libraries(&names, search_path, &mut document);
    for error in &report.errors {
        tracing::warn!("{}", error);
    }
    for conflict in &report.conflicts {
        tracing::warn!("Skipped conflicting library element {}", conflict);
    }
    Ok(document)
}

fn run(cli: Cli) -> Result<()> {
    let options = match &cli.options {
        Some(path) => GenOptions::load(path).with_context(|| format!("Failed to load options {}", path.display()))?,
        None => GenOptions::default(),
    };

    let mut search_path = FileSearchPath::from_env(SEARCH_PATH_ENV);
    for root in &cli.search_path {
        search_path.append(root.clone());
    }
    if let Some(parent) = cli.document.parent() {
        search_path.append(parent.to_path_buf());
    }

    let document = load_document(&cli, &search_path)?;
    let mut ctx = GenContext::new(options).with_search_path(search_path);
    let node_graph = document.nodegraph(&cli.element);
    let node = document.node(&cli.element);
    if node_graph.is_none() && node.is_none() {
        bail!("No node graph or node named '{}' in {}", cli.element, cli.document.display());
    }

    let source = if cli.fragment {
        let generator = FragmentGenerator::new()?;
        let fragment = match node_graph {
            Some(graph) => generator.generate_from_node_graph(&cli.element, graph, &document, &mut ctx),
            None => generator.generate_from_node(&cli.element, node.ok_or_else(|| anyhow!("missing node"))?, &document, &mut ctx),
        }
        .with_context(|| format!("Failed to generate fragment for '{}'", cli.element))?;
        tracing::info!("Parameter bindings:\n{}", serde_json::to_string_pretty(&fragment.path_map)?);
        fragment.text
    } else {
        let generator = generators::for_language(&cli.language)?
            .ok_or_else(|| anyhow!("Unknown language '{}'", cli.language))?;
        let shader = match node_graph {
            Some(graph) => generate_from_node_graph(generator.as_ref(), &cli.element, graph, &document, &mut ctx),
            None => generate_from_node(
                generator.as_ref(),
                &cli.element,
                node.ok_or_else(|| anyhow!("missing node"))?,
                &document,
                &mut ctx,
            ),
        }
        .with_context(|| format!("Failed to generate {} for '{}'", cli.language, cli.element))?;
        shader.source_code().to_string()
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &source).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => print!("{source}"),
    }
    Ok(())
}
