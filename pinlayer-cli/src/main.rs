//! Pinlayer CLI - stylesheet scanner for fixed and sticky positioned rules
//!
//! Usage:
//!   pinlayer scan <file>...            List fixed and sticky selectors
//!   pinlayer scan <file>... --json     Same, as JSON
//!   pinlayer config                    Print the default engine configuration
//!
//! Every file is inserted as a `<style>` element of an empty document, in
//! the order given, and scanned the way the engine scans a page on setup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use pinlayer_dom::{DomTree, NodeId};
use pinlayer_engine::{Document, FixedLayerConfig, ScanResult, scan_style_sheets};

/// Pinlayer - find the rules the fixed layer would pick up
#[derive(Parser, Debug)]
#[command(name = "pinlayer")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Scan two stylesheets
    pinlayer scan site.css widgets.css

    # Scan with a custom selector cap, printing JSON
    pinlayer scan --config pinlayer.json --json site.css

    # Mark a sheet as framework-internal so the scan skips it
    pinlayer scan site.css --internal runtime.css
"#)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan stylesheets for fixed and sticky selectors
    Scan {
        /// Stylesheets to scan, in document order
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Stylesheets inserted with the first framework marker attribute
        #[arg(long, value_name = "FILE")]
        internal: Vec<PathBuf>,

        /// Engine configuration (JSON); missing fields keep their defaults
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            files,
            internal,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let document = build_document(&files, &internal, &config)?;
            let result = scan_style_sheets(&document.style_sheets, &document.tree, &config)
                .context("stylesheet scan failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&FixedLayerConfig::default())?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FixedLayerConfig> {
    let Some(path) = path else {
        return Ok(FixedLayerConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("failed to read config '{}'", path.display()))?;
    let config =
        serde_json::from_str(&text).with_context(|| format!("invalid config '{}'", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// An `html`/`head`/`body` document holding one `<style>` per file.
fn build_document(files: &[PathBuf], internal: &[PathBuf], config: &FixedLayerConfig) -> Result<Document> {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    let head = tree.create_element("head");
    let body = tree.create_element("body");
    tree.append_child(NodeId::ROOT, html)?;
    tree.append_child(html, head)?;
    tree.append_child(html, body)?;

    let mut document = Document::new(tree);
    let marker = config.skip_owner_markers.first().map(String::as_str);
    if !internal.is_empty() && marker.is_none() {
        log::warn!("no framework marker configured, --internal sheets will be scanned");
    }

    for path in internal {
        let attributes: Vec<(&str, &str)> = marker.map(|m| (m, "")).into_iter().collect();
        add_sheet(&mut document, path, &attributes)?;
    }
    for path in files {
        add_sheet(&mut document, path, &[])?;
    }
    Ok(document)
}

fn add_sheet(document: &mut Document, path: &Path, attributes: &[(&str, &str)]) -> Result<()> {
    let css = fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let _ = document
        .add_style_element(&css, attributes)
        .with_context(|| format!("failed to parse '{}'", path.display()))?;
    log::debug!("added {} ({} bytes)", path.display(), css.len());
    Ok(())
}

fn print_result(result: &ScanResult) {
    if result.is_empty() {
        println!("{}", "No fixed or sticky rules found".dimmed());
        return;
    }

    println!("{} ({})", "Fixed".bold().red(), result.fixed.len());
    for selector in &result.fixed {
        println!("  {}", selector.red());
    }
    println!("{} ({})", "Sticky".bold().yellow(), result.sticky.len());
    for selector in &result.sticky {
        println!("  {}", selector.yellow());
    }
}
