use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use liveimport::config::LiveImportConfig;
use liveimport::imports::analysis::analyze_file;
use liveimport::imports::{dedent, parse_imports};
use liveimport::project::{PlannedReload, ProjectGraph};
use liveimport::watcher::{SourceEvent, SourceWatcher};

use crate::error::Result;

#[derive(Parser)]
#[command(name = "liveimport")]
#[command(about = "Inspect import dependencies and reload order of Python source trees")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Show what a module possibly depends on
    liveimport analyze src/simulator.py --package sim

    # Normalize import statements
    liveimport check "from ..util import clamp as c" --package pkg.sub

    # Show the reload order after editing printmath.py
    liveimport plan . --touch printmath

    # Same, as JSON
    liveimport plan . --touch printmath --touch numbers --format json

    # Print the reload order for every batch of edits
    liveimport watch ./src
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the modules a source file possibly depends on
    Analyze {
        /// Module source file
        file: PathBuf,

        /// Package the module belongs to, for relative imports
        #[arg(long, default_value = "")]
        package: String,
    },

    /// Parse import statements and print them normalized
    Check {
        /// Import statements, separated by newlines or semicolons
        statements: String,

        /// Package context for relative imports
        #[arg(long)]
        package: Option<String>,
    },

    /// Print the reload order caused by modifying modules
    Plan {
        /// Root of the source tree
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Modified module (repeatable)
        #[arg(long = "touch", required = true)]
        touched: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Watch a source tree and print the reload order for each change
    Watch {
        /// Root of the source tree
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn analyze(file: &Path, package: &str) -> Result<()> {
    for dependency in analyze_file(file, package)? {
        println!("{}", dependency);
    }
    Ok(())
}

pub fn check(statements: &str, package: Option<&str>) -> Result<()> {
    let directives = parse_imports(&dedent(statements), package)?;
    if directives.is_empty() {
        println!("No import statements");
    }
    for directive in directives {
        println!("{}", directive);
    }
    Ok(())
}

pub fn plan(root: &Path, touched: &[String], format: OutputFormat) -> Result<()> {
    let config = LiveImportConfig::discover(root)?;
    let mut graph = ProjectGraph::scan(root, &config.source_extensions)?;
    let reloads = graph.plan(touched)?;
    print_plan(&reloads, format)
}

pub fn watch(root: &Path) -> Result<()> {
    let config = LiveImportConfig::discover(root)?;
    let watcher = SourceWatcher::new(&[root.to_path_buf()], &config.source_extensions)?;
    println!("Watching {} for changes...", root.display());

    while let Some(events) = watcher.recv() {
        // Rescan so edited imports are reflected in the graph.
        let mut graph = ProjectGraph::scan(root, &config.source_extensions)?;

        let mut touched = Vec::new();
        for event in &events {
            match event {
                SourceEvent::Modified(file) => {
                    if let Some(module) = graph.module_for_file(file) {
                        if !touched.contains(&module.name) {
                            touched.push(module.name.clone());
                        }
                    }
                }
                SourceEvent::Deleted(file) => println!("Removed {}", file.display()),
            }
        }

        if touched.is_empty() {
            continue;
        }
        println!("Modified: {}", touched.join(", "));
        print_plan(&graph.plan(&touched)?, OutputFormat::Text)?;
    }

    Ok(())
}

fn print_plan(reloads: &[PlannedReload], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reloads)?);
        }
        OutputFormat::Text => {
            if reloads.is_empty() {
                println!("Nothing to reload");
            }
            for (i, reload) in reloads.iter().enumerate() {
                if reload.after.is_empty() {
                    println!("{:>3}. {} ({})", i + 1, reload.module, reload.reason);
                } else {
                    println!(
                        "{:>3}. {} ({}, after {})",
                        i + 1,
                        reload.module,
                        reload.reason,
                        reload.after.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}
