use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sysvista::config::Config;
use sysvista::core::{Engine, ViewMode};

#[derive(Parser)]
#[command(name = "sysvista")]
#[command(about = "Map the models, services, transports and flows of a codebase")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a source tree and write the scan document
    Scan {
        /// Root directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (defaults to output.path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,

        /// Keep workflows that consist of the entry transport only
        #[arg(long)]
        include_single_step: bool,
    },

    /// Summarize clusters, hubs and workflows of a scan document
    Inspect {
        /// Scan document to load
        document: PathBuf,

        /// View to project before summarizing
        #[arg(long, value_enum, default_value_t = ViewMode::System)]
        mode: ViewMode,

        /// Number of hubs and workflows to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let mut config = Config::load_or_default(self.config.as_deref())?;

        match self.command {
            Commands::Scan {
                path,
                output,
                compact,
                include_single_step,
            } => {
                if compact {
                    config.output.pretty = false;
                }
                if include_single_step {
                    config.workflows.min_steps = 1;
                }
                let engine = Engine::new(config)?;
                engine.scan_to_file(&path, output)?;
                Ok(())
            }
            Commands::Inspect { document, mode, top } => {
                let engine = Engine::new(config)?;
                let inspection = engine.inspect(&document, mode, top)?;
                print!("{}", inspection);
                Ok(())
            }
        }
    }
}
