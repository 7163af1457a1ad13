use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "listing-intake")]
#[command(about = "Browse listing classifications and check listing images")]
pub struct CliConfig {
    #[arg(long, short, default_value = "listing-intake.toml")]
    pub config: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Walk the industry → category → subcategory tree
    Browse {
        #[arg(long)]
        industry: Option<String>,

        #[arg(long, requires = "industry")]
        category: Option<String>,
    },
    /// Validate image files the way listing intake does
    CheckImages {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}
