use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Parser)]
#[command(name = "uagate", about = "User-Agent admission gateway")]
pub struct Cli {
    /// Path to the runtime configuration file (defaults to ./uagate.toml if present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Load and compile the admission policy, then exit without listening.
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}
