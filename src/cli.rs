pub use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a dataset tree and summarize it
    Inspect {
        /// JSON file describing the dataset tree
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print items of a dataset tree as JSON
    Get {
        /// JSON file describing the dataset tree
        #[arg(short, long)]
        config: PathBuf,

        /// Global indices to fetch
        #[arg(required = true)]
        indices: Vec<usize>,
    },

    /// List the dataset types a config may use
    Types,
}
