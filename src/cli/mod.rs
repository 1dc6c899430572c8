pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tiffin", about = "Constraint-safe recipe search", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search recipes with extraction, retrieval and safety filtering
    Query {
        /// Free-text query, any supported language
        text: String,

        /// Source language tag ("auto" for detection)
        #[arg(long, default_value = "auto")]
        language: String,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Print provider cost counters after the results
        #[arg(long)]
        stats: bool,
    },

    /// Show deterministic, semantic and merged constraint sets for a query
    Extract {
        text: String,

        #[arg(long, default_value = "auto")]
        language: String,
    },

    /// Print the compiled backend query for a query string
    Compile { text: String },

    /// Print the alias family for an ingredient term
    Resolve { term: String },
}
