pub mod config;
pub mod error;

// Core data model
pub mod constraints;

// Extraction pipeline
pub mod alias;
pub mod extract;
pub mod semantic;

// Retrieval
pub mod backend;
pub mod compile;

// Ranking and orchestration
pub mod pipeline;
pub mod rank;

// CLI
pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use config::Settings;
pub use constraints::ConstraintSet;
pub use error::{Error, Result};
