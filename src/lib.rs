#![doc = include_str!("../README.md")]
#![warn(clippy::all)]

//! docforge - documentation generated from source code by a language model
//!
//! A project (uploaded ZIP, local directory or cloned GitHub repository) is
//! flattened into one text corpus, split into chunks that fit the model's
//! context window, documented chunk by chunk and, when more than one chunk
//! was needed, consolidated by a final call.
//!
//! ## Usage
//! ```rust,ignore
//! use docforge::{Config, DocumentationPipeline, OpenAiBackend, SourceFile};
//!
//! async fn example() -> docforge::Result<()> {
//!     let config = Config::load()?;
//!     let backend = OpenAiBackend::new(&config)?;
//!     let pipeline = DocumentationPipeline::from_settings(backend, &config.llm);
//!
//!     let files = vec![SourceFile::new("src/main.rs", "fn main() {}\n")];
//!     let doc = pipeline.run(&files, "Genera un README").await?;
//!     println!("{}", doc.content);
//!     Ok(())
//! }
//! ```

/// Configuration module for the application
pub mod config;
/// Error handling types and utilities
pub mod error;
/// Logging configuration and utilities
pub mod logging;
/// Line-oriented splitting of the corpus into token-budgeted chunks
pub mod chunker;
/// Serialization of the selected files into one text
pub mod corpus;
/// Prompt texts sent to the completion backend
pub mod prompts;
/// Completion backends
pub mod llm;
/// Chunk and consolidate orchestration
pub mod pipeline;
/// Listing, uploading, cloning and reading projects
pub mod sources;
/// One-at-a-time instruction queue
pub mod queue;
/// Output formats, multi-file sections and export
pub mod documents;
/// Service layer behind the HTTP routes
pub mod api;
/// Terminal helpers for the command-line interface
pub mod cli;

// Re-export common types
pub use config::Config;
pub use corpus::{Corpus, SourceFile};
pub use error::{DocForgeError, Result};
pub use llm::{CompletionBackend, OpenAiBackend};
pub use pipeline::{DocumentationPipeline, FinalDocument, PipelineSettings, PipelineState};
