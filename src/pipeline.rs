//! Chunk → refine documentation pipeline.
//!
//! A request moves through `Collecting → Processing → (Consolidating) → Done`,
//! or to `Failed` on the first error. Chunks are sent one at a time and in
//! order; a failed call aborts the request without returning partial output
//! and is never retried.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chunker::split_into_chunks;
use crate::config::LlmSettings;
use crate::corpus::{Corpus, SourceFile};
use crate::error::{DocForgeError, Result};
use crate::llm::CompletionBackend;
use crate::prompts;

/// Where a request currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Building the corpus from the selected files
    Collecting { files: usize },
    /// Waiting on the backend for chunk `chunk` (1-based) of `total`
    Processing { chunk: usize, total: usize },
    /// Merging `partials` chunk results with one more call
    Consolidating { partials: usize },
    /// Finished with a final document
    Done { chunks: usize },
    /// Stopped on the first error
    Failed { reason: String },
}

/// Model output for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    /// 0-based position of the chunk
    pub index: usize,
    pub total: usize,
    pub text: String,
}

/// Result of a successful request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDocument {
    pub content: String,
    /// Number of chunks the corpus was split into
    pub chunk_count: usize,
    /// True when a consolidation call produced the content
    pub consolidated: bool,
}

/// Per-request model settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    /// Token budget for code in one chunk
    pub context_tokens: usize,
    /// Tokens reserved for each answer
    pub completion_tokens: usize,
}

impl From<&LlmSettings> for PipelineSettings {
    fn from(llm: &LlmSettings) -> Self {
        Self {
            model: llm.model.clone(),
            context_tokens: llm.context_budget(),
            completion_tokens: llm.max_tokens_for_completion,
        }
    }
}

/// Runs documentation requests against a completion backend
pub struct DocumentationPipeline<B> {
    backend: B,
    settings: PipelineSettings,
}

impl<B: CompletionBackend> DocumentationPipeline<B> {
    pub fn new(backend: B, settings: PipelineSettings) -> Self {
        Self { backend, settings }
    }

    /// Uses the model and token budget of the `llm` configuration section
    pub fn from_settings(backend: B, llm: &LlmSettings) -> Self {
        Self::new(backend, PipelineSettings::from(llm))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generates documentation for `files` following `instruction`
    pub async fn run(&self, files: &[SourceFile], instruction: &str) -> Result<FinalDocument> {
        self.run_observed(files, instruction, None, |_| {}).await
    }

    /// Same as [`run`](Self::run), reporting every state change to `observe`
    ///
    /// `model` overrides the configured model for this request only.
    pub async fn run_observed<F>(
        &self,
        files: &[SourceFile],
        instruction: &str,
        model: Option<&str>,
        mut observe: F,
    ) -> Result<FinalDocument>
    where
        F: FnMut(&PipelineState) + Send,
    {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.settings.model.as_str());

        match self.execute(files, instruction, model, &mut observe).await {
            Ok(document) => {
                let state = PipelineState::Done { chunks: document.chunk_count };
                info!("Documentation ready ({} chunk(s), {} chars)", document.chunk_count, document.content.len());
                observe(&state);
                Ok(document)
            }
            Err(e) => {
                warn!("Documentation request failed: {}", e);
                observe(&PipelineState::Failed { reason: e.to_string() });
                Err(e)
            }
        }
    }

    async fn execute<F>(
        &self,
        files: &[SourceFile],
        instruction: &str,
        model: &str,
        observe: &mut F,
    ) -> Result<FinalDocument>
    where
        F: FnMut(&PipelineState) + Send,
    {
        observe(&PipelineState::Collecting { files: files.len() });
        if files.is_empty() {
            return Err(DocForgeError::NoFilesFound);
        }

        let corpus = Corpus::from_files(files);
        let chunks = split_into_chunks(corpus.text(), self.settings.context_tokens);
        if chunks.is_empty() {
            return Err(DocForgeError::NoFilesFound);
        }

        let total = chunks.len();
        info!(
            "Analyzing {} file(s), {} chars in {} chunk(s) with {}",
            corpus.file_count(),
            corpus.char_len(),
            total,
            model
        );

        let system = prompts::system_prompt();
        let mut results = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            observe(&PipelineState::Processing { chunk: index + 1, total });
            let chunk_instruction = prompts::chunk_instruction(instruction, index, total);
            let text = invoke_chunk(
                &self.backend,
                &system,
                chunk,
                &chunk_instruction,
                model,
                self.settings.completion_tokens,
            )
            .await?;
            results.push(ChunkResult { index, total, text });
        }

        if total == 1 {
            let content = results.pop().map(|r| r.text).unwrap_or_default();
            return Ok(FinalDocument { content, chunk_count: 1, consolidated: false });
        }

        let partials = join_results(&results);
        observe(&PipelineState::Consolidating { partials: results.len() });
        let consolidated = invoke_chunk(
            &self.backend,
            &system,
            "",
            &prompts::consolidation_instruction(&partials),
            model,
            self.settings.completion_tokens,
        )
        .await?;

        let content = if consolidated.trim().is_empty() && !partials.trim().is_empty() {
            warn!("Consolidation returned no text, keeping the per-chunk results");
            partials
        } else {
            consolidated
        };

        Ok(FinalDocument { content, chunk_count: total, consolidated: true })
    }
}

/// Sends one chunk with its instruction to the backend
pub async fn invoke_chunk<B: CompletionBackend + ?Sized>(
    backend: &B,
    system_prompt: &str,
    chunk: &str,
    instruction: &str,
    model: &str,
    max_completion_tokens: usize,
) -> Result<String> {
    let user = prompts::user_prompt(instruction, chunk);
    backend.invoke(system_prompt, &user, model, max_completion_tokens).await
}

/// Concatenates chunk results in order, separated by a blank line
pub fn join_results(results: &[ChunkResult]) -> String {
    let mut joined = String::new();
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            joined.push_str("\n\n");
        }
        joined.push_str(&result.text);
    }
    joined
}
