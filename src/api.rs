use crate::config::Config;
use crate::documents::{GeneratedDocument, OutputFormat};
use crate::error::{DocForgeError, Result};
use crate::llm::{CompletionBackend, OpenAiBackend};
use crate::pipeline::{DocumentationPipeline, PipelineState};
use crate::queue::Instruction;
use crate::sources::{self, ExtractedProject, FileNode, GitHubClient, RepoSummary};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Request payload for a documentation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest {
    /// Instruction, optionally ending with a `[format]` tag
    pub prompt: String,
    /// Directory of the uploaded or cloned project
    pub extract_path: String,
    /// Files to analyze; empty means every supported file
    #[serde(default)]
    pub selected_files: Vec<String>,
    /// Overrides the configured model for this request
    #[serde(default)]
    pub model: Option<String>,
}

/// Response for a successful documentation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    pub result: String,
    /// Format requested through the instruction's tag
    pub format: OutputFormat,
    pub chunk_count: usize,
    pub consolidated: bool,
}

/// Request payload for cloning a GitHub repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepoRequest {
    /// `owner/repo` or a github.com URL
    pub repo: String,
}

/// Request payload for exporting a generated answer as a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub instruction: String,
    pub content: String,
    /// Defaults to the instruction's tag, or Markdown
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

/// File produced by an export
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime: mime::Mime,
    pub bytes: Vec<u8>,
}

/// Uploaded or cloned project with its file tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: ExtractedProject,
    pub tree: Vec<FileNode>,
}

impl From<ExtractedProject> for ProjectResponse {
    fn from(project: ExtractedProject) -> Self {
        let tree = sources::build_file_tree(&project.files);
        Self { project, tree }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current status
    pub status: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
    /// Service uptime in seconds
    pub uptime: u64,
    /// Model used when a request names none
    pub model: String,
}

/// Shared state behind every HTTP route
pub struct DocForgeService {
    config: Arc<Config>,
    backend: Arc<dyn CompletionBackend>,
    start_time: DateTime<Utc>,
}

impl DocForgeService {
    pub fn new(config: Config, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            start_time: Utc::now(),
        }
    }

    /// Service backed by the OpenAI-compatible endpoint from `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let backend = OpenAiBackend::new(&config)?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn health(&self) -> HealthResponse {
        let now = Utc::now();
        HealthResponse {
            service: "docforge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "healthy".to_string(),
            timestamp: now,
            uptime: (now - self.start_time).num_seconds().max(0) as u64,
            model: self.config.llm.model.clone(),
        }
    }

    /// Extracts an uploaded ZIP archive under the upload directory
    pub fn upload(&self, bytes: &[u8]) -> Result<ProjectResponse> {
        let project = sources::extract_zip_upload(
            bytes,
            &self.config.sources.upload_dir,
            &self.config.sources.ignored_names,
        )?;
        Ok(project.into())
    }

    /// Clones `repo` under the upload directory
    pub async fn analyze_github_repo(&self, repo: &str) -> Result<ProjectResponse> {
        let slug = sources::parse_repo_slug(repo)?;
        let project = sources::clone_repository(
            &slug,
            &self.config.sources.upload_dir,
            self.config.api_keys.github_token.as_deref(),
            &self.config.sources.ignored_names,
        )
        .await?;
        Ok(project.into())
    }

    /// Repositories visible to the configured GitHub token
    pub async fn github_repos(&self) -> Result<Vec<RepoSummary>> {
        let token = self.config.github_token()?;
        GitHubClient::new()?.list_user_repos(token).await
    }

    /// Runs one documentation request over the selected files
    pub async fn generate(&self, request: &AiRequest) -> Result<AiResponse> {
        let instruction = Instruction::parse(&request.prompt)
            .ok_or_else(|| DocForgeError::Validation("Instruction must not be empty".into()))?;
        let root = self.checked_extract_path(&request.extract_path)?;
        let files = {
            let root = root.clone();
            let selected = request.selected_files.clone();
            let settings = self.config.sources.clone();
            tokio::task::spawn_blocking(move || sources::collect_sources(&root, &selected, &settings))
                .await
                .map_err(|e| DocForgeError::new(&e.to_string()))??
        };

        info!(
            "Documentation request on {} ({} file(s) read)",
            root.display(),
            files.len()
        );

        let pipeline = DocumentationPipeline::from_settings(self.backend.clone(), &self.config.llm);
        let document = pipeline
            .run_observed(&files, &instruction.text, request.model.as_deref(), log_state)
            .await?;

        Ok(AiResponse {
            result: document.content,
            format: instruction.format,
            chunk_count: document.chunk_count,
            consolidated: document.consolidated,
        })
    }

    /// Renders an answer in the requested format
    pub fn export(&self, request: &ExportRequest) -> Result<ExportedFile> {
        let (text, tagged) = match Instruction::parse(&request.instruction) {
            Some(i) => (i.text, i.format),
            None => (String::new(), OutputFormat::Markdown),
        };
        let format = request.format.unwrap_or(tagged);
        let document = GeneratedDocument::from_result(&text, format, request.content.clone());
        Ok(ExportedFile {
            bytes: document.render()?,
            mime: format.mime_type(),
            file_name: document.name,
        })
    }

    /// Resolves a client-supplied project directory, refusing anything outside the upload directory
    pub fn checked_extract_path(&self, raw: &str) -> Result<PathBuf> {
        if raw.trim().is_empty() {
            return Err(DocForgeError::Validation("extractPath is required".into()));
        }
        let upload_root = self.config.sources.upload_dir.canonicalize()
            .map_err(|_| DocForgeError::Validation("No project has been uploaded yet".into()))?;

        let candidate = Path::new(raw.trim());
        let candidate = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else if candidate.starts_with(&self.config.sources.upload_dir) {
            candidate.to_path_buf()
        } else {
            self.config.sources.upload_dir.join(candidate)
        };

        let resolved = candidate.canonicalize()
            .map_err(|_| DocForgeError::Validation(format!("Project not found: {}", raw)))?;
        if resolved == upload_root || !resolved.starts_with(&upload_root) || !resolved.is_dir() {
            return Err(DocForgeError::Validation(format!("Invalid project path: {}", raw)));
        }
        Ok(resolved)
    }
}

fn log_state(state: &PipelineState) {
    match state {
        PipelineState::Processing { chunk, total } => debug!("Processing chunk {}/{}", chunk, total),
        PipelineState::Consolidating { partials } => debug!("Consolidating {} partial result(s)", partials),
        other => debug!("Pipeline state: {:?}", other),
    }
}
