use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;

use super::upload::{unique_dir, ExtractedProject};
use crate::error::{DocForgeError, Result};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_WEB_BASE: &str = "https://github.com";
const API_TIMEOUT_SECS: u64 = 30;

/// `owner/repo` pair identifying a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Directory-safe `owner_repo` name
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.owner, self.repo)
    }

    pub fn clone_url(&self) -> String {
        format!("{}/{}/{}.git", GITHUB_WEB_BASE, self.owner, self.repo)
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Accepts `owner/repo` or a `https://github.com/owner/repo[.git]` URL
pub fn parse_repo_slug(input: &str) -> Result<RepoSlug> {
    let input = input.trim();
    let path = if input.starts_with("http://") || input.starts_with("https://") {
        let url = Url::parse(input)?;
        if url.host_str() != Some("github.com") && url.host_str() != Some("www.github.com") {
            return Err(DocForgeError::Validation(format!("Not a GitHub URL: {}", input)));
        }
        url.path().trim_matches('/').to_string()
    } else {
        input.trim_matches('/').to_string()
    };

    let mut parts = path.split('/');
    let owner = parts.next().unwrap_or_default();
    let repo = parts.next().unwrap_or_default().trim_end_matches(".git");

    let valid = |s: &str| {
        !s.is_empty()
            && s != "."
            && s != ".."
            && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !valid(owner) || !valid(repo) {
        return Err(DocForgeError::Validation(format!(
            "Invalid repository '{}', expected owner/repo",
            input
        )));
    }

    Ok(RepoSlug { owner: owner.to_string(), repo: repo.to_string() })
}

/// Shallow-clones a repository into `<upload_dir>/github/<owner_repo>/<millis>`
///
/// The token, when present, is passed as an HTTP header so it never ends up
/// in the clone's remote URL.
pub async fn clone_repository(
    slug: &RepoSlug,
    upload_dir: &Path,
    token: Option<&str>,
    ignored: &[String],
) -> Result<ExtractedProject> {
    let extract_path = unique_dir(&upload_dir.join("github").join(slug.dir_name()))?;
    info!("Cloning {} into {}", slug, extract_path.display());

    let mut command = Command::new("git");
    if let Some(token) = token {
        command
            .arg("-c")
            .arg(format!("http.extraHeader=Authorization: Bearer {}", token));
    }
    let output = command
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(slug.clone_url())
        .arg(&extract_path)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| DocForgeError::Git(format!("failed to run git: {}", e)))?;

    if !output.status.success() {
        let _ = tokio::fs::remove_dir_all(&extract_path).await;
        return Err(DocForgeError::Git(format!(
            "git clone {} failed: {}",
            slug,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let mut ignored = ignored.to_vec();
    if !ignored.iter().any(|i| i == ".git") {
        ignored.push(".git".to_string());
    }
    let files = super::list_project_files(&extract_path, &ignored)?;
    Ok(ExtractedProject { extract_path, files })
}

/// Repository entry returned by the GitHub API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Minimal GitHub REST client
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Client for the public API, or `GITHUB_API_BASE_URL` when set
    pub fn new() -> Result<Self> {
        Self::with_base_url(&github_api_base())
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("docforge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Repositories of the token's owner, most recently updated first
    pub async fn list_user_repos(&self, token: &str) -> Result<Vec<RepoSummary>> {
        let url = format!("{}/user/repos?sort=updated&per_page=100", self.base_url);
        let response = self.client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("token {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DocForgeError::GitHubApi(format!(
                "GitHub API request failed: HTTP {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

/// Returns the base URL for GitHub API, overridable via the `GITHUB_API_BASE_URL` env var
fn github_api_base() -> String {
    std::env::var("GITHUB_API_BASE_URL").unwrap_or_else(|_| GITHUB_API_BASE.to_string())
}
