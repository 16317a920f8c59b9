#![allow(dead_code)]

use async_trait::async_trait;
use docforge::config::Config;
use docforge::{CompletionBackend, DocForgeError, Result};
use std::path::Path;
use std::sync::Mutex;

/// One recorded `invoke` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub model: String,
    pub max_tokens: usize,
}

/// Backend answering `R<n>` to the n-th call, optionally failing at one call
pub struct StubBackend {
    calls: Mutex<Vec<RecordedCall>>,
    fail_at: Option<usize>,
    empty_at: Option<usize>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { calls: Mutex::new(Vec::new()), fail_at: None, empty_at: None }
    }

    /// Fails the `n`-th call (1-based)
    pub fn failing_at(n: usize) -> Self {
        Self { fail_at: Some(n), ..Self::new() }
    }

    /// Answers the `n`-th call (1-based) with empty text
    pub fn empty_at(n: usize) -> Self {
        Self { empty_at: Some(n), ..Self::new() }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for StubBackend {
    async fn invoke(&self, system: &str, user: &str, model: &str, max_tokens: usize) -> Result<String> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
                model: model.to_string(),
                max_tokens,
            });
            calls.len()
        };
        if self.fail_at == Some(n) {
            return Err(DocForgeError::Backend(format!("quota exceeded at call {}", n)));
        }
        if self.empty_at == Some(n) {
            return Ok(String::new());
        }
        Ok(format!("R{}", n))
    }
}

pub mod test_helpers {
    use super::*;

    pub async fn setup_test_server() -> mockito::ServerGuard {
        mockito::Server::new_async().await
    }

    pub fn create_test_config(root: &Path) -> Config {
        let mut config = Config::new(root.join("output"));
        config.sources.upload_dir = root.join("uploads");
        config.api_keys.openai_api_key = Some("sk-test".to_string());
        config
    }

    /// `lines` lines of `width` chars each, newline included
    pub fn source_text(lines: usize, width: usize, fill: char) -> String {
        let mut line: String = std::iter::repeat(fill).take(width - 1).collect();
        line.push('\n');
        line.repeat(lines)
    }

    pub fn write_project(root: &Path, files: &[(&str, &str)]) {
        for (rel, content) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
    }

    pub fn setup_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }
}
