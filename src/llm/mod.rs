//! Completion backends.
//!
//! The pipeline only needs one operation: send a system prompt and a user
//! prompt, get text back. Anything that can do that implements
//! [`CompletionBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

pub mod openai;

pub use openai::OpenAiBackend;

/// A chat message sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Text-generation service invoked once per chunk and once for consolidation
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the model's answer; an answer without text is an empty string.
    ///
    /// Transport, auth and quota failures are reported as
    /// [`DocForgeError::Backend`](crate::DocForgeError::Backend).
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_completion_tokens: usize,
    ) -> Result<String>;
}

#[async_trait]
impl<T: CompletionBackend + ?Sized> CompletionBackend for Arc<T> {
    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_completion_tokens: usize,
    ) -> Result<String> {
        (**self).invoke(system_prompt, user_prompt, model, max_completion_tokens).await
    }
}
