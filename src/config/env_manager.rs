use serde::{Deserialize, Serialize};

/// Credentials for the services docForge talks to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Key for the OpenAI-compatible completion endpoint
    pub openai_api_key: Option<String>,
    /// GitHub token used for cloning private repositories and listing repos
    pub github_token: Option<String>,
}

impl ApiKeys {
    /// Reads keys from `OPENAI_API_KEY` and `GITHUB_TOKEN`
    pub fn from_env() -> Self {
        Self {
            openai_api_key: get_env_value("OPENAI_API_KEY"),
            github_token: get_env_value("GITHUB_TOKEN"),
        }
    }

    /// Replaces keys with the environment's values where those are set
    pub fn merge_env(&mut self) {
        let env = Self::from_env();
        if env.openai_api_key.is_some() {
            self.openai_api_key = env.openai_api_key;
        }
        if env.github_token.is_some() {
            self.github_token = env.github_token;
        }
    }

    /// Prompts for the OpenAI key when it is missing (interactive CLI only)
    pub fn prompt_missing_keys(&mut self) -> crate::Result<()> {
        if self.openai_api_key.is_none() {
            self.openai_api_key = dialoguer::Password::new()
                .with_prompt("Enter OpenAI API key")
                .allow_empty_password(true)
                .interact()
                .map(|s: String| if s.is_empty() { None } else { Some(s) })
                .map_err(|e| crate::DocForgeError::Config(e.to_string()))?;
        }
        Ok(())
    }
}

/// Reads an environment variable, treating empty values as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
