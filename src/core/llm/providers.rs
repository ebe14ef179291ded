use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::generator::TextGenerator;
use crate::config::LlmConfig;
use crate::error::{Result, SpecError};

const ANTHROPIC_URL: &str = "https://api.anthropic.com";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_URL: &str = "https://api.openai.com";

/// Factory: pick a backend by `config.provider`, reading credentials from the environment.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn TextGenerator>> {
    create_generator_with(config, |key| std::env::var(key).ok())
}

pub fn create_generator_with<F>(config: &LlmConfig, env: F) -> Result<Box<dyn TextGenerator>>
where
    F: Fn(&str) -> Option<String>,
{
    if !config.enabled {
        return Err(SpecError::Config("text generation is disabled".to_string()));
    }

    let api_key = |var: &str| {
        config
            .api_key
            .clone()
            .or_else(|| env(var))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SpecError::Config(format!("{} is not set", var)))
    };

    match config.provider.to_lowercase().as_str() {
        "claude" | "anthropic" => Ok(Box::new(AnthropicProvider::new(config, api_key("ANTHROPIC_API_KEY")?))),
        "gemini" => Ok(Box::new(GeminiProvider::new(config, api_key("GEMINI_API_KEY")?))),
        "openai" => Ok(Box::new(OpenAiProvider::new(config, api_key("OPENAI_API_KEY")?))),
        "claude-code" => {
            let cli_path = env("CLAUDE_CLI_PATH").unwrap_or_else(|| "claude".to_string());
            Ok(Box::new(ClaudeCliProvider::new(cli_path)?))
        }
        other => Err(SpecError::Config(format!("Unsupported text generation backend: {}", other))),
    }
}

/// Turn a non-success HTTP response into a `Generation` error.
async fn check_status(backend: &str, response: reqwest::Response) -> Result<Value> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(SpecError::Generation(format!("{} API error {}: {}", backend, status, error_text)));
    }
    Ok(response.json().await?)
}

fn missing_text(backend: &str, body: &Value) -> SpecError {
    SpecError::MalformedResponse {
        reason: format!("no text in {} response", backend),
        snippet: body.to_string().chars().take(500).collect(),
    }
}

/// Anthropic Messages API
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone().unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string()),
            base_url: config.base_url.clone().unwrap_or_else(|| ANTHROPIC_URL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(8000),
        }
    }

    fn extract_text(body: &Value) -> Result<String> {
        body["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find_map(|b| b["text"].as_str()))
            .map(|text| text.trim().to_string())
            .ok_or_else(|| missing_text("Anthropic", body))
    }
}

#[async_trait]
impl TextGenerator for AnthropicProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await?;

        let body = check_status("Anthropic", response).await?;
        Self::extract_text(&body)
    }

    fn backend_name(&self) -> &str {
        "claude"
    }
}

/// Google Generative Language API
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone().unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
            base_url: config.base_url.clone().unwrap_or_else(|| GEMINI_URL.to_string()),
        }
    }

    fn extract_text(body: &Value) -> Result<String> {
        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| missing_text("Gemini", body))?;
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if text.trim().is_empty() {
            return Err(missing_text("Gemini", body));
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let body = check_status("Gemini", response).await?;
        Self::extract_text(&body)
    }

    fn backend_name(&self) -> &str {
        "gemini"
    }
}

/// OpenAI Chat Completions
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: config.base_url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(2000),
            temperature: config.temperature.unwrap_or(0.3),
        }
    }

    fn extract_text(body: &Value) -> Result<String> {
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| missing_text("OpenAI", body))
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You write concise technical documentation for application codebases."
                },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let body = check_status("OpenAI", response).await?;
        Self::extract_text(&body)
    }

    fn backend_name(&self) -> &str {
        "openai"
    }
}

/// Local `claude` CLI in print mode; the prompt goes in on stdin
pub struct ClaudeCliProvider {
    cli_path: String,
}

impl ClaudeCliProvider {
    pub fn new(cli_path: String) -> Result<Self> {
        // A bare command name is resolved through PATH at call time
        if cli_path.contains('/') && !Path::new(&cli_path).exists() {
            return Err(SpecError::Config(format!("Claude CLI not found: {}", cli_path)));
        }
        Ok(Self { cli_path })
    }
}

#[async_trait]
impl TextGenerator for ClaudeCliProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.cli_path)
            .args(["--print", "--output-format", "text"])
            // the CLI has its own login; a stray API key would override it
            .env_remove("ANTHROPIC_API_KEY")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpecError::Generation(format!("failed to start {}: {}", self.cli_path, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpecError::Generation(format!(
                "Claude CLI exited with {}: stdout={} stderr={}",
                output.status,
                stdout.trim().chars().take(500).collect::<String>(),
                stderr.trim().chars().take(500).collect::<String>(),
            )));
        }

        Ok(stdout.trim().to_string())
    }

    fn backend_name(&self) -> &str {
        "claude-code"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig { provider: provider.to_string(), ..LlmConfig::default() }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_unknown_backend_is_a_config_error() {
        let err = create_generator_with(&config("llama"), no_env).err().unwrap();
        assert!(matches!(err, SpecError::Config(msg) if msg.contains("llama")));
    }

    #[test]
    fn test_missing_key_is_a_config_error() {
        let err = create_generator_with(&config("gemini"), no_env).err().unwrap();
        assert!(matches!(err, SpecError::Config(msg) if msg.contains("GEMINI_API_KEY")));
    }

    #[test]
    fn test_backends_pick_up_env_keys() {
        let env = |key: &str| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string());
        let generator = create_generator_with(&config("OpenAI"), env).unwrap();
        assert_eq!(generator.backend_name(), "openai");

        let mut with_key = config("claude");
        with_key.api_key = Some("from-config".to_string());
        assert_eq!(create_generator_with(&with_key, no_env).unwrap().backend_name(), "claude");
    }

    #[test]
    fn test_disabled_generation() {
        let mut disabled = config("claude-code");
        disabled.enabled = false;
        assert!(create_generator_with(&disabled, no_env).is_err());
    }

    #[test]
    fn test_cli_path_must_exist_when_absolute() {
        let env = |key: &str| (key == "CLAUDE_CLI_PATH").then(|| "/no/such/dir/claude".to_string());
        assert!(matches!(
            create_generator_with(&config("claude-code"), env).err(),
            Some(SpecError::Config(_))
        ));
        assert_eq!(
            create_generator_with(&config("claude-code"), no_env).unwrap().backend_name(),
            "claude-code"
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let anthropic = json!({"content": [{"type": "text", "text": " Manages todos. "}]});
        assert_eq!(AnthropicProvider::extract_text(&anthropic).unwrap(), "Manages todos.");

        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]});
        assert_eq!(GeminiProvider::extract_text(&gemini).unwrap(), "ab");

        let openai = json!({"choices": [{"message": {"content": "ok"}}]});
        assert_eq!(OpenAiProvider::extract_text(&openai).unwrap(), "ok");

        assert!(matches!(
            OpenAiProvider::extract_text(&json!({"error": "x"})),
            Err(SpecError::MalformedResponse { .. })
        ));
    }
}
