use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{Result, SpecError};

/// Characters of a bad response kept in the error
const SNIPPET_LEN: usize = 500;

/// A text-generation backend: prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable backend name for progress logs
    fn backend_name(&self) -> &str;

    /// Generate, then parse the answer as JSON.
    async fn generate_structured(&self, prompt: &str) -> Result<serde_json::Value> {
        let text = self.generate(prompt).await?;
        parse_structured(&text)
    }
}

/// The body of a fenced block, or the text itself when unfenced.
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        let end = body.rfind("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    if let Some(rest) = text.strip_prefix("```") {
        // drop the info string line, then the closing fence; a one-line
        // fence has no info string
        let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
        let end = body.rfind("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    text
}

/// Parse a JSON answer into `T`, tolerating a surrounding code fence.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_fences(text);
    serde_json::from_str(body).map_err(|e| SpecError::MalformedResponse {
        reason: e.to_string(),
        snippet: body.chars().take(SNIPPET_LEN).collect(),
    })
}
