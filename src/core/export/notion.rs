use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::blocks::Block;
use super::{CreatedPage, WorkspaceClient};
use crate::error::{Result, SpecError};

const NOTION_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion REST API client
pub struct NotionClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            base_url: NOTION_URL.to_string(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SpecError::Export(format!("Notion API error {}: {}", status, error_text)));
        }
        Ok(response.json().await?)
    }
}

fn children_json(children: &[Block]) -> Vec<Value> {
    children.iter().map(Block::to_json).collect()
}

/// Request body for `POST /v1/pages`.
pub fn page_payload(parent_id: &str, title: &str, icon: Option<&str>, children: &[Block]) -> Value {
    let mut payload = json!({
        "parent": { "page_id": parent_id },
        "properties": {
            "title": [{ "text": { "content": title } }]
        },
        "children": children_json(children),
    });
    if let Some(emoji) = icon {
        payload["icon"] = json!({ "type": "emoji", "emoji": emoji });
    }
    payload
}

#[async_trait]
impl WorkspaceClient for NotionClient {
    async fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
        children: &[Block],
    ) -> Result<CreatedPage> {
        let payload = page_payload(parent_id, title, icon, children);
        let body = self
            .send(self.client.post(format!("{}/v1/pages", self.base_url)).json(&payload))
            .await?;

        let id = body["id"]
            .as_str()
            .ok_or_else(|| SpecError::Export("page response carries no id".to_string()))?;
        debug!("Created page {} ({} blocks)", id, children.len());
        Ok(CreatedPage {
            id: id.to_string(),
            url: body["url"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn append_blocks(&self, page_id: &str, children: &[Block]) -> Result<()> {
        let payload = json!({ "children": children_json(children) });
        self.send(
            self.client
                .patch(format!("{}/v1/blocks/{}/children", self.base_url, page_id))
                .json(&payload),
        )
        .await?;
        debug!("Appended {} blocks to {}", children.len(), page_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_payload() {
        let payload = page_payload("parent-1", "Spec", Some("🔗"), &[Block::Heading1("API".into())]);
        assert_eq!(payload["parent"]["page_id"], "parent-1");
        assert_eq!(payload["properties"]["title"][0]["text"]["content"], "Spec");
        assert_eq!(payload["icon"]["emoji"], "🔗");
        assert_eq!(payload["children"][0]["type"], "heading_1");

        let bare = page_payload("parent-1", "Spec", None, &[]);
        assert!(bare.get("icon").is_none());
        assert!(bare["children"].as_array().unwrap().is_empty());
    }
}
