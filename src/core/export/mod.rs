//! Workspace export: Markdown turned into pages of blocks.
//!
//! The [`WorkspaceClient`] trait is the seam to the hosted workspace; the
//! [`WorkspaceExporter`] owns batching, page layout and retries on top of it.

mod blocks;
mod notion;

pub use blocks::{markdown_to_blocks, Block};
pub use notion::NotionClient;

use async_trait::async_trait;
use tracing::info;

use crate::core::render::SpecSection;
use crate::core::retry::{with_retry, RetryPolicy};
use crate::error::Result;

/// Blocks accepted per create or append request
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPage {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    /// Create a page under `parent_id` holding `children` as its body.
    async fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
        children: &[Block],
    ) -> Result<CreatedPage>;

    async fn append_blocks(&self, page_id: &str, children: &[Block]) -> Result<()>;
}

pub struct WorkspaceExporter<'a> {
    client: &'a dyn WorkspaceClient,
    policy: RetryPolicy,
}

impl<'a> WorkspaceExporter<'a> {
    pub fn new(client: &'a dyn WorkspaceClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Create the page with the first batch, then append the rest batch by batch.
    async fn create_with_blocks(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
        blocks: &[Block],
    ) -> Result<CreatedPage> {
        let client = self.client;
        let (first, rest) = blocks.split_at(blocks.len().min(MAX_BLOCKS_PER_REQUEST));

        let page = with_retry("create page", self.policy, || {
            client.create_page(parent_id, title, icon, first)
        })
        .await?;

        for chunk in rest.chunks(MAX_BLOCKS_PER_REQUEST) {
            with_retry("append blocks", self.policy, || client.append_blocks(&page.id, chunk)).await?;
        }
        Ok(page)
    }

    /// Upload one Markdown document as a single page; returns its URL.
    pub async fn upload_markdown(&self, markdown: &str, parent_id: &str, title: &str) -> Result<String> {
        let blocks = markdown_to_blocks(markdown);
        info!("📤 Uploading '{}' ({} blocks)", title, blocks.len());
        let page = self.create_with_blocks(parent_id, title, None, &blocks).await?;
        Ok(page.url)
    }

    /// An empty root page with one child page per section; returns the root URL.
    pub async fn upload_hierarchy(
        &self,
        sections: &[(SpecSection, String)],
        parent_id: &str,
        root_title: &str,
    ) -> Result<String> {
        info!("📤 Uploading '{}' with {} section pages", root_title, sections.len());
        let root = self.create_with_blocks(parent_id, root_title, None, &[]).await?;

        for section in SpecSection::ALL {
            let Some((_, markdown)) = sections.iter().find(|(s, _)| *s == section) else {
                continue;
            };
            let blocks = markdown_to_blocks(markdown);
            self.create_with_blocks(&root.id, section.title(), None, &blocks).await?;
            info!("  ✓ {}", section.key());
        }
        Ok(root.url)
    }

    /// Section pages directly under the destination, each with an emoji icon.
    pub async fn upload_flat(
        &self,
        sections: &[(SpecSection, String)],
        parent_id: &str,
    ) -> Result<Vec<(SpecSection, String)>> {
        let mut urls = Vec::new();
        for section in SpecSection::ALL {
            let Some((_, markdown)) = sections.iter().find(|(s, _)| *s == section) else {
                continue;
            };
            let blocks = markdown_to_blocks(markdown);
            let page = self
                .create_with_blocks(parent_id, section.title(), Some(section.emoji()), &blocks)
                .await?;
            info!("  ✓ {} -> {}", section.key(), page.url);
            urls.push((section, page.url));
        }
        Ok(urls)
    }
}
