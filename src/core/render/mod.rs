//! Output rendering: Markdown documents and sections, and the JSON report.

mod markdown;

pub use markdown::{MarkdownRenderer, SpecSection};

use serde::Serialize;

use crate::core::documents::SourceDocument;
use crate::core::llm::Descriptions;
use crate::core::model::ProjectModel;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct DocumentDigest<'a> {
    path: &'a str,
    sha256: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    project: &'a ProjectModel,
    descriptions: &'a Descriptions,
    documents: Vec<DocumentDigest<'a>>,
}

/// Pretty-printed JSON with the model, the descriptions and a digest per scanned file.
pub fn render_json(
    model: &ProjectModel,
    descriptions: &Descriptions,
    documents: &[SourceDocument],
) -> Result<String> {
    let report = JsonReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        project: model,
        descriptions,
        documents: documents
            .iter()
            .map(|doc| DocumentDigest { path: &doc.relative_path, sha256: &doc.content_hash })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
