use serde_json::{json, Value};

/// Longest text a single rich-text run may carry
pub const MAX_RICH_TEXT_LEN: usize = 2000;

/// One workspace page block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading1(String),
    Heading2(String),
    Heading3(String),
    Bullet(String),
    Paragraph(String),
}

impl Block {
    fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.is_empty() {
            return None;
        }
        let block = if let Some(text) = line.strip_prefix("### ") {
            Block::Heading3(text.to_string())
        } else if let Some(text) = line.strip_prefix("## ") {
            Block::Heading2(text.to_string())
        } else if let Some(text) = line.strip_prefix("# ") {
            Block::Heading1(text.to_string())
        } else if let Some(text) = line.strip_prefix("- ") {
            Block::Bullet(text.to_string())
        } else {
            Block::Paragraph(line.to_string())
        };
        Some(block)
    }

    fn parts(&self) -> (&'static str, &str) {
        match self {
            Block::Heading1(text) => ("heading_1", text),
            Block::Heading2(text) => ("heading_2", text),
            Block::Heading3(text) => ("heading_3", text),
            Block::Bullet(text) => ("bulleted_list_item", text),
            Block::Paragraph(text) => ("paragraph", text),
        }
    }

    /// The block in the Notion API's JSON shape.
    pub fn to_json(&self) -> Value {
        let (kind, text) = self.parts();
        let mut block = json!({ "object": "block", "type": kind });
        block[kind] = json!({ "rich_text": rich_text(text) });
        block
    }
}

/// Markdown line prefixes to blocks; blank lines produce nothing.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    markdown.lines().filter_map(Block::from_line).collect()
}

/// Text runs of at most [`MAX_RICH_TEXT_LEN`] characters each.
pub fn rich_text(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_RICH_TEXT_LEN)
        .map(|chunk| json!({ "type": "text", "text": { "content": chunk.iter().collect::<String>() } }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_prefixes() {
        let blocks = markdown_to_blocks("# Title\n\n## Sub\n### Leaf\n- item\nplain text\n#### deep\n  - nested");
        assert_eq!(
            blocks,
            vec![
                Block::Heading1("Title".into()),
                Block::Heading2("Sub".into()),
                Block::Heading3("Leaf".into()),
                Block::Bullet("item".into()),
                Block::Paragraph("plain text".into()),
                Block::Paragraph("#### deep".into()),
                Block::Paragraph("  - nested".into()),
            ]
        );
    }

    #[test]
    fn test_long_text_is_split_into_runs() {
        let text = "é".repeat(4500);
        let runs = rich_text(&text);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0]["text"]["content"].as_str().unwrap().chars().count(), 2000);
        assert_eq!(runs[2]["text"]["content"].as_str().unwrap().chars().count(), 500);
    }

    #[test]
    fn test_block_json_shape() {
        let json = Block::Bullet("x".into()).to_json();
        assert_eq!(json["type"], "bulleted_list_item");
        assert_eq!(json["bulleted_list_item"]["rich_text"][0]["text"]["content"], "x");
    }
}
