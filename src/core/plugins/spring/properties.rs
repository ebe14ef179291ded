// src/core/plugins/spring/properties.rs
//! `application*.properties` and `application*.yml` with secrets masked.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::documents::SourceDocument;

static SENSITIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password|secret|key|token").expect("valid regex"));

static CONFIG_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^application(?:-[\w.-]+)?\.(properties|ya?ml)$").expect("valid regex")
});

pub const MASK: &str = "***";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ConfigContent {
    Properties { entries: Vec<Property> },
    Yaml { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub file: String,
    #[serde(flatten)]
    pub content: ConfigContent,
}

pub fn is_config_file(doc: &SourceDocument) -> bool {
    CONFIG_FILE.is_match(doc.file_name())
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE.is_match(key)
}

fn parse_properties(text: &str) -> Vec<Property> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            let key = key.trim().to_string();
            let value = if is_sensitive(&key) { MASK.to_string() } else { value.trim().to_string() };
            Some(Property { key, value })
        })
        .collect()
}

/// Mask values line by line; only the part before the colon is checked.
fn mask_yaml(text: &str) -> String {
    text.lines()
        .map(|line| match line.split_once(':') {
            Some((key_part, value))
                if is_sensitive(key_part) && !key_part.trim_start().starts_with('#') && !value.trim().is_empty() =>
            {
                format!("{}: {}", key_part, MASK)
            }
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn extract_config(doc: &SourceDocument) -> Option<ConfigFile> {
    let caps = CONFIG_FILE.captures(doc.file_name())?;
    let content = match &caps[1] {
        "properties" => ConfigContent::Properties { entries: parse_properties(&doc.content) },
        _ => ConfigContent::Yaml { text: mask_yaml(&doc.content) },
    };
    Some(ConfigFile { file: doc.relative_path.clone(), content })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_are_masked() {
        let doc = SourceDocument::from_text(
            "src/main/resources/application.properties",
            "# datasource\nspring.datasource.url=jdbc:postgresql://localhost/todo\nspring.datasource.password=hunter2\njwt.secret = abc\nserver.port: 8080\n",
        );
        let config = extract_config(&doc).unwrap();
        let ConfigContent::Properties { entries } = config.content else {
            panic!("expected properties");
        };
        let pairs: Vec<_> = entries.iter().map(|p| (p.key.as_str(), p.value.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("spring.datasource.url", "jdbc:postgresql://localhost/todo"),
                ("spring.datasource.password", "***"),
                ("jwt.secret", "***"),
                ("server.port", "8080"),
            ]
        );
    }

    #[test]
    fn test_yaml_is_masked_by_key() {
        let doc = SourceDocument::from_text(
            "src/main/resources/application-dev.yml",
            "spring:\n  datasource:\n    username: todo\n    password: hunter2\napi:\n  token: abc:def\n",
        );
        let config = extract_config(&doc).unwrap();
        let ConfigContent::Yaml { text } = config.content else {
            panic!("expected yaml");
        };
        assert_eq!(
            text,
            "spring:\n  datasource:\n    username: todo\n    password: ***\napi:\n  token: ***"
        );
    }

    #[test]
    fn test_only_application_files_match() {
        assert!(is_config_file(&SourceDocument::from_text("application.yaml", "")));
        assert!(is_config_file(&SourceDocument::from_text("a/application-prod.properties", "")));
        assert!(!is_config_file(&SourceDocument::from_text("logback.yml", "")));
        assert!(extract_config(&SourceDocument::from_text("pom.yml", "")).is_none());
    }
}
