// src/core/plugins/spring/components.rs
//! Entities, services, repositories and DTOs of a Spring application.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::documents::SourceDocument;
use crate::core::scan::{collapse_whitespace, find_matching, strip_comments};

static TYPE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s;}])(?:(?:public|protected|private|abstract|final|static|sealed)\s+)*(class|record|interface|enum)\s+(\w+)")
        .expect("valid regex")
});

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?:@\w+(?:\s*\([^)]*\))?\s*)*)(?:private|protected|public)\s+(?:final\s+)?([\w.]+(?:\s*<[^;=(){}]*>)?(?:\[\])?)\s+(\w+)\s*(?:=[^;]*)?;",
    )
    .expect("valid regex")
});

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)").expect("valid regex"));

static COLUMN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(?:Column|JoinColumn)\s*\([^)]*\bname\s*=\s*"([^"]+)""#).expect("valid regex")
});

static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@Table\s*\([^)]*\bname\s*=\s*"(\w+)""#).expect("valid regex")
});

static METHOD_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:public|protected|private)\s+(?:(?:static|final|synchronized|abstract)\s+)*(?:<[^>]*>\s+)?([\w.]+(?:\s*<[^;=(){}]*>)?(?:\[\])?)\s+(\w+)\s*\(")
        .expect("valid regex")
});

static INTERFACE_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:default\s+)?([\w.]+(?:\s*<[^;=(){}]*>)?(?:\[\])?)\s+(\w+)\s*\(")
        .expect("valid regex")
});

static REPOSITORY_PARENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"extends\s+(?:JpaRepository|CrudRepository|PagingAndSortingRepository|ListCrudRepository|ListPagingAndSortingRepository|MongoRepository)\s*<\s*([\w.]+)\s*,\s*([\w.]+)\s*>")
        .expect("valid regex")
});

/// Kind and name of the first type declared in a Java file
pub fn java_type(text: &str) -> Option<(String, String)> {
    let caps = TYPE_DECL.captures(text)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Byte offset of the first type declaration's keyword
pub fn declaration_start(text: &str) -> Option<usize> {
    TYPE_DECL.captures(text).and_then(|caps| caps.get(1)).map(|m| m.start())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityField {
    pub name: String,
    pub field_type: String,
    pub annotations: Vec<String>,
    /// Explicit `@Column(name = ..)` / `@JoinColumn(name = ..)`
    pub column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JpaEntity {
    pub name: String,
    pub table: String,
    pub file: String,
    pub fields: Vec<EntityField>,
}

fn fields(text: &str) -> Vec<EntityField> {
    FIELD
        .captures_iter(text)
        .map(|caps| {
            let annotations_text = caps.get(1).map_or("", |m| m.as_str());
            EntityField {
                name: caps[3].to_string(),
                field_type: collapse_whitespace(&caps[2]),
                annotations: ANNOTATION
                    .captures_iter(annotations_text)
                    .map(|a| a[1].to_string())
                    .collect(),
                column: COLUMN_NAME.captures(annotations_text).map(|c| c[1].to_string()),
            }
        })
        .collect()
}

pub fn extract_entity(doc: &SourceDocument) -> Option<JpaEntity> {
    let text = strip_comments(&doc.content);
    if !text.contains("@Entity") && !text.contains("@Table") {
        return None;
    }
    let (_, name) = java_type(&text)?;

    Some(JpaEntity {
        table: TABLE_NAME
            .captures(&text)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| name.to_lowercase()),
        name,
        file: doc.relative_path.clone(),
        fields: fields(&text),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaMethod {
    pub name: String,
    pub return_type: String,
    pub parameters: Option<String>,
}

fn parameters_at(text: &str, open: usize) -> Option<(String, usize)> {
    let close = find_matching(text, open)?;
    let params = collapse_whitespace(&text[open + 1..close]);
    Some((params, close))
}

fn methods(text: &str, class_name: &str) -> Vec<JavaMethod> {
    METHOD_DECL
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps[2].to_string();
            if name == class_name {
                return None;
            }
            let open = caps.get(0)?.end() - 1;
            let (params, _) = parameters_at(text, open)?;
            Some(JavaMethod {
                name,
                return_type: collapse_whitespace(&caps[1]),
                parameters: (!params.is_empty()).then_some(params),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpringService {
    pub name: String,
    pub file: String,
    pub methods: Vec<JavaMethod>,
}

pub fn extract_service(doc: &SourceDocument) -> Option<SpringService> {
    let text = strip_comments(&doc.content);
    if !text.contains("@Service") {
        return None;
    }
    let (_, name) = java_type(&text)?;
    Some(SpringService {
        methods: methods(&text, &name),
        name,
        file: doc.relative_path.clone(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub file: String,
    pub entity: String,
    pub id_type: String,
    pub custom_methods: Vec<JavaMethod>,
}

pub fn extract_repository(doc: &SourceDocument) -> Option<Repository> {
    let text = strip_comments(&doc.content);
    let parent = REPOSITORY_PARENT.captures(&text);
    if parent.is_none() && !text.contains("@Repository") {
        return None;
    }
    let (kind, name) = java_type(&text)?;
    if kind != "interface" {
        return None;
    }

    let body_start = text.find('{').map_or(text.len(), |i| i + 1);
    let body = &text[body_start..];
    let custom_methods = INTERFACE_METHOD
        .captures_iter(body)
        .filter_map(|caps| {
            let open = caps.get(0)?.end() - 1;
            let (params, close) = parameters_at(body, open)?;
            let after = body[close + 1..].trim_start();
            if !after.starts_with(';') && !after.starts_with("throws") {
                return None;
            }
            Some(JavaMethod {
                name: caps[2].to_string(),
                return_type: collapse_whitespace(&caps[1]),
                parameters: (!params.is_empty()).then_some(params),
            })
        })
        .collect();

    let (entity, id_type) = parent
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string()));

    Some(Repository { name, file: doc.relative_path.clone(), entity, id_type, custom_methods })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtoField {
    pub name: String,
    pub field_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dto {
    pub name: String,
    pub file: String,
    /// `class` or `record`
    pub kind: String,
    pub fields: Vec<DtoField>,
}

/// Split record components on commas outside parentheses and generics.
fn record_components(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '<' | '[' => depth += 1,
            ')' | '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// `@NotBlank String title` -> (`String`, `title`)
fn record_component(component: &str) -> Option<DtoField> {
    let mut rest = component.trim();
    while let Some(stripped) = rest.strip_prefix('@') {
        let name_len = stripped
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(stripped.len());
        rest = stripped[name_len..].trim_start();
        if rest.starts_with('(') {
            let close = find_matching(rest, 0)?;
            rest = rest[close + 1..].trim_start();
        }
    }
    let (field_type, name) = rest.rsplit_once(char::is_whitespace)?;
    Some(DtoField { name: name.trim().to_string(), field_type: collapse_whitespace(field_type) })
}

/// Whether the path marks a transfer object package
pub fn is_dto_path(relative_path: &str) -> bool {
    let lower = relative_path.to_lowercase();
    ["dto", "request", "response"].iter().any(|k| lower.contains(k))
}

pub fn extract_dto(doc: &SourceDocument) -> Option<Dto> {
    let text = strip_comments(&doc.content);
    let caps = TYPE_DECL.captures(&text)?;
    let kind = caps[1].to_string();
    let name = caps[2].to_string();

    let fields = match kind.as_str() {
        "record" => {
            let after = caps.get(0)?.end();
            let open = after + text[after..].find('(')?;
            let close = find_matching(&text, open)?;
            record_components(&text[open + 1..close])
                .into_iter()
                .filter_map(record_component)
                .collect()
        }
        "class" => fields(&text)
            .into_iter()
            .map(|f| DtoField { name: f.name, field_type: f.field_type })
            .collect(),
        _ => return None,
    };

    Some(Dto { name, file: doc.relative_path.clone(), kind, fields })
}
