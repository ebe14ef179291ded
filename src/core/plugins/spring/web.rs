// src/core/plugins/spring/web.rs
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::components::{declaration_start, java_type};
use crate::core::documents::SourceDocument;
use crate::core::routes::HttpMethod;
use crate::core::scan::{find_matching, split_top_level, string_literals, strip_comments};

static MAPPING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(Get|Post|Put|Delete|Patch|Request)Mapping\b").expect("valid regex")
});

static HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:public|private|protected)\s+(?:(?:static|final|synchronized)\s+)*[\w.<>\[\],?\s]+?\s+(\w+)\s*\(")
        .expect("valid regex")
});

static REQUEST_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RequestMethod\.(\w+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMapping {
    pub method: HttpMethod,
    pub path: String,
    pub handler: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpringController {
    pub name: String,
    pub file: String,
    pub base_path: String,
    pub endpoints: Vec<EndpointMapping>,
}

/// One row of the flat endpoint table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestEndpoint {
    pub method: HttpMethod,
    pub path: String,
    pub controller: String,
    pub handler: String,
}

/// Path and request methods of one mapping annotation's arguments.
fn mapping_attributes(args: &str) -> (String, Vec<HttpMethod>) {
    let mut path = None;
    let mut methods = Vec::new();

    for item in split_top_level(args, b',') {
        match item.split_once('=') {
            Some((key, value)) if !key.contains('"') => match key.trim() {
                "value" | "path" => {
                    if path.is_none() {
                        path = string_literals(value).into_iter().next();
                    }
                }
                "method" => methods.extend(
                    REQUEST_METHOD
                        .captures_iter(value)
                        .filter_map(|c| HttpMethod::from_name(&c[1])),
                ),
                _ => {}
            },
            _ => {
                if path.is_none() {
                    path = string_literals(item).into_iter().next();
                }
            }
        }
    }

    (path.unwrap_or_default(), methods)
}

/// Join a class-level and a method-level path with one slash between them.
fn join_path(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')),
    }
}

/// The annotation's argument text, and the offset just past it.
fn annotation_args(text: &str, name_end: usize) -> (String, usize) {
    let rest = &text[name_end..];
    let trimmed = rest.trim_start();
    if !trimmed.starts_with('(') {
        return (String::new(), name_end);
    }
    let open = name_end + (rest.len() - trimmed.len());
    match find_matching(text, open) {
        Some(close) => (text[open + 1..close].to_string(), close + 1),
        None => (String::new(), name_end),
    }
}

pub fn extract_controller(doc: &SourceDocument) -> Option<SpringController> {
    let text = strip_comments(&doc.content);
    if !text.contains("@RestController") && !text.contains("@Controller") {
        return None;
    }
    let (_, name) = java_type(&text)?;
    let class_start = declaration_start(&text).unwrap_or(0);

    let mappings: Vec<_> = MAPPING
        .captures_iter(&text)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some((whole.start(), whole.end(), c[1].to_string()))
        })
        .collect();

    let mut base_path = String::new();
    let mut endpoints = Vec::new();

    for (index, (start, end, kind)) in mappings.iter().enumerate() {
        let (args, after) = annotation_args(&text, *end);
        let (path, methods) = mapping_attributes(&args);

        if *start < class_start {
            if kind == "Request" {
                base_path = path;
            }
            continue;
        }

        let methods = match kind.as_str() {
            "Request" if methods.is_empty() => vec![HttpMethod::Get],
            "Request" => methods,
            verb => HttpMethod::from_name(verb).into_iter().collect(),
        };

        let next = mappings.get(index + 1).map_or(text.len(), |(s, _, _)| *s);
        let handler = HANDLER
            .captures(&text[after..next.max(after)])
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "unknown".to_string());

        for method in methods {
            endpoints.push(EndpointMapping {
                method,
                path: join_path(&base_path, &path),
                handler: handler.clone(),
            });
        }
    }

    Some(SpringController { name, file: doc.relative_path.clone(), base_path, endpoints })
}

/// Every controller endpoint, sorted by path then method.
pub fn rest_endpoints(controllers: &[SpringController]) -> Vec<RestEndpoint> {
    let mut endpoints: Vec<RestEndpoint> = controllers
        .iter()
        .flat_map(|controller| {
            controller.endpoints.iter().map(|e| RestEndpoint {
                method: e.method,
                path: e.path.clone(),
                controller: controller.name.clone(),
                handler: e.handler.clone(),
            })
        })
        .collect();
    endpoints.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then_with(|| a.method.as_str().cmp(b.method.as_str()))
    });
    endpoints
}
