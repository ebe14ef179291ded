// src/core/plugins/laravel/graphql.rs
//! GraphQL schema scanning (Lighthouse-style projects).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::scan::{collapse_whitespace, find_matching};

static ROOT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:extend\s+)?type\s+(Query|Mutation)\b[^{]*\{").expect("valid regex")
});

static ENDPOINT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'uri'\s*=>\s*['"]([^'"]+)['"]"#).expect("valid regex"));

static ENDPOINT_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'route'\s*=>\s*['"]([^'"]+)['"]"#).expect("valid regex"));

pub const DEFAULT_ENDPOINT: &str = "/graphql";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlSchema {
    /// Path relative to the `graphql/` directory when there is one
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlOperation {
    pub name: String,
    pub args: String,
    pub return_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlOperations {
    pub queries: Vec<GraphqlOperation>,
    pub mutations: Vec<GraphqlOperation>,
}

impl GraphqlOperations {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.mutations.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlResolvers {
    pub queries: Vec<String>,
    pub mutations: Vec<String>,
}

/// Drop `#` comments and `"..."` / `"""..."""` descriptions.
fn strip_sdl_noise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("\"\"\"") {
            let end = rest[3..].find("\"\"\"").map_or(rest.len(), |i| i + 6);
            rest = &rest[end..];
            out.push(' ');
        } else if c == '"' {
            let end = rest[1..].find(['"', '\n']).map_or(rest.len(), |i| i + 2);
            rest = &rest[end.min(rest.len())..];
            out.push(' ');
        } else if c == '#' {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// Fields of one root type body: `name(args): Type @directive(..)`.
fn fields(body: &str) -> Vec<GraphqlOperation> {
    let bytes = body.as_bytes();
    let mut ops = Vec::new();
    let mut i = 0;

    let skip_ws = |mut i: usize| {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        i
    };
    let ident = |i: usize| {
        bytes[i..].iter().take_while(|b| b.is_ascii_alphanumeric() || **b == b'_').count()
    };

    while i < bytes.len() {
        i = skip_ws(i);
        let len = ident(i);
        if len == 0 {
            i += 1;
            continue;
        }
        let name = &body[i..i + len];
        i = skip_ws(i + len);

        let mut args = String::new();
        if bytes.get(i) == Some(&b'(') {
            let Some(close) = find_matching(body, i) else { break };
            args = collapse_whitespace(&body[i + 1..close]);
            i = skip_ws(close + 1);
        }
        if bytes.get(i) != Some(&b':') {
            continue;
        }
        i = skip_ws(i + 1);
        let type_len = bytes[i..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || matches!(**b, b'_' | b'[' | b']' | b'!'))
            .count();
        let return_type = body[i..i + type_len].to_string();
        i += type_len;

        // directives, possibly with multi-line arguments
        loop {
            let next = skip_ws(i);
            if bytes.get(next) != Some(&b'@') {
                break;
            }
            i = next + 1;
            i += ident(i);
            let after = skip_ws(i);
            if bytes.get(after) == Some(&b'(') {
                match find_matching(body, after) {
                    Some(close) => i = close + 1,
                    None => return ops,
                }
            }
        }

        ops.push(GraphqlOperation { name: name.to_string(), args, return_type });
    }

    ops
}

/// Query and Mutation fields from `type` and `extend type` blocks.
pub fn extract_operations(content: &str) -> GraphqlOperations {
    let cleaned = strip_sdl_noise(content);
    let mut ops = GraphqlOperations::default();

    for caps in ROOT_TYPE.captures_iter(&cleaned) {
        let Some(whole) = caps.get(0) else { continue };
        let open = whole.end() - 1;
        let Some(close) = find_matching(&cleaned, open) else { continue };
        let found = fields(&cleaned[open + 1..close]);
        match &caps[1] {
            "Query" => ops.queries.extend(found),
            _ => ops.mutations.extend(found),
        }
    }

    ops
}

/// Endpoint from `config/lighthouse.php`: `'uri'` first, then a string `'route'`.
pub fn extract_endpoint(lighthouse_config: Option<&str>) -> String {
    lighthouse_config
        .and_then(|text| {
            ENDPOINT_URI
                .captures(text)
                .or_else(|| ENDPOINT_ROUTE.captures(text))
                .map(|caps| caps[1].to_string())
        })
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}
