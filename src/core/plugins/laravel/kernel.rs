// src/core/plugins/laravel/kernel.rs
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::scan::{find_matching, list_items, split_top_level, strip_array, strip_comments, unquote};

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(middleware|middlewareGroups|routeMiddleware|middlewareAliases)\s*=\s*\[")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareGroup {
    pub name: String,
    pub middleware: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareAlias {
    pub alias: String,
    pub class: String,
}

/// Middleware wiring declared by `app/Http/Kernel.php`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelMiddleware {
    pub global: Vec<String>,
    pub groups: Vec<MiddlewareGroup>,
    /// `$routeMiddleware` or `$middlewareAliases`
    pub aliases: Vec<MiddlewareAlias>,
}

fn class_ref(expr: &str) -> String {
    let expr = expr.trim();
    unquote(expr).unwrap_or(expr).trim_start_matches('\\').to_string()
}

pub fn extract_kernel(text: &str) -> KernelMiddleware {
    let text = strip_comments(text);
    let mut kernel = KernelMiddleware::default();

    for caps in PROPERTY.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        let open = whole.end() - 1;
        let Some(close) = find_matching(&text, open) else { continue };
        let array = &text[open..=close];

        match &caps[1] {
            "middleware" => {
                kernel.global = list_items(array).iter().map(|m| class_ref(m)).collect();
            }
            "middlewareGroups" => {
                for entry in split_top_level(strip_array(array), b',') {
                    let Some((name, value)) = entry.split_once("=>") else { continue };
                    let Some(name) = unquote(name) else { continue };
                    kernel.groups.push(MiddlewareGroup {
                        name: name.to_string(),
                        middleware: list_items(value).iter().map(|m| class_ref(m)).collect(),
                    });
                }
            }
            _ => {
                for entry in split_top_level(strip_array(array), b',') {
                    let Some((alias, class)) = entry.split_once("=>") else { continue };
                    let Some(alias) = unquote(alias) else { continue };
                    kernel.aliases.push(MiddlewareAlias {
                        alias: alias.to_string(),
                        class: class_ref(class),
                    });
                }
            }
        }
    }

    kernel
}
