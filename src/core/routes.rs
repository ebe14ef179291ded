// src/core/routes.rs
//! Flattens a Laravel route file into fully-qualified route declarations.
//!
//! The file is split into top-level statements. Each statement is parsed as a
//! fluent chain on `Route::`; attribute calls (`middleware`, `prefix`, `name`,
//! `controller`) accumulate until a verb, resource or `group` call terminates
//! the chain. Group closures are descended into recursively, so prefixes,
//! middleware, name prefixes and controllers inherit through any depth.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scan::{
    block_bodies, closure_body, collapse_whitespace, list_items, parse_call_chain, split_statements,
    split_top_level, strip_array, strip_comments, unquote, MethodCall,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Any,
}

impl HttpMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "options" => Some(HttpMethod::Options),
            "any" => Some(HttpMethod::Any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flattened route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub http_method: HttpMethod,
    pub uri_pattern: String,
    pub action_reference: String,
    /// Group middleware first, then the route's own, duplicates kept
    pub middleware: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Join a group prefix and a URI with exactly one slash at the boundary.
///
/// An empty prefix returns the URI unchanged.
pub fn join_uri(prefix: &str, uri: &str) -> String {
    if prefix.is_empty() {
        return uri.to_string();
    }
    let head = prefix.trim_end_matches('/');
    let tail = uri.trim_start_matches('/');
    match (head.is_empty(), tail.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => head.to_string(),
        _ => format!("{}/{}", head, tail),
    }
}

/// Inherited state of the enclosing groups
#[derive(Debug, Clone, Default)]
struct GroupContext {
    prefix: String,
    middleware: Vec<String>,
    name_prefix: String,
    controller: Option<String>,
}

/// Attributes declared on one chain (fluently or through a group array)
#[derive(Debug, Default)]
struct Attributes {
    prefix: Option<String>,
    middleware: Vec<String>,
    name: Option<String>,
    controller: Option<String>,
}

impl Attributes {
    fn absorb(&mut self, call: &MethodCall<'_>) {
        match call.name {
            "middleware" => self.middleware.extend(middleware_args(call)),
            "prefix" => self.prefix = Some(scalar(call.args)),
            "name" | "as" => {
                let name = scalar(call.args);
                self.name = Some(match self.name.take() {
                    Some(existing) => existing + &name,
                    None => name,
                });
            }
            "controller" => self.controller = Some(class_name(call.args)),
            _ => {}
        }
    }

    /// `['prefix' => 'admin', 'middleware' => ['auth'], 'as' => 'admin.']`
    fn from_array(array: &str) -> Self {
        let mut attrs = Self::default();
        for entry in split_top_level(strip_array(array), b',') {
            let Some((key, value)) = entry.split_once("=>") else {
                continue;
            };
            match unquote(key).unwrap_or(key.trim()) {
                "prefix" => attrs.prefix = Some(scalar(value)),
                "middleware" => attrs.middleware.extend(list_items(value)),
                "as" | "name" => attrs.name = Some(scalar(value)),
                "controller" => attrs.controller = Some(class_name(value)),
                _ => {}
            }
        }
        attrs
    }
}

impl GroupContext {
    fn nest(&self, attrs: Attributes) -> GroupContext {
        let mut middleware = self.middleware.clone();
        middleware.extend(attrs.middleware);
        GroupContext {
            prefix: match attrs.prefix {
                Some(prefix) if !prefix.is_empty() => join_uri(&self.prefix, &prefix),
                _ => self.prefix.clone(),
            },
            middleware,
            name_prefix: format!("{}{}", self.name_prefix, attrs.name.unwrap_or_default()),
            controller: attrs.controller.or_else(|| self.controller.clone()),
        }
    }
}

fn scalar(expr: &str) -> String {
    let expr = expr.trim();
    unquote(expr).unwrap_or(expr).to_string()
}

fn class_name(expr: &str) -> String {
    expr.trim().trim_end_matches("::class").trim().to_string()
}

fn middleware_args(call: &MethodCall<'_>) -> Vec<String> {
    call.arguments().into_iter().flat_map(list_items).collect()
}

/// Resolve an action expression to `Class@method` where possible.
pub fn normalize_action(raw: &str, controller: Option<&str>) -> String {
    let raw = raw.trim();

    if raw.starts_with('[') {
        let items = split_top_level(strip_array(raw), b',');
        if let [class, method] = items.as_slice() {
            if class.ends_with("::class") {
                if let Some(method) = unquote(method) {
                    return format!("{}@{}", class_name(class), method);
                }
            }
        }
    }

    if raw.ends_with("::class") && !raw.contains(' ') {
        return format!("{}@__invoke", class_name(raw));
    }

    if let Some(text) = unquote(raw) {
        return match controller {
            Some(controller) if !text.contains('@') => format!("{}@{}", controller, text),
            _ if text.contains('@') => text.to_string(),
            _ => collapse_whitespace(raw),
        };
    }

    collapse_whitespace(raw)
}

const VERBS: &[&str] = &["get", "post", "put", "patch", "delete", "options", "any"];

const RESOURCE_ACTIONS: &[(&str, HttpMethod, &str)] = &[
    ("index", HttpMethod::Get, ""),
    ("create", HttpMethod::Get, "/create"),
    ("store", HttpMethod::Post, ""),
    ("show", HttpMethod::Get, "/{}"),
    ("edit", HttpMethod::Get, "/{}/edit"),
    ("update", HttpMethod::Put, "/{}"),
    ("destroy", HttpMethod::Delete, "/{}"),
];

fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{}y", stem)
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        word.to_string()
    }
}

/// Route-table reconstruction over one route file
pub struct RouteTableReconstructor;

impl RouteTableReconstructor {
    /// Flat route list in declaration order; an empty list when nothing matches.
    pub fn reconstruct(text: &str) -> Vec<RouteDeclaration> {
        let cleaned = strip_comments(text);
        let body = cleaned.trim_start().trim_start_matches("<?php");

        let mut routes = Vec::new();
        Self::walk(body, &GroupContext::default(), &mut routes);
        routes
    }

    fn walk(body: &str, ctx: &GroupContext, routes: &mut Vec<RouteDeclaration>) {
        for statement in split_statements(body) {
            match parse_call_chain(statement) {
                Some(chain) if chain.receiver == "Route" || chain.receiver == "$router" => {
                    Self::statement(&chain.calls, ctx, routes)
                }
                Some(_) => {}
                // if/foreach/try blocks keep the enclosing group context
                None => {
                    for block in block_bodies(statement) {
                        Self::walk(block, ctx, routes);
                    }
                }
            }
        }
    }

    fn statement(calls: &[MethodCall<'_>], ctx: &GroupContext, routes: &mut Vec<RouteDeclaration>) {
        let Some(terminal) = calls.iter().position(|call| {
            VERBS.contains(&call.name)
                || matches!(call.name, "match" | "view" | "group" | "resource" | "apiResource")
        }) else {
            return;
        };

        let mut attrs = Attributes::default();
        for call in &calls[..terminal] {
            attrs.absorb(call);
        }
        let terminal_call = &calls[terminal];
        let modifiers = &calls[terminal + 1..];

        match terminal_call.name {
            "group" => Self::group(terminal_call, attrs, ctx, routes),
            "resource" | "apiResource" => {
                Self::resource(terminal_call, attrs, modifiers, ctx, routes)
            }
            _ => Self::route(terminal_call, attrs, modifiers, ctx, routes),
        }
    }

    fn group(
        call: &MethodCall<'_>,
        mut attrs: Attributes,
        ctx: &GroupContext,
        routes: &mut Vec<RouteDeclaration>,
    ) {
        let args = call.arguments();
        if let Some(array) = args.first().filter(|arg| arg.starts_with('[')) {
            let from_array = Attributes::from_array(array);
            attrs.prefix = from_array.prefix.or(attrs.prefix);
            attrs.middleware.extend(from_array.middleware);
            attrs.name = from_array.name.or(attrs.name);
            attrs.controller = from_array.controller.or(attrs.controller);
        }

        let Some(body) = closure_body(call.args) else {
            debug!("Route group without an inline closure skipped");
            return;
        };
        Self::walk(body, &ctx.nest(attrs), routes);
    }

    fn route(
        call: &MethodCall<'_>,
        attrs: Attributes,
        modifiers: &[MethodCall<'_>],
        ctx: &GroupContext,
        routes: &mut Vec<RouteDeclaration>,
    ) {
        let args = call.arguments();
        let (methods, uri, action) = match call.name {
            "match" => {
                let methods: Vec<HttpMethod> = args
                    .first()
                    .map(|m| list_items(m))
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|m| HttpMethod::from_name(m))
                    .collect();
                (methods, args.get(1), args.get(2).map(|a| a.to_string()))
            }
            "view" => (
                vec![HttpMethod::Get],
                args.first(),
                args.get(1).map(|view| format!("view:{}", scalar(view))),
            ),
            verb => (
                HttpMethod::from_name(verb).into_iter().collect(),
                args.first(),
                args.get(1).map(|a| a.to_string()),
            ),
        };

        let (Some(uri), Some(action)) = (uri, action) else {
            debug!("Route::{} with missing arguments skipped", call.name);
            return;
        };

        let mut own = Attributes::default();
        for modifier in modifiers {
            own.absorb(modifier);
        }

        let controller = attrs.controller.as_deref().or(ctx.controller.as_deref());
        let action = if call.name == "view" {
            action
        } else {
            normalize_action(&action, controller)
        };

        let mut middleware = ctx.middleware.clone();
        middleware.extend(attrs.middleware);
        middleware.extend(own.middleware);

        let local_uri = join_uri(attrs.prefix.as_deref().unwrap_or(""), &scalar(uri));
        let uri_pattern = join_uri(&ctx.prefix, &local_uri);

        let name = match (attrs.name, own.name) {
            (None, None) => None,
            (pre, post) => Some(format!(
                "{}{}{}",
                ctx.name_prefix,
                pre.unwrap_or_default(),
                post.unwrap_or_default()
            )),
        };

        for http_method in methods {
            routes.push(RouteDeclaration {
                http_method,
                uri_pattern: uri_pattern.clone(),
                action_reference: action.clone(),
                middleware: middleware.clone(),
                name: name.clone(),
            });
        }
    }

    fn resource(
        call: &MethodCall<'_>,
        attrs: Attributes,
        modifiers: &[MethodCall<'_>],
        ctx: &GroupContext,
        routes: &mut Vec<RouteDeclaration>,
    ) {
        let args = call.arguments();
        let (Some(resource), Some(controller)) = (args.first(), args.get(1)) else {
            return;
        };
        let resource = scalar(resource);
        let controller = class_name(controller);

        let mut only: Option<Vec<String>> = None;
        let mut except: Vec<String> = Vec::new();
        let mut own = Attributes::default();
        for modifier in modifiers {
            match modifier.name {
                "only" => only = Some(modifier.arguments().into_iter().flat_map(list_items).collect()),
                "except" => except.extend(modifier.arguments().into_iter().flat_map(list_items)),
                _ => own.absorb(modifier),
            }
        }

        // photos.comments -> photos/{photo}/comments
        let segments: Vec<&str> = resource.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut base = String::new();
        for parent in parents {
            base = join_uri(&base, &format!("{}/{{{}}}", parent, singular(parent)));
        }
        base = join_uri(&base, last);
        let parameter = format!("{{{}}}", singular(last));

        let mut middleware = ctx.middleware.clone();
        middleware.extend(attrs.middleware);
        middleware.extend(own.middleware);
        let local_prefix = attrs.prefix.unwrap_or_default();
        let name_prefix = format!("{}{}", ctx.name_prefix, attrs.name.unwrap_or_default());

        for (action, http_method, suffix) in RESOURCE_ACTIONS {
            if call.name == "apiResource" && matches!(*action, "create" | "edit") {
                continue;
            }
            if only.as_ref().is_some_and(|only| !only.iter().any(|a| a == action))
                || except.iter().any(|a| a == action)
            {
                continue;
            }

            let uri = format!("{}{}", base, suffix.replace("{}", &parameter));
            routes.push(RouteDeclaration {
                http_method: *http_method,
                uri_pattern: join_uri(&ctx.prefix, &join_uri(&local_prefix, &uri)),
                action_reference: format!("{}@{}", controller, action),
                middleware: middleware.clone(),
                name: Some(format!("{}{}.{}", name_prefix, resource, action)),
            });
        }
    }
}
