// src/core/scan.rs
//! Text-scanning helpers shared by the reconstructors and extractors.
//!
//! Nothing here understands a language grammar. The scanner only knows about
//! quoted strings, comments and bracket nesting, which is enough to carve
//! PHP/Java sources into statements, argument lists and fluent call chains.

/// Replace `//` line comments and `/* */` block comments with spaces.
///
/// String literals are left untouched, so `'http://host'` survives. Newlines
/// inside block comments are kept so line structure does not shift.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Byte offset just past the string literal that opens at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_quote(b: u8) -> bool {
    matches!(b, b'\'' | b'"' | b'`')
}

/// Find the delimiter closing the one at `open_idx` (`(`, `[` or `{`).
///
/// All three bracket kinds share one depth counter; quoted strings are skipped.
pub fn find_matching(text: &str, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(open_idx), Some(b'(' | b'[' | b'{')) {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open_idx;
    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) {
            i = skip_string(bytes, i);
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split on `sep` wherever it appears outside strings and brackets.
/// Pieces are trimmed and empty pieces dropped.
pub fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) {
            i = skip_string(bytes, i);
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ if b == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }

    parts.into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Statements of a block body.
///
/// A statement ends at a top-level `;`, or at the `}` closing a brace block
/// opened at the top level (`if (..) { .. }`, `foreach (..) { .. }`).
pub fn split_statements(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut top_brace = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) {
            i = skip_string(bytes, i);
            continue;
        }
        match b {
            b'{' if depth == 0 => {
                top_brace = true;
                depth = 1;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && b == b'}' && top_brace {
                    top_brace = false;
                    parts.push(&body[start..=i]);
                    start = i + 1;
                }
            }
            b';' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < body.len() {
        parts.push(&body[start..]);
    }

    parts.into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Bodies of the brace blocks opened at the top level of `statement`.
///
/// For `if (..) { a(); } else { b(); }` this yields `a();` and `b();`.
pub fn block_bodies(statement: &str) -> Vec<&str> {
    let bytes = statement.as_bytes();
    let mut bodies = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) {
            i = skip_string(bytes, i);
            continue;
        }
        if matches!(b, b'(' | b'[' | b'{') {
            let Some(close) = find_matching(statement, i) else {
                break;
            };
            if b == b'{' {
                bodies.push(&statement[i + 1..close]);
            }
            i = close + 1;
            continue;
        }
        i += 1;
    }
    bodies
}

/// The contents of `s` if it is exactly one quoted literal.
pub fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    let first = *s.as_bytes().first()?;
    if s.len() >= 2 && matches!(first, b'\'' | b'"') && skip_string(s.as_bytes(), 0) == s.len() {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

/// Every quoted literal in `s`, in order.
pub fn string_literals(s: &str) -> Vec<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'\'' | b'"') {
            let end = skip_string(bytes, i);
            if end - i >= 2 && end <= s.len() && bytes[end - 1] == bytes[i] {
                out.push(s[i + 1..end - 1].to_string());
            }
            i = end;
        } else {
            i += 1;
        }
    }
    out
}

/// Strip one pair of enclosing `[ ]` when they wrap the whole expression.
pub fn strip_array(s: &str) -> &str {
    let s = s.trim();
    if s.starts_with('[') && find_matching(s, 0) == Some(s.len() - 1) {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

/// Items of a list argument: `'a'`, `'a', 'b'` or `['a', 'b']`.
/// Quoted items are unquoted; anything else is kept as written.
pub fn list_items(args: &str) -> Vec<String> {
    split_top_level(strip_array(args), b',')
        .into_iter()
        .map(|item| unquote(item).unwrap_or(item).to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Collapse every whitespace run to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One `name(args)` link of a fluent chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

impl<'a> MethodCall<'a> {
    /// Top-level comma separated arguments.
    pub fn arguments(&self) -> Vec<&'a str> {
        split_top_level(self.args, b',')
    }

    /// The first argument, when it is a quoted literal.
    pub fn first_string(&self) -> Option<&'a str> {
        self.arguments().first().and_then(|arg| unquote(arg))
    }
}

/// `Receiver::first(..)->second(..)` or `$var->first(..)->second(..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChain<'a> {
    /// `Route`, `Schema`, `$table`; namespace qualifiers are dropped
    pub receiver: &'a str,
    pub calls: Vec<MethodCall<'a>>,
}

impl<'a> CallChain<'a> {
    pub fn find(&self, name: &str) -> Option<&MethodCall<'a>> {
        self.calls.iter().find(|call| call.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

fn ident_len(bytes: &[u8], start: usize, extra: &[u8]) -> usize {
    bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_' || extra.contains(b))
        .count()
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parse a statement into its receiver and chain of calls.
///
/// Returns `None` when the statement does not start with a static or
/// variable receiver followed by at least one call.
pub fn parse_call_chain(statement: &str) -> Option<CallChain<'_>> {
    let text = statement.trim_start();
    let bytes = text.as_bytes();
    let mut i;

    let receiver = if bytes.first() == Some(&b'$') {
        let len = ident_len(bytes, 1, &[]);
        if len == 0 {
            return None;
        }
        i = 1 + len;
        let receiver = &text[..i];
        i = skip_ws(bytes, i);
        if !text[i..].starts_with("->") {
            return None;
        }
        i += 2;
        receiver
    } else {
        let len = ident_len(bytes, 0, b"\\");
        if len == 0 {
            return None;
        }
        let qualified = &text[..len];
        i = skip_ws(bytes, len);
        if !text[i..].starts_with("::") {
            return None;
        }
        i += 2;
        qualified.rsplit('\\').next().unwrap_or(qualified)
    };

    let mut calls = Vec::new();
    loop {
        i = skip_ws(bytes, i);
        let len = ident_len(bytes, i, &[]);
        if len == 0 {
            break;
        }
        let name = &text[i..i + len];
        let open = skip_ws(bytes, i + len);
        if bytes.get(open) != Some(&b'(') {
            break;
        }
        let close = find_matching(text, open)?;
        calls.push(MethodCall { name, args: text[open + 1..close].trim() });

        i = skip_ws(bytes, close + 1);
        if text[i..].starts_with("?->") {
            i += 3;
        } else if text[i..].starts_with("->") || text[i..].starts_with("::") {
            i += 2;
        } else {
            break;
        }
    }

    if calls.is_empty() {
        None
    } else {
        Some(CallChain { receiver, calls })
    }
}

/// Body of the first closure (`function (..) { .. }`) found in `text`.
pub fn closure_body(text: &str) -> Option<&str> {
    let start = text.find("function")?;
    let open = start + text[start..].find('{')?;
    let close = find_matching(text, open)?;
    Some(&text[open + 1..close])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments_keeps_strings() {
        let src = "Route::get('http://x', 'A@b'); // trailing\n/* block\nstill */ $a = 1;";
        let out = strip_comments(src);
        assert!(out.contains("'http://x'"));
        assert!(!out.contains("trailing"));
        assert!(!out.contains("still"));
        assert_eq!(out.lines().count(), src.lines().count());
    }

    #[test]
    fn test_find_matching_skips_quoted_brackets() {
        let text = "group(function () { echo ')'; })";
        let close = find_matching(text, 5).unwrap();
        assert_eq!(close, text.len() - 1);
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let parts = split_top_level("'a', ['b', 'c'], fn($x) => f($x, 1), 'd,e'", b',');
        assert_eq!(parts, vec!["'a'", "['b', 'c']", "fn($x) => f($x, 1)", "'d,e'"]);
    }

    #[test]
    fn test_list_items_shapes() {
        assert_eq!(list_items("'auth'"), vec!["auth"]);
        assert_eq!(list_items("['auth', 'throttle:60,1']"), vec!["auth", "throttle:60,1"]);
        assert_eq!(list_items("'auth', \"verified\""), vec!["auth", "verified"]);
        assert_eq!(list_items("[Authenticate::class]"), vec!["Authenticate::class"]);
        assert!(list_items("").is_empty());
    }

    #[test]
    fn test_unquote_requires_single_literal() {
        assert_eq!(unquote("'users'"), Some("users"));
        assert_eq!(unquote("\"a\\\"b\""), Some("a\\\"b"));
        assert_eq!(unquote("'a' . 'b'"), None);
        assert_eq!(unquote("Foo::class"), None);
    }

    #[test]
    fn test_parse_call_chain_static_receiver() {
        let chain = parse_call_chain(
            "Route::middleware(['auth'])->prefix('api')->group(function () { Route::get('/a', 'A@b'); })",
        )
        .unwrap();
        assert_eq!(chain.receiver, "Route");
        let names: Vec<_> = chain.calls.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["middleware", "prefix", "group"]);
        assert_eq!(chain.find("prefix").unwrap().first_string(), Some("api"));
    }

    #[test]
    fn test_parse_call_chain_variable_receiver() {
        let chain = parse_call_chain("$t->string('email', 100)->nullable()->unique()").unwrap();
        assert_eq!(chain.receiver, "$t");
        assert_eq!(chain.calls[0].name, "string");
        assert_eq!(chain.calls[0].arguments(), vec!["'email'", "100"]);
        assert!(chain.has("unique"));
    }

    #[test]
    fn test_parse_call_chain_drops_namespace() {
        let chain = parse_call_chain("\\Illuminate\\Support\\Facades\\Route::get('/', 'A@b')").unwrap();
        assert_eq!(chain.receiver, "Route");
    }

    #[test]
    fn test_parse_call_chain_rejects_plain_statements() {
        assert!(parse_call_chain("use Illuminate\\Support\\Facades\\Route").is_none());
        assert!(parse_call_chain("return new class extends Migration").is_none());
    }

    #[test]
    fn test_split_statements_ends_at_top_level_blocks() {
        let body = "if ($a) { f(); } Route::get('/x', 'X@y'); $g = function () { h(); }; last()";
        assert_eq!(
            split_statements(body),
            vec![
                "if ($a) { f(); }",
                "Route::get('/x', 'X@y')",
                "$g = function () { h(); }",
                "last()",
            ]
        );
        let nested = "Route::group([], function () { a(); b(); });";
        assert_eq!(split_statements(nested).len(), 1);
    }

    #[test]
    fn test_block_bodies_skip_conditions() {
        let statement = "if (check(function () { x(); })) { a(); } else { b(); }";
        let bodies: Vec<_> = block_bodies(statement).into_iter().map(str::trim).collect();
        assert_eq!(bodies, vec!["a();", "b();"]);
        assert!(block_bodies("$table->string('name')").is_empty());
    }

    #[test]
    fn test_closure_body() {
        let text = "function (Blueprint $table) { $table->id(); }";
        assert_eq!(closure_body(text).unwrap().trim(), "$table->id();");
    }
}
