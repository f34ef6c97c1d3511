//! Markup minification.
//!
//! A single left-to-right pass over the document:
//! - comments are dropped
//! - whitespace runs in text collapse to one space
//! - raw-text elements (`pre`, `textarea`) are copied untouched
//! - inline `<style>`/`<script>` bodies go through the stylesheet/script
//!   minifiers, keeping the original block when the minifier rejects it
//! - redundant `type` attributes on `script`/`style` tags are removed
//!
//! The pass is idempotent: collapsed whitespace collapses to itself and the
//! inline minifiers produce their own normal forms.

use crate::mime::types;

use super::{Minifier, minify_err};
use crate::error::PipelineError;

/// Elements whose text content must not be touched.
const PRESERVED: &[&str] = &["pre", "textarea"];

/// `type` attribute values that are redundant on `script` tags.
const REDUNDANT_SCRIPT_TYPES: &[&str] = &["text/javascript", "application/javascript", "module"];

/// Minify markup source text.
pub fn minify_html(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("<!--") {
            // Drop the comment entirely.
            rest = match stripped.find("-->") {
                Some(end) => &stripped[end + 3..],
                None => "",
            };
        } else if rest.starts_with('<') {
            let (tag, after) = read_tag(rest);
            let name = tag_name(tag);
            let closing = tag.starts_with("</");

            if closing {
                out.push_str(tag);
                rest = after;
            } else if name == "script" {
                let (body, following) = read_raw_body(after, "</script");
                out.push_str(&clean_tag(tag, &name));
                out.push_str(&minify_inline_script(tag, body));
                rest = following;
            } else if name == "style" {
                let (body, following) = read_raw_body(after, "</style");
                out.push_str(&clean_tag(tag, &name));
                out.push_str(&minify_inline_style(body));
                rest = following;
            } else if PRESERVED.contains(&name.as_str()) {
                let close = format!("</{name}");
                let (body, following) = read_raw_body(after, &close);
                out.push_str(tag);
                out.push_str(body);
                rest = following;
            } else {
                out.push_str(tag);
                rest = after;
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            collapse_whitespace(&rest[..end], &mut out);
            rest = &rest[end..];
        }
    }

    out
}

/// Read one tag from `<` through `>`, honoring quoted attribute values.
fn read_tag(input: &str) -> (&str, &str) {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return (&input[..=i], &input[i + 1..]),
            None => {}
        }
    }
    (input, "")
}

/// Raw-text body up to (but not including) the closing tag marker.
fn read_raw_body<'a>(input: &'a str, close: &str) -> (&'a str, &'a str) {
    let lower = input.to_ascii_lowercase();
    match lower.find(close) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, ""),
    }
}

/// Tag name, lowercase, without `<`/`</` or attributes.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Collapse whitespace runs in text content to a single space.
///
/// A run continues across node boundaries: when the output already ends
/// with a space (e.g. after a dropped comment between two text runs),
/// leading whitespace here is part of that run, not a new one.
fn collapse_whitespace(text: &str, out: &mut String) {
    let mut in_run = out.ends_with(' ');
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
}

/// Remove redundant `type` attributes from `script`/`style` open tags.
fn clean_tag(tag: &str, name: &str) -> String {
    let redundant: &[&str] = match name {
        "script" => REDUNDANT_SCRIPT_TYPES,
        "style" => &["text/css"],
        _ => return tag.to_string(),
    };

    let mut cleaned = tag.to_string();
    for value in redundant {
        for quote in ['"', '\''] {
            let needle = format!(" type={quote}{value}{quote}");
            if let Some(at) = cleaned.to_ascii_lowercase().find(&needle) {
                cleaned.replace_range(at..at + needle.len(), "");
            }
        }
    }
    cleaned
}

/// Minify an inline script body; a minifier rejection keeps the original.
fn minify_inline_script(tag: &str, body: &str) -> String {
    if body.trim().is_empty() {
        return body.to_string();
    }
    // Non-script payloads (e.g. embedded JSON) are left alone.
    if let Some(kind) = attr_value(tag, "type")
        && !REDUNDANT_SCRIPT_TYPES.contains(&kind.to_ascii_lowercase().as_str())
    {
        return body.to_string();
    }
    super::minify_js(body).unwrap_or_else(|_| body.to_string())
}

/// Minify an inline style body; a minifier rejection keeps the original.
fn minify_inline_style(body: &str) -> String {
    if body.trim().is_empty() {
        return body.to_string();
    }
    super::minify_css(body).unwrap_or_else(|_| body.to_string())
}

/// Extract a (quoted) attribute value from a tag, case-insensitively.
fn attr_value(tag: &str, attr: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    for quote in ['"', '\''] {
        let needle = format!("{attr}={quote}");
        if let Some(start) = lower.find(&needle) {
            let rest = &tag[start + needle.len()..];
            if let Some(end) = rest.find(quote) {
                return Some(rest[..end].to_string());
            }
        }
    }
    None
}

/// Markup transform for the minification table.
pub struct MarkupMinifier;

impl Minifier for MarkupMinifier {
    fn content_types(&self) -> &[&str] {
        &[types::HTML]
    }

    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| minify_err(types::HTML, "content is not valid UTF-8"))?;
        Ok(minify_html(source).into_bytes())
    }
}
