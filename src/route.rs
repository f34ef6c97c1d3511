//! Route-name derivation (pure functions).
//!
//! A route name is the request-path-shaped lookup key for an asset. It is a
//! deterministic function of the source path relative to the scan root and
//! the active extension rules, so rebuilds of an unchanged tree always
//! produce the same keys.

use std::path::Path;

/// Markup/templating extensions that disappear from route names.
const MARKUP_EXTS: &[&str] = &["html", "htm", "ejs", "hbs", "handlebars"];

/// Derive the route name for a file.
///
/// - strips the root prefix and prepends `/`
/// - unless `preserve_extensions`: markup extensions vanish, the
///   component-script extension becomes `.js`, preprocessor extensions
///   become `.css`
/// - a segment named `index` (after extension stripping) collapses into
///   its parent: `/index` → `/`, `/about/index` → `/about`
pub fn derive(rel: &Path, preserve_extensions: bool) -> String {
    let mut name = format!("/{}", normalize_separators(rel));

    if !preserve_extensions {
        name = map_extensions(&name);
        name = collapse_index(&name);
    }

    name
}

/// Canonical on-disk name for persisting an asset (always keeps a real
/// extension: templates become `.html`, component scripts `.js`,
/// preprocessor styles `.css`).
pub fn canonical_save_name(rel: &Path) -> String {
    let name = format!("/{}", normalize_separators(rel));
    match name.rsplit_once('.') {
        Some((stem, "ejs" | "hbs" | "handlebars")) => format!("{stem}.html"),
        Some((stem, "jsx")) => format!("{stem}.js"),
        Some((stem, "sass" | "scss")) => format!("{stem}.css"),
        _ => name,
    }
}

/// Replace platform separators with `/` for route keys.
fn normalize_separators(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Apply the extension rules to a route name.
fn map_extensions(name: &str) -> String {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return name.to_string();
    };
    // Only treat the suffix as an extension when it belongs to the final
    // segment (`/v1.2/readme` has none).
    if stem.rfind('/') < name.rfind('/') {
        return name.to_string();
    }

    if MARKUP_EXTS.contains(&ext) {
        stem.to_string()
    } else if ext == "jsx" {
        format!("{stem}.js")
    } else if ext == "sass" || ext == "scss" {
        format!("{stem}.css")
    } else {
        name.to_string()
    }
}

/// Collapse a trailing `index` segment into the parent route.
fn collapse_index(name: &str) -> String {
    if name == "/index" {
        "/".to_string()
    } else if let Some(parent) = name.strip_suffix("/index") {
        parent.to_string()
    } else {
        name.to_string()
    }
}
