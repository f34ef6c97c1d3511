//! Content-type detection.
//!
//! Source dialects that convert to a web type (templates, component
//! scripts, style preprocessors) report the type of their *output*, since
//! that is what ends up on the wire.

use std::path::Path;

/// Common content-type constants.
pub mod types {
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "application/javascript";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";

    pub const PDF: &str = "application/pdf";
}

/// Content type of the artifact a source file produces.
///
/// Dialect extensions map to their converted output type; everything else
/// maps by plain extension lookup.
pub fn for_source(path: &Path) -> &'static str {
    match extension(path) {
        // Templating / markup dialects render to HTML
        Some("ejs" | "hbs" | "handlebars") => types::HTML,
        // Component-script dialect transpiles to plain script
        Some("jsx") => types::JAVASCRIPT,
        // Style preprocessors compile to plain stylesheets
        Some("sass" | "scss") => types::CSS,
        ext => from_extension(ext),
    }
}

/// Guess content type from a plain file extension.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("xml") => types::XML,
        Some("md") => types::MARKDOWN,
        Some("txt") => types::PLAIN,

        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("svg") => types::SVG,
        Some("ico") => types::ICO,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,
        Some("otf") => types::OTF,

        Some("pdf") => types::PDF,

        _ => types::PLAIN,
    }
}

#[inline]
fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_dialect_overrides() {
        assert_eq!(for_source(&PathBuf::from("index.ejs")), types::HTML);
        assert_eq!(for_source(&PathBuf::from("nav.handlebars")), types::HTML);
        assert_eq!(for_source(&PathBuf::from("app.jsx")), types::JAVASCRIPT);
        assert_eq!(for_source(&PathBuf::from("site.scss")), types::CSS);
        assert_eq!(for_source(&PathBuf::from("site.sass")), types::CSS);
    }

    #[test]
    fn test_plain_lookup() {
        assert_eq!(for_source(&PathBuf::from("logo.png")), types::PNG);
        assert_eq!(for_source(&PathBuf::from("app.js")), types::JAVASCRIPT);
        assert_eq!(for_source(&PathBuf::from("icon.svg")), types::SVG);
        assert_eq!(for_source(&PathBuf::from("notes")), types::PLAIN);
        assert_eq!(for_source(&PathBuf::from("data.bin")), types::PLAIN);
    }

}
