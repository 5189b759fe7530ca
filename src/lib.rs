//! Minifier for the Web.
//!
//! Three lexical minifiers, one per source kind:
//!
//! - [`css::minify`]: comments, whitespace and redundant semicolons, with
//!   optional declaration sorting and line wrapping.
//! - [`js::minify`]: comments and whitespace, keeping string, template and
//!   regular-expression literals intact.
//! - [`html::minify`]: comments (conditional ones survive) and inter-tag
//!   whitespace, with embedded `<script>` and `<style>` bodies minified in
//!   place.
//!
//! Every minifier is a pure function of its input and options: no I/O, no
//! global state, and no failure mode. Malformed input is minified on a best
//! effort basis. The [`driver`] module wraps them with file handling: output
//! naming, timestamps, content hashes, gzip and directory walks.

pub mod css;
pub mod driver;
pub mod error;
pub mod html;
pub mod js;
pub mod scanner;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use css::{CssOptions, DEFAULT_WRAP_COLUMN, minify as css_minify};
pub use error::{Error, Result};
pub use html::{HtmlOptions, minify as html_minify};
pub use js::minify as js_minify;

/// Kind of source text, which decides the minifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Css,
    Js,
    Html,
}

impl SourceKind {
    /// Classify a file by its extension (`.css`, `.js`/`.mjs`, `.html`/`.htm`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "css" => Some(SourceKind::Css),
            "js" | "mjs" => Some(SourceKind::Js),
            "html" | "htm" => Some(SourceKind::Html),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Css => "css",
            SourceKind::Js => "js",
            SourceKind::Html => "html",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "css" => Ok(SourceKind::Css),
            "js" | "javascript" => Ok(SourceKind::Js),
            "html" | "htm" => Ok(SourceKind::Html),
            other => Err(format!("unknown source kind `{other}` (expected css, js or html)")),
        }
    }
}

/// Minification options for one call.
///
/// `wrap` and `sort` only affect CSS; `preserve_comments` keeps CSS bang
/// comments and, for HTML, every comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub wrap: Option<usize>,
    pub preserve_comments: bool,
    pub sort: bool,
}

impl Options {
    pub fn css(&self) -> CssOptions {
        CssOptions {
            wrap: self.wrap,
            preserve_comments: self.preserve_comments,
            sort: self.sort,
        }
    }

    pub fn html(&self) -> HtmlOptions {
        HtmlOptions { preserve_comments: self.preserve_comments }
    }
}

/// Result of a minification, with sizes for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct Minified {
    pub kind: SourceKind,
    pub code: String,
    pub original_size: usize,
    pub minified_size: usize,
}

/// Minify `source` with the minifier for `kind`.
pub fn minify(kind: SourceKind, source: &str, options: &Options) -> String {
    match kind {
        SourceKind::Css => css::minify(source, &options.css()),
        SourceKind::Js => js::minify(source),
        SourceKind::Html => html::minify(source, &options.html()),
    }
}

/// Minify and report sizes.
pub fn minify_with(kind: SourceKind, source: &str, options: &Options) -> Minified {
    let code = minify(kind, source, options);
    Minified {
        kind,
        original_size: source.len(),
        minified_size: code.len(),
        code,
    }
}
