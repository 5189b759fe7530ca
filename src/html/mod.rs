//! HTML minification.
//!
//! Comments are removed except conditional comments (`<!--[if IE]>` and the
//! matching `<![endif]-->` forms), which are always kept verbatim. Whitespace
//! in text collapses to a single space and disappears next to block-level
//! tags. Inside tags, runs of whitespace between attributes collapse while
//! attribute values are left alone.
//!
//! `<pre>` and `<textarea>` bodies pass through untouched; `<script>` and
//! `<style>` bodies are handed to the JavaScript and CSS minifiers.
//! Unbalanced markup is not an error: this is a lexical pass, not a parser.

mod elements;

pub use elements::{
    is_block_element, is_non_rendering_element, is_raw_text_element, is_script_type, is_style_type,
};

use serde::Deserialize;

use crate::css::{self, CssOptions};
use crate::js;
use crate::scanner::{Cursor, Span};

/// Configuration for HTML minification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    /// Keep ordinary comments too; also keeps `/*! ... */` comments in
    /// embedded stylesheets
    pub preserve_comments: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlTokenKind {
    Text,
    Comment { conditional: bool },
    StartTag,
    EndTag,
    /// `<!DOCTYPE ...>`, `<![endif]>`, `<?xml ...?>`
    Declaration,
    /// Body of a raw text element, up to its closing tag
    RawText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlToken {
    pub kind: HtmlTokenKind,
    pub span: Span,
    /// Lowercased element name for tags and raw text
    pub name: Option<String>,
}

fn is_html_whitespace(ch: char) -> bool {
    ch.is_ascii_whitespace()
}

fn is_tag_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.')
}

/// `Some(closing)` when the cursor sits on `<name` or `</name`.
fn tag_start(cursor: &Cursor) -> Option<bool> {
    let mut chars = cursor.rest().chars();
    if chars.next() != Some('<') {
        return None;
    }
    match chars.next()? {
        '/' => chars.next().filter(char::is_ascii_alphabetic).map(|_| true),
        ch if ch.is_ascii_alphabetic() => Some(false),
        _ => None,
    }
}

fn at_markup(cursor: &Cursor) -> bool {
    cursor.starts_with("<!") || cursor.starts_with("<?") || tag_start(cursor).is_some()
}

/// Split HTML source into token spans.
pub fn tokenize(source: &str) -> Vec<HtmlToken> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    while !cursor.at_eof() {
        let start = cursor.position();

        if cursor.starts_with("<!--") {
            cursor.advance_by(4);
            let body = Cursor::new(cursor.rest());
            let conditional = body.starts_with_ignore_ascii_case("[if")
                || body.starts_with_ignore_ascii_case("<![endif]");
            cursor.consume_through("-->");
            tokens.push(HtmlToken {
                kind: HtmlTokenKind::Comment { conditional },
                span: cursor.span_from(start),
                name: None,
            });
        } else if cursor.starts_with("<!") || cursor.starts_with("<?") {
            cursor.consume_through(">");
            tokens.push(HtmlToken {
                kind: HtmlTokenKind::Declaration,
                span: cursor.span_from(start),
                name: None,
            });
        } else if let Some(closing) = tag_start(&cursor) {
            cursor.advance_by(if closing { 2 } else { 1 });
            let name = cursor.consume_while(is_tag_name_char).to_ascii_lowercase();
            consume_tag_rest(&mut cursor);

            let kind = if closing { HtmlTokenKind::EndTag } else { HtmlTokenKind::StartTag };
            tokens.push(HtmlToken { kind, span: cursor.span_from(start), name: Some(name.clone()) });

            if !closing && is_raw_text_element(&name) {
                let body_start = cursor.position();
                let end = find_closing_tag(cursor.rest(), &name)
                    .map_or(source.len(), |offset| body_start.byte + offset);
                cursor.advance_to(end);
                tokens.push(HtmlToken {
                    kind: HtmlTokenKind::RawText,
                    span: cursor.span_from(body_start),
                    name: Some(name),
                });
            }
        } else {
            consume_text(&mut cursor);
            tokens.push(HtmlToken {
                kind: HtmlTokenKind::Text,
                span: cursor.span_from(start),
                name: None,
            });
        }
    }

    tokens
}

fn consume_text(cursor: &mut Cursor) {
    loop {
        cursor.consume_while(|c| c != '<');
        if cursor.at_eof() || at_markup(cursor) {
            break;
        }
        // A `<` that does not open markup is plain text.
        cursor.advance();
    }
}

/// Consume attributes through the closing `>`. A quote only opens a value
/// right after `=`, so apostrophes in unquoted values do not derail the scan.
fn consume_tag_rest(cursor: &mut Cursor) {
    let mut last = '\0';
    while let Some(ch) = cursor.peek_char() {
        match ch {
            '>' => {
                cursor.advance();
                return;
            }
            '"' | '\'' if last == '=' => {
                consume_attribute_value(cursor);
                last = ch;
            }
            _ => {
                cursor.advance();
                if !is_html_whitespace(ch) {
                    last = ch;
                }
            }
        }
    }
}

/// Consume a quoted attribute value. HTML has no backslash escapes here.
fn consume_attribute_value(cursor: &mut Cursor) {
    let terminator = match cursor.advance() {
        Some('\'') => "'",
        _ => "\"",
    };
    cursor.consume_through(terminator);
}

/// Byte offset of `</name` in `rest`, ignoring ASCII case.
fn find_closing_tag(rest: &str, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    let mut from = 0;
    while let Some(offset) = rest[from..].find("</") {
        let at = from + offset;
        let candidate = &rest.as_bytes()[at..];
        if candidate.len() >= needle.len()
            && candidate[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
        {
            return Some(at);
        }
        from = at + 2;
    }
    None
}

/// Value of attribute `name` in a start tag, if present.
pub fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut cursor = Cursor::new(tag);
    cursor.advance();
    cursor.consume_while(is_tag_name_char);

    loop {
        cursor.consume_while(|c| is_html_whitespace(c) || c == '/');
        match cursor.peek_char() {
            None | Some('>') => return None,
            _ => {}
        }

        let attr = cursor.consume_while(|c| !is_html_whitespace(c) && !matches!(c, '=' | '>' | '/'));
        if attr.is_empty() {
            cursor.advance();
            continue;
        }
        cursor.consume_while(is_html_whitespace);

        let mut value = "";
        if cursor.peek_char() == Some('=') {
            cursor.advance();
            cursor.consume_while(is_html_whitespace);
            value = match cursor.peek_char() {
                Some(quote @ ('"' | '\'')) => {
                    cursor.advance();
                    let start = cursor.position();
                    cursor.consume_while(|c| c != quote);
                    let value = cursor.slice_from(start);
                    cursor.advance();
                    value
                }
                _ => cursor.consume_while(|c| !is_html_whitespace(c) && c != '>'),
            };
        }

        if attr.eq_ignore_ascii_case(name) {
            return Some(value);
        }
    }
}

/// Collapse whitespace inside a tag. Quoted values are copied as-is;
/// whitespace before `>` and around `=` goes away.
fn normalize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut cursor = Cursor::new(tag);
    let mut pending_space = false;
    let mut last = '\0';

    while let Some(ch) = cursor.peek_char() {
        if is_html_whitespace(ch) {
            cursor.advance();
            pending_space = true;
            continue;
        }

        if pending_space && ch != '>' && ch != '=' && last != '=' {
            out.push(' ');
        }
        pending_space = false;

        if (ch == '"' || ch == '\'') && last == '=' {
            let start = cursor.position();
            consume_attribute_value(&mut cursor);
            out.push_str(cursor.slice_from(start));
        } else {
            cursor.advance();
            out.push(ch);
        }
        last = ch;
    }

    out
}

/// Collapse a text run. `trim_start`/`trim_end` drop the boundary whitespace
/// entirely instead of keeping one space.
fn collapse_text(text: &str, trim_start: bool, trim_end: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;

    for ch in text.chars() {
        if is_html_whitespace(ch) {
            in_space = true;
            continue;
        }
        if in_space && !(out.is_empty() && trim_start) {
            out.push(' ');
        }
        in_space = false;
        out.push(ch);
    }

    if in_space {
        let keep = if out.is_empty() { !trim_start && !trim_end } else { !trim_end };
        if keep {
            out.push(' ');
        }
    }
    out
}

/// How a piece of markup affects the whitespace around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Whitespace next to it never renders
    Block,
    Inline,
    /// Not rendered at all; trimming looks through it
    Hidden,
}

fn tag_flow(name: Option<&str>) -> Flow {
    match name {
        Some(name) if is_non_rendering_element(name) => Flow::Hidden,
        Some(name) if is_block_element(name) => Flow::Block,
        _ => Flow::Inline,
    }
}

enum Part {
    Text(String),
    Markup { text: String, flow: Flow },
}

impl Part {
    /// Flow of this part as a trimming boundary, `None` when it is
    /// transparent (hidden markup or whitespace-only text).
    fn boundary(&self) -> Option<Flow> {
        match self {
            Part::Markup { flow: Flow::Hidden, .. } => None,
            Part::Markup { flow, .. } => Some(*flow),
            Part::Text(text) if text.chars().all(is_html_whitespace) => None,
            Part::Text(_) => Some(Flow::Inline),
        }
    }
}

/// What precedes the current text in the output, for trimming its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Before {
    Block,
    Inline,
    /// Text that already ends in a space
    Space,
}

/// Minify an HTML source string.
pub fn minify(source: &str, options: &HtmlOptions) -> String {
    let _span = tracing::trace_span!("html_minify", len = source.len()).entered();

    let tokens = tokenize(source);
    let mut parts: Vec<Part> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let text = token.span.text(source);
        match token.kind {
            HtmlTokenKind::Comment { conditional } => {
                if conditional || options.preserve_comments {
                    parts.push(Part::Markup { text: text.to_string(), flow: Flow::Hidden });
                }
            }
            HtmlTokenKind::Text => match parts.last_mut() {
                // Text on both sides of a dropped comment joins up.
                Some(Part::Text(previous)) => previous.push_str(text),
                _ => parts.push(Part::Text(text.to_string())),
            },
            HtmlTokenKind::StartTag | HtmlTokenKind::EndTag => {
                let flow = tag_flow(token.name.as_deref());
                parts.push(Part::Markup { text: normalize_tag(text), flow });
            }
            HtmlTokenKind::Declaration => {
                parts.push(Part::Markup { text: normalize_tag(text), flow: Flow::Block });
            }
            HtmlTokenKind::RawText => {
                let element = token.name.as_deref().unwrap_or("");
                let open_tag = index
                    .checked_sub(1)
                    .map_or("", |previous| tokens[previous].span.text(source));
                let body = minify_raw_text(element, open_tag, text, options);
                let flow = if is_non_rendering_element(element) { Flow::Hidden } else { Flow::Inline };
                parts.push(Part::Markup { text: body, flow });
            }
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut before = Before::Block;
    for (index, part) in parts.iter().enumerate() {
        match part {
            Part::Text(text) => {
                let trim_start = before != Before::Inline;
                let trim_end = parts[index + 1..]
                    .iter()
                    .find_map(Part::boundary)
                    .is_none_or(|flow| flow == Flow::Block);
                let collapsed = collapse_text(text, trim_start, trim_end);
                if !collapsed.is_empty() {
                    before = if collapsed.ends_with(' ') { Before::Space } else { Before::Inline };
                }
                out.push_str(&collapsed);
            }
            Part::Markup { text, flow } => {
                match flow {
                    Flow::Block => before = Before::Block,
                    Flow::Inline => before = Before::Inline,
                    Flow::Hidden => {}
                }
                out.push_str(text);
            }
        }
    }
    out
}

fn minify_raw_text(element: &str, open_tag: &str, body: &str, options: &HtmlOptions) -> String {
    match element {
        "script" if is_script_type(attribute(open_tag, "type")) => js::minify(body),
        "style" if is_style_type(attribute(open_tag, "type")) => {
            let css_options = CssOptions {
                preserve_comments: options.preserve_comments,
                ..CssOptions::default()
            };
            css::minify(body, &css_options)
        }
        _ => body.to_string(),
    }
}
