//! HTML element classification for whitespace decisions.

/// Elements whose content is copied or minified as a unit instead of being
/// scanned for tags and whitespace.
/// https://html.spec.whatwg.org/multipage/syntax.html#elements-2
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "pre", "script", "style", "textarea",
];

/// Elements that do not take part in inline formatting, so whitespace right
/// next to their tags never renders.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dialog",
    "dd", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
    // Table internals
    "caption", "colgroup", "col", "tbody", "td", "tfoot", "th", "thead", "tr",
    // Document structure
    "body", "br", "head", "html", "option", "optgroup", "summary",
];

/// Elements that never render in the flow. Whitespace next to them still
/// separates the words around them, so they are transparent for trimming.
const NON_RENDERING_ELEMENTS: &[&str] = &[
    "base", "link", "meta", "script", "style", "title",
];

/// `type` values of `<script>` whose body is JavaScript or JSON.
const SCRIPT_TYPES: &[&str] = &[
    "", "module", "importmap",
    "text/javascript", "application/javascript", "application/x-javascript",
    "text/ecmascript", "application/ecmascript", "text/jscript",
    "application/json", "application/ld+json",
];

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_block_element(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_non_rendering_element(tag: &str) -> bool {
    NON_RENDERING_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Whether a `<script type=...>` body can go through the JavaScript minifier.
/// A missing `type` attribute means JavaScript.
pub fn is_script_type(script_type: Option<&str>) -> bool {
    let script_type = script_type.unwrap_or("").trim().to_ascii_lowercase();
    SCRIPT_TYPES.contains(&script_type.as_str())
}

/// Whether a `<style type=...>` body is CSS.
pub fn is_style_type(style_type: Option<&str>) -> bool {
    let style_type = style_type.unwrap_or("").trim().to_ascii_lowercase();
    style_type.is_empty() || style_type == "text/css"
}
